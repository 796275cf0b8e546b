//! Error types for uppm-core

/// Result type for uppm-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving, loading or running packages
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid package reference: {input}")]
    InvalidReference { input: String },

    #[error("Invalid version: {input}")]
    InvalidVersion { input: String },

    #[error("Invalid version range: {input}")]
    InvalidVersionRange { input: String },

    #[error("No known repository accepts {url}")]
    RepositoryNotFound { url: String },

    #[error("Repository {url} failed to refresh: {message}")]
    RepositoryRefreshFailed { url: String, message: String },

    #[error("Package not found: {reference}")]
    PackageNotFound { reference: String },

    #[error("No script engine registered for {reference}")]
    EngineUnavailable { reference: String },

    #[error("Package text unavailable for {reference}")]
    PackageTextUnavailable { reference: String },

    #[error("No uppm header comment found in {name}")]
    MalformedHeader { name: String },

    #[error("Malformed package metadata: {message}")]
    MalformedMetadata { message: String },

    #[error("Package requires uppm {required} but this build is {current}")]
    CoreTooOld { required: String, current: String },

    #[error("Import depth exceeded the limit of {limit}")]
    ImportDepthExceeded { limit: u32 },

    #[error("Engine {engine} does not support action '{action}'")]
    ActionUnsupported { engine: String, action: String },

    #[error("Action '{action}' failed for {reference}: {message}")]
    ActionFailed {
        action: String,
        reference: String,
        message: String,
    },

    #[error("Unknown target application: {name}")]
    UnknownTargetApp { name: String },

    #[error(transparent)]
    Fs(#[from] uppm_fs::Error),
}
