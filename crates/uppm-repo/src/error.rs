//! Error types for uppm-repo
//!
//! Backend-internal failures; at the `Repository` trait boundary they
//! collapse into the core's `RepositoryRefreshFailed` kind.

/// Result type for backend-internal operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur inside a repository backend
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error(transparent)]
    Fs(#[from] uppm_fs::Error),
}

impl Error {
    /// Collapse into the core refresh-failure kind for `url`.
    pub fn into_refresh_failure(self, url: &str) -> uppm_core::Error {
        uppm_core::Error::RepositoryRefreshFailed {
            url: url.to_string(),
            message: self.to_string(),
        }
    }
}
