//! Repository backends for uppm
//!
//! Implements the core `Repository` contract for two stores: plain
//! directory trees and remote Git working trees. Both share the
//! fixed-depth catalog walk in [`catalog`]; URL shapes decide which
//! backend a registry probe instantiates.

pub mod catalog;
pub mod error;
pub mod factory;
pub mod filesystem;
pub mod git;
pub mod url;

pub use error::{Error, Result};
pub use factory::{register_default_factories, FilesystemRepositoryFactory, GitRepositoryFactory};
pub use filesystem::FilesystemRepository;
pub use git::{
    force_synchronization, set_force_synchronization, GitCredentials, GitOptions, GitRepository,
};
pub use url::{classify, UrlKind};
