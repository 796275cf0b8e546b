//! Backend factories
//!
//! The repository registry probes these in registration order when it
//! meets an unknown URL. Git is registered first so the cheap syntactic
//! check discriminates remote URLs before the filesystem shapes.

use std::sync::Arc;

use uppm_core::{EngineRegistry, Repository, RepositoryFactory, RepositoryRegistry};

use crate::filesystem::FilesystemRepository;
use crate::git::{GitOptions, GitRepository};

pub struct GitRepositoryFactory {
    engines: Arc<EngineRegistry>,
    options: GitOptions,
}

impl GitRepositoryFactory {
    pub fn new(engines: Arc<EngineRegistry>, options: GitOptions) -> Self {
        Self { engines, options }
    }
}

impl RepositoryFactory for GitRepositoryFactory {
    fn kind(&self) -> &str {
        "git"
    }

    fn create(&self, url: &str) -> Arc<dyn Repository> {
        Arc::new(GitRepository::new(
            url,
            self.engines.clone(),
            self.options.clone(),
        ))
    }
}

pub struct FilesystemRepositoryFactory {
    engines: Arc<EngineRegistry>,
}

impl FilesystemRepositoryFactory {
    pub fn new(engines: Arc<EngineRegistry>) -> Self {
        Self { engines }
    }
}

impl RepositoryFactory for FilesystemRepositoryFactory {
    fn kind(&self) -> &str {
        "filesystem"
    }

    fn create(&self, url: &str) -> Arc<dyn Repository> {
        Arc::new(FilesystemRepository::new(url, self.engines.clone()))
    }
}

/// Register the built-in backend factories with a repository registry.
pub fn register_default_factories(
    registry: &RepositoryRegistry,
    engines: Arc<EngineRegistry>,
    git_options: GitOptions,
) {
    registry.register_factory(Arc::new(GitRepositoryFactory::new(
        engines.clone(),
        git_options,
    )));
    registry.register_factory(Arc::new(FilesystemRepositoryFactory::new(engines)));
}
