//! Repository registry
//!
//! Three URL-keyed mappings: *default* repositories contributed by the
//! selected target app, *present* repositories touched during this run,
//! and the *known types* list of backend factories probed for unknown
//! URLs. Registration happens at startup; the only mutation afterwards
//! is the lazy insertion of a newly probed repository into *present*.

use std::sync::Arc;
use std::sync::RwLock;

use indexmap::IndexMap;

use crate::engine::{ImportSource, ResolvedImport};
use crate::package::Package;
use crate::reference::{CompleteReference, PartialReference};
use crate::repository::{Repository, RepositoryFactory};
use crate::{Error, Result};

#[derive(Default)]
struct Inner {
    defaults: IndexMap<String, Arc<dyn Repository>>,
    present: IndexMap<String, Arc<dyn Repository>>,
    factories: Vec<Arc<dyn RepositoryFactory>>,
}

/// Process-wide repository lookup.
#[derive(Default)]
pub struct RepositoryRegistry {
    inner: RwLock<Inner>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend factory. Factories are probed in registration
    /// order by [`RepositoryRegistry::get_or_create`].
    pub fn register_factory(&self, factory: Arc<dyn RepositoryFactory>) {
        self.inner.write().expect("registry lock").factories.push(factory);
    }

    /// Add a repository to the default set.
    pub fn register_default(&self, repository: Arc<dyn Repository>) {
        let key = repository.url().to_lowercase();
        self.inner
            .write()
            .expect("registry lock")
            .defaults
            .insert(key, repository);
    }

    /// Remove a repository from the default set, keeping it in *present*.
    pub fn remove_default(&self, url: &str) {
        let mut inner = self.inner.write().expect("registry lock");
        if let Some(repository) = inner.defaults.shift_remove(&url.to_lowercase()) {
            let key = repository.url().to_lowercase();
            inner.present.entry(key).or_insert(repository);
        }
    }

    /// The current default repositories, in registration order.
    pub fn defaults(&self) -> Vec<Arc<dyn Repository>> {
        self.inner
            .read()
            .expect("registry lock")
            .defaults
            .values()
            .cloned()
            .collect()
    }

    /// Every repository touched this run, defaults included.
    pub fn present(&self) -> Vec<Arc<dyn Repository>> {
        let inner = self.inner.read().expect("registry lock");
        let mut all: IndexMap<String, Arc<dyn Repository>> = inner.defaults.clone();
        for (key, repository) in &inner.present {
            all.entry(key.clone()).or_insert_with(|| repository.clone());
        }
        all.into_values().collect()
    }

    /// Find or create the repository behind `url`.
    ///
    /// Lookup order: defaults, present, then each known factory in
    /// registration order. A newly created repository must pass the
    /// syntactic and existence probes; it is then refreshed, remembered
    /// in *present* and returned even if the refresh failed (a retained
    /// not-ready repository reports its failure on use).
    pub fn get_or_create(&self, url: &str) -> Result<Arc<dyn Repository>> {
        let key = url.to_lowercase();

        let factories = {
            let inner = self.inner.read().expect("registry lock");
            if let Some(repository) = inner.defaults.get(&key) {
                return Ok(repository.clone());
            }
            if let Some(repository) = inner.present.get(&key) {
                return Ok(repository.clone());
            }
            inner.factories.clone()
        };

        // Probe outside the lock: creation may clone a remote repository.
        for factory in factories {
            let repository = factory.create(url);
            if !repository.reference_syntactically_valid() || !repository.exists() {
                continue;
            }
            tracing::debug!(url, kind = factory.kind(), "repository recognized");

            if let Err(error) = repository.refresh() {
                tracing::warn!(url, %error, "repository refresh failed");
            }

            let mut inner = self.inner.write().expect("registry lock");
            let entry = inner
                .present
                .entry(key)
                .or_insert_with(|| repository.clone());
            return Ok(entry.clone());
        }

        Err(Error::RepositoryNotFound {
            url: url.to_string(),
        })
    }

    /// Find the default repository that can serve `partial`.
    ///
    /// Each default is asked to infer the reference and produce a
    /// non-empty package text; the first that does wins.
    pub fn find_in_defaults(
        &self,
        partial: &PartialReference,
    ) -> Option<(Arc<dyn Repository>, CompleteReference)> {
        for repository in self.defaults() {
            let Some(complete) = repository.try_infer_reference(partial) else {
                continue;
            };
            match repository.try_get_package_text(&complete) {
                Some(text) if !text.is_empty() => return Some((repository, complete)),
                _ => continue,
            }
        }
        None
    }

    /// The repository `partial` should be resolved against.
    pub fn find_repository(&self, partial: &PartialReference) -> Result<Arc<dyn Repository>> {
        match &partial.repository {
            Some(url) => self.get_or_create(url),
            None => self
                .find_in_defaults(partial)
                .map(|(repository, _)| repository)
                .ok_or_else(|| Error::PackageNotFound {
                    reference: partial.to_string(),
                }),
        }
    }

    /// Resolve and load `partial` in one step.
    pub fn try_get_package(&self, partial: &PartialReference) -> Result<Package> {
        let repository = self.find_repository(partial)?;
        repository.try_get_package(partial)
    }
}

impl ImportSource for RepositoryRegistry {
    /// Resolve an engine import: the reference's own repository wins,
    /// then the enclosing script's, then the default set.
    fn resolve_import(
        &self,
        reference: &PartialReference,
        parent_repository: Option<&str>,
    ) -> Result<ResolvedImport> {
        let mut reference = reference.clone();
        if reference.repository.is_none() {
            reference.repository = parent_repository.map(String::from);
        }

        let repository = self.find_repository(&reference)?;
        let complete =
            repository
                .try_infer_reference(&reference)
                .ok_or_else(|| Error::PackageNotFound {
                    reference: reference.to_string(),
                })?;
        let engine =
            repository
                .try_get_script_engine(&complete)
                .ok_or_else(|| Error::EngineUnavailable {
                    reference: complete.to_string(),
                })?;
        let text =
            repository
                .try_get_package_text(&complete)
                .ok_or_else(|| Error::PackageTextUnavailable {
                    reference: complete.to_string(),
                })?;

        Ok(ResolvedImport {
            reference: complete,
            extension: engine.extension().to_string(),
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::testing::{pack_script, StubEngine, StubRepository};

    /// Factory double that accepts URLs with a given prefix and counts
    /// how often it was asked.
    struct PrefixFactory {
        kind: &'static str,
        prefix: &'static str,
        engine: Arc<StubEngine>,
        creations: AtomicUsize,
    }

    impl PrefixFactory {
        fn new(kind: &'static str, prefix: &'static str) -> Self {
            Self {
                kind,
                prefix,
                engine: Arc::new(StubEngine::new("csup")),
                creations: AtomicUsize::new(0),
            }
        }
    }

    /// Repository wrapper that fails the syntactic probe outside its
    /// factory's prefix.
    struct ProbedRepository {
        inner: StubRepository,
        valid: bool,
    }

    impl Repository for ProbedRepository {
        fn url(&self) -> &str {
            self.inner.url()
        }
        fn ready(&self) -> bool {
            self.inner.ready()
        }
        fn last_refresh_error(&self) -> Option<String> {
            self.inner.last_refresh_error()
        }
        fn reference_syntactically_valid(&self) -> bool {
            self.valid
        }
        fn exists(&self) -> bool {
            self.valid
        }
        fn refresh(&self) -> Result<()> {
            self.inner.refresh()
        }
        fn catalog(&self) -> crate::repository::Catalog {
            self.inner.catalog()
        }
        fn try_get_package_text(&self, reference: &CompleteReference) -> Option<String> {
            self.inner.try_get_package_text(reference)
        }
        fn try_get_script_engine(
            &self,
            reference: &CompleteReference,
        ) -> Option<Arc<dyn crate::engine::ScriptEngine>> {
            self.inner.try_get_script_engine(reference)
        }
        fn try_infer_reference(&self, partial: &PartialReference) -> Option<CompleteReference> {
            self.inner.try_infer_reference(partial)
        }
        fn try_get_package(&self, partial: &PartialReference) -> Result<Package> {
            crate::loader::load_package(self, partial)
        }
    }

    impl RepositoryFactory for PrefixFactory {
        fn kind(&self) -> &str {
            self.kind
        }

        fn create(&self, url: &str) -> Arc<dyn Repository> {
            self.creations.fetch_add(1, Ordering::Relaxed);
            Arc::new(ProbedRepository {
                inner: StubRepository::new(url, self.engine.clone()),
                valid: url.starts_with(self.prefix),
            })
        }
    }

    #[test]
    fn test_first_accepting_factory_wins() {
        let registry = RepositoryRegistry::new();
        let git = Arc::new(PrefixFactory::new("git", "https://"));
        let filesystem = Arc::new(PrefixFactory::new("filesystem", "/"));
        registry.register_factory(git.clone());
        registry.register_factory(filesystem.clone());

        registry.get_or_create("/some/where").unwrap();

        // The git factory was probed first and rejected the URL.
        assert_eq!(git.creations.load(Ordering::Relaxed), 1);
        assert_eq!(filesystem.creations.load(Ordering::Relaxed), 1);

        // A second lookup hits *present* without probing again.
        registry.get_or_create("/SOME/where").unwrap();
        assert_eq!(filesystem.creations.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_defaults_shadow_probing() {
        let registry = RepositoryRegistry::new();
        let factory = Arc::new(PrefixFactory::new("filesystem", "/"));
        registry.register_factory(factory.clone());

        let engine = Arc::new(StubEngine::new("csup"));
        registry.register_default(Arc::new(StubRepository::new("/repo", engine)));

        registry.get_or_create("/repo").unwrap();
        assert_eq!(factory.creations.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_unrecognized_url_fails() {
        let registry = RepositoryRegistry::new();
        registry.register_factory(Arc::new(PrefixFactory::new("filesystem", "/")));

        let result = registry.get_or_create("plain-name");
        assert!(matches!(result, Err(Error::RepositoryNotFound { .. })));
    }

    #[test]
    fn test_default_probing_picks_first_with_package() {
        let engine = Arc::new(StubEngine::new("csup"));
        let empty = Arc::new(StubRepository::new("/empty", engine.clone()));
        let stocked = Arc::new(StubRepository::new("/stocked", engine));
        stocked.insert("pack", "1.0", pack_script("pack", "1.0", &[]));

        let registry = RepositoryRegistry::new();
        registry.register_default(empty);
        registry.register_default(stocked);

        let (repository, complete) = registry
            .find_in_defaults(&PartialReference::new("pack"))
            .unwrap();
        assert_eq!(repository.url(), "/stocked");
        assert_eq!(complete.version, "1.0");
    }

    #[test]
    fn test_remove_default_keeps_repository_present() {
        let engine = Arc::new(StubEngine::new("csup"));
        let registry = RepositoryRegistry::new();
        registry.register_default(Arc::new(StubRepository::new("/repo", engine)));

        registry.remove_default("/repo");
        assert!(registry.defaults().is_empty());
        assert_eq!(registry.present().len(), 1);
        assert!(registry.get_or_create("/repo").is_ok());
    }
}
