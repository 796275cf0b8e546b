//! Local-directory repository backend

use std::sync::{Arc, RwLock};

use uppm_core::{
    infer, loader, Catalog, CompleteReference, EngineRegistry, Package, PartialReference,
    Repository, ScriptEngine,
};
use uppm_fs::NormalizedPath;

use crate::url::{classify, UrlKind};

#[derive(Default)]
struct State {
    catalog: Catalog,
    ready: bool,
    last_error: Option<String>,
}

/// A repository backed by a plain directory tree.
pub struct FilesystemRepository {
    url: String,
    absolute_path: NormalizedPath,
    engines: Arc<EngineRegistry>,
    state: RwLock<State>,
}

impl FilesystemRepository {
    /// Create a backend for `url`, resolving relative URLs against the
    /// current working directory.
    pub fn new(url: &str, engines: Arc<EngineRegistry>) -> Self {
        let absolute_path = match classify(url) {
            UrlKind::FilesystemRelative => {
                let cwd = std::env::current_dir().unwrap_or_default();
                NormalizedPath::new(cwd.join(url))
            }
            _ => NormalizedPath::new(url),
        };

        Self {
            url: url.to_string(),
            absolute_path,
            engines,
            state: RwLock::new(State::default()),
        }
    }

    /// The directory packages are read from.
    pub fn absolute_path(&self) -> &NormalizedPath {
        &self.absolute_path
    }
}

impl Repository for FilesystemRepository {
    fn url(&self) -> &str {
        &self.url
    }

    fn ready(&self) -> bool {
        self.state.read().expect("state lock").ready
    }

    fn last_refresh_error(&self) -> Option<String> {
        self.state.read().expect("state lock").last_error.clone()
    }

    fn reference_syntactically_valid(&self) -> bool {
        matches!(
            classify(&self.url),
            UrlKind::FilesystemAbsolute | UrlKind::FilesystemRelative
        )
    }

    fn exists(&self) -> bool {
        self.absolute_path.is_dir()
    }

    fn refresh(&self) -> uppm_core::Result<()> {
        let mut state = self.state.write().expect("state lock");
        if !self.absolute_path.is_dir() {
            let message = format!("{} is not a directory", self.absolute_path);
            state.ready = false;
            state.last_error = Some(message.clone());
            return Err(uppm_core::Error::RepositoryRefreshFailed {
                url: self.url.clone(),
                message,
            });
        }

        state.catalog = crate::catalog::scan(&self.absolute_path, &self.url, &self.engines);
        state.ready = true;
        state.last_error = None;
        tracing::info!(url = %self.url, packages = state.catalog.len(), "repository refreshed");
        Ok(())
    }

    fn catalog(&self) -> Catalog {
        self.state.read().expect("state lock").catalog.clone()
    }

    fn try_get_package_text(&self, reference: &CompleteReference) -> Option<String> {
        let path = {
            let state = self.state.read().expect("state lock");
            state.catalog.get(reference)?.clone()
        };
        match uppm_fs::read_text(&path) {
            Ok(text) => Some(text),
            Err(error) => {
                tracing::warn!(%path, %error, "failed to read package text");
                None
            }
        }
    }

    fn try_get_script_engine(
        &self,
        reference: &CompleteReference,
    ) -> Option<Arc<dyn ScriptEngine>> {
        let state = self.state.read().expect("state lock");
        let extension = state.catalog.get(reference)?.extension()?.to_string();
        drop(state);
        self.engines.by_extension(&extension)
    }

    fn try_infer_reference(&self, partial: &PartialReference) -> Option<CompleteReference> {
        let state = self.state.read().expect("state lock");
        infer::complete_reference(&state.catalog, &self.url, partial)
    }

    fn try_get_package(&self, partial: &PartialReference) -> uppm_core::Result<Package> {
        loader::load_package(self, partial)
    }
}
