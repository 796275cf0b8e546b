//! Target applications
//!
//! A target app is the application whose packages uppm manages. It
//! determines the pack folders for each installation scope and
//! contributes a default repository while selected. The dependency
//! resolver consults it for installed-package reconciliation.

use std::fs;

use indexmap::IndexMap;
use uppm_fs::NormalizedPath;

use crate::engine::EngineRegistry;
use crate::meta::PackageMeta;
use crate::package::InstalledScope;
use crate::reference::PartialReference;
use crate::registry::RepositoryRegistry;
use crate::{Error, Result};

/// One application packages can be installed into.
#[derive(Debug, Clone)]
pub struct TargetApp {
    pub short_name: String,
    /// Informational machine architecture label, e.g. `x64`.
    pub architecture: Option<String>,
    pub app_folder: NormalizedPath,
    pub global_packs_folder: NormalizedPath,
    pub local_packs_folder: NormalizedPath,
    pub executable: Option<String>,
    /// URL of the repository that becomes a default while this app is
    /// selected.
    pub default_repository: Option<String>,
}

/// A package found on disk in one of the pack folders.
#[derive(Debug, Clone)]
pub struct InstalledPackage {
    pub meta: PackageMeta,
    pub folder: NormalizedPath,
    pub scope: InstalledScope,
}

impl TargetApp {
    pub fn packs_folder(&self, scope: InstalledScope) -> &NormalizedPath {
        match scope {
            InstalledScope::Global => &self.global_packs_folder,
            InstalledScope::Local => &self.local_packs_folder,
        }
    }

    /// The folder a package of `name` occupies when installed in `scope`.
    pub fn installed_pack_folder(&self, name: &str, scope: InstalledScope) -> NormalizedPath {
        self.packs_folder(scope).join(name)
    }

    /// Walk installed packages in `scope`, calling `visit` for each.
    ///
    /// An installed package is a subdirectory of the scope's pack folder
    /// containing a script file whose extension has a registered engine;
    /// its metadata comes from that script's header. Unreadable entries
    /// are logged and skipped. Returning `false` from `visit` stops the
    /// walk.
    pub fn enumerate_installed(
        &self,
        scope: InstalledScope,
        engines: &EngineRegistry,
        visit: &mut dyn FnMut(InstalledPackage) -> bool,
    ) {
        let packs_folder = self.packs_folder(scope);
        let Ok(entries) = fs::read_dir(packs_folder.to_native()) else {
            return;
        };

        for entry in entries.flatten() {
            let folder = NormalizedPath::new(entry.path());
            if !folder.is_dir() {
                continue;
            }
            match read_installed(&folder, scope, engines) {
                Ok(Some(installed)) => {
                    if !visit(installed) {
                        return;
                    }
                }
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(%folder, %error, "skipping unreadable installed package");
                }
            }
        }
    }

    /// Find the installed package `reference` names, by case-insensitive
    /// package name.
    pub fn try_get_installed_package(
        &self,
        reference: &PartialReference,
        scope: InstalledScope,
        engines: &EngineRegistry,
    ) -> Option<InstalledPackage> {
        let mut found = None;
        self.enumerate_installed(scope, engines, &mut |installed| {
            if installed.meta.name.eq_ignore_ascii_case(&reference.name) {
                found = Some(installed);
                false
            } else {
                true
            }
        });
        found
    }
}

fn read_installed(
    folder: &NormalizedPath,
    scope: InstalledScope,
    engines: &EngineRegistry,
) -> Result<Option<InstalledPackage>> {
    let entries = fs::read_dir(folder.to_native())
        .map_err(|e| uppm_fs::Error::io(folder.to_native(), e))?;

    for entry in entries.flatten() {
        let file = NormalizedPath::new(entry.path());
        if !file.is_file() {
            continue;
        }
        let Some(engine) = file.extension().and_then(|ext| engines.by_extension(ext)) else {
            continue;
        };

        let text = uppm_fs::read_text(&file)?;
        let meta = engine.try_get_meta(&text, None)?;
        return Ok(Some(InstalledPackage {
            meta,
            folder: folder.clone(),
            scope,
        }));
    }

    Ok(None)
}

/// Short-name-keyed registry of target apps, with one of them selected
/// as current.
#[derive(Debug, Default)]
pub struct TargetAppRegistry {
    apps: IndexMap<String, TargetApp>,
    current: Option<String>,
}

impl TargetAppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, app: TargetApp) {
        self.apps.insert(app.short_name.to_lowercase(), app);
    }

    pub fn get(&self, short_name: &str) -> Option<&TargetApp> {
        self.apps.get(&short_name.to_lowercase())
    }

    pub fn current(&self) -> Option<&TargetApp> {
        self.current.as_ref().and_then(|key| self.apps.get(key))
    }

    /// Make `short_name` the active target app.
    ///
    /// The previous app's default repository leaves the repository
    /// registry's default set; the new app's default repository is
    /// created (or found) and registered as a default.
    pub fn set_current(
        &mut self,
        short_name: &str,
        repositories: &RepositoryRegistry,
    ) -> Result<()> {
        let key = short_name.to_lowercase();
        if !self.apps.contains_key(&key) {
            return Err(Error::UnknownTargetApp {
                name: short_name.to_string(),
            });
        }

        if let Some(previous) = self.current() {
            if let Some(url) = &previous.default_repository {
                repositories.remove_default(url);
            }
        }

        let app = &self.apps[&key];
        if let Some(url) = &app.default_repository {
            let repository = repositories.get_or_create(url)?;
            repositories.register_default(repository);
        }

        tracing::info!(target_app = %app.short_name, "target app selected");
        self.current = Some(key);
        Ok(())
    }
}
