//! The in-memory package representation

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::engine::ScriptEngine;
use crate::meta::PackageMeta;
use crate::reference::PartialReference;

/// Where an installed package lives for a given target app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstalledScope {
    Global,
    #[default]
    Local,
}

impl fmt::Display for InstalledScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::Local => f.write_str("local"),
        }
    }
}

/// A loaded package: metadata plus its engine binding.
///
/// Packages are built per resolution and dropped when the action
/// completes. The root of a resolution owns `flat_dependencies`, the
/// name-keyed mapping containing every transitive dependency exactly
/// once; descendants keep theirs empty.
#[derive(Clone)]
pub struct Package {
    pub meta: PackageMeta,
    pub engine: Arc<dyn ScriptEngine>,
    pub scope: InstalledScope,
    /// Distance from the resolution root; 0 on the root itself.
    pub depth: u32,
    /// Keys are lowercased package names.
    pub flat_dependencies: IndexMap<String, Package>,
}

impl Package {
    pub fn new(meta: PackageMeta, engine: Arc<dyn ScriptEngine>) -> Self {
        Self {
            meta,
            engine,
            scope: InstalledScope::default(),
            depth: 0,
            flat_dependencies: IndexMap::new(),
        }
    }

    /// The key under which this package appears in `flat_dependencies`.
    pub fn flat_key(name: &str) -> String {
        name.to_lowercase()
    }

    /// Scope after applying the `forceGlobal` metadata override.
    pub fn effective_scope(&self) -> InstalledScope {
        if self.meta.force_global {
            InstalledScope::Global
        } else {
            self.scope
        }
    }

    pub fn reference(&self) -> PartialReference {
        self.meta.reference()
    }
}

impl fmt::Debug for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Package")
            .field("name", &self.meta.name)
            .field("version", &self.meta.version)
            .field("engine", &self.engine.name())
            .field("scope", &self.scope)
            .field("depth", &self.depth)
            .field(
                "flat_dependencies",
                &self.flat_dependencies.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}
