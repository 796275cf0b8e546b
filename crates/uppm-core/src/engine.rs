//! Script engine contract
//!
//! A script engine binds one file extension to the machinery that reads
//! package metadata, materializes executable script text (resolving
//! imports) and runs named actions. Engine implementations live in the
//! `uppm-engine` crate; the resolver only sees this trait.

use std::sync::Arc;

use indexmap::IndexMap;
use indexmap::IndexSet;
use uppm_fs::NormalizedPath;

use crate::meta::PackageMeta;
use crate::package::{InstalledScope, Package};
use crate::reference::{CompleteReference, PartialReference};
use crate::target::TargetApp;
use crate::Result;

/// Bound on recursive import resolution.
pub const MAX_IMPORT_DEPTH: u32 = 500;

/// An import resolved through the repository registry.
#[derive(Debug, Clone)]
pub struct ResolvedImport {
    pub reference: CompleteReference,
    /// Extension of the imported script, which names the owning engine.
    pub extension: String,
    pub text: String,
}

/// Lookup seam through which engines resolve `uppm-ref:` imports.
///
/// Implemented by the repository registry; engines receive it as a trait
/// object so the engine crate needs no knowledge of repositories.
pub trait ImportSource {
    /// Resolve an import reference, falling back to `parent_repository`
    /// when the reference names no repository of its own.
    fn resolve_import(
        &self,
        reference: &PartialReference,
        parent_repository: Option<&str>,
    ) -> Result<ResolvedImport>;
}

/// Everything an action invocation may need from its surroundings.
#[derive(Debug, Clone)]
pub struct ActionHost {
    pub target_app: TargetApp,
    pub scope: InstalledScope,
    /// The folder this package installs into.
    pub pack_folder: NormalizedPath,
    pub temporary_folder: NormalizedPath,
    pub unattended: bool,
}

/// The binding between a file extension and a scripting runtime.
pub trait ScriptEngine: Send + Sync {
    /// Engine name, used for temp-folder layout and diagnostics.
    fn name(&self) -> &str;

    /// The one file extension (without dot) this engine owns.
    fn extension(&self) -> &str;

    /// Whether the OS integration may associate the extension with uppm.
    /// Advisory only; the core never reads it.
    fn allow_system_association(&self) -> bool {
        false
    }

    /// Extract package metadata from script text.
    fn try_get_meta(
        &self,
        text: &str,
        reference: Option<&CompleteReference>,
    ) -> Result<PackageMeta>;

    /// Produce the executable script text, materializing `imports` and
    /// any engine-specific import directives into temp files.
    fn try_get_script_text(
        &self,
        text: &str,
        imports: &IndexSet<PartialReference>,
        parent_repository: Option<&str>,
        source: &dyn ImportSource,
        temporary_folder: &NormalizedPath,
    ) -> Result<String>;

    /// Run a named action for `package`.
    fn run_action(
        &self,
        package: &Package,
        action: &str,
        host: &ActionHost,
        source: &dyn ImportSource,
    ) -> Result<()>;
}

/// Extension-keyed engine lookup, populated once at startup.
#[derive(Default)]
pub struct EngineRegistry {
    engines: IndexMap<String, Arc<dyn ScriptEngine>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an engine under its extension. A later registration for
    /// the same extension replaces the earlier one.
    pub fn register(&mut self, engine: Arc<dyn ScriptEngine>) {
        self.engines
            .insert(engine.extension().to_ascii_lowercase(), engine);
    }

    /// Look up the engine owning `extension` (case-insensitive, no dot).
    pub fn by_extension(&self, extension: &str) -> Option<Arc<dyn ScriptEngine>> {
        self.engines.get(&extension.to_ascii_lowercase()).cloned()
    }

    /// Registered extensions in registration order.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.engines.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

impl std::fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("extensions", &self.engines.keys().collect::<Vec<_>>())
            .finish()
    }
}
