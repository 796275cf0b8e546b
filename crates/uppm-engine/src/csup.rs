//! The C#-script engine
//!
//! Owns the `csup` extension. Headers live in `/* … */` comments,
//! imports use `#load "uppm-ref:…"` directives, and any action name is
//! passed through to the runtime, which dispatches on `UPPM_ACTION`.

use std::sync::LazyLock;

use indexmap::IndexSet;
use uppm_core::{
    ActionHost, CompleteReference, HeaderExtractor, ImportSource, Package, PackageMeta,
    PartialReference, Result, ScriptEngine,
};
use uppm_fs::NormalizedPath;

use crate::imports::{materialize_declared, reference_slug, rewrite_load_directives};
use crate::runtime::RuntimeCommand;

pub const CSUP_EXTENSION: &str = "csup";

static EXTRACTOR: LazyLock<HeaderExtractor> =
    LazyLock::new(|| HeaderExtractor::new(r"/\*", r"\*/"));

pub struct CsupEngine {
    runtime: RuntimeCommand,
}

impl CsupEngine {
    pub fn new(runtime: RuntimeCommand) -> Self {
        Self { runtime }
    }
}

impl Default for CsupEngine {
    fn default() -> Self {
        Self::new(RuntimeCommand::new("dotnet-script", Vec::new()))
    }
}

impl ScriptEngine for CsupEngine {
    fn name(&self) -> &str {
        "csup"
    }

    fn extension(&self) -> &str {
        CSUP_EXTENSION
    }

    fn allow_system_association(&self) -> bool {
        true
    }

    fn try_get_meta(
        &self,
        text: &str,
        reference: Option<&CompleteReference>,
    ) -> Result<PackageMeta> {
        EXTRACTOR.extract(text, reference)
    }

    fn try_get_script_text(
        &self,
        text: &str,
        imports: &IndexSet<PartialReference>,
        parent_repository: Option<&str>,
        source: &dyn ImportSource,
        temporary_folder: &NormalizedPath,
    ) -> Result<String> {
        materialize_declared(imports, parent_repository, source, self.name(), temporary_folder)?;
        rewrite_load_directives(text, parent_repository, source, self.name(), temporary_folder, 0)
    }

    fn run_action(
        &self,
        package: &Package,
        action: &str,
        host: &ActionHost,
        source: &dyn ImportSource,
    ) -> Result<()> {
        let text = self.try_get_script_text(
            &package.meta.script_text,
            &package.meta.imports,
            package.meta.repository.as_deref(),
            source,
            &host.temporary_folder,
        )?;

        let script = host.temporary_folder.join(self.name()).join(format!(
            "{}.{}",
            reference_slug(
                &package.meta.name,
                &package.meta.version,
                package.meta.repository.as_deref(),
            ),
            self.extension()
        ));
        uppm_fs::write_text(&script, &text)?;

        self.runtime.run(&script, action, package, host)
    }
}
