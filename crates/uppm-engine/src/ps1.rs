//! The shell-script engine
//!
//! Owns the `ps1` extension. Headers live in `<# … #>` comments. Shell
//! packs have no import directives and support only the `install`
//! action, which runs the whole script.

use std::sync::LazyLock;

use indexmap::IndexSet;
use uppm_core::{
    ActionHost, CompleteReference, Error, HeaderExtractor, ImportSource, Package, PackageMeta,
    PartialReference, Result, ScriptEngine, INSTALL_ACTION,
};
use uppm_fs::NormalizedPath;

use crate::imports::reference_slug;
use crate::runtime::RuntimeCommand;

pub const PS1_EXTENSION: &str = "ps1";

static EXTRACTOR: LazyLock<HeaderExtractor> = LazyLock::new(|| HeaderExtractor::new("<#", "#>"));

pub struct Ps1Engine {
    runtime: RuntimeCommand,
}

impl Ps1Engine {
    pub fn new(runtime: RuntimeCommand) -> Self {
        Self { runtime }
    }
}

impl Default for Ps1Engine {
    fn default() -> Self {
        Self::new(RuntimeCommand::new(
            "pwsh",
            ["-NoProfile", "-ExecutionPolicy", "Bypass", "-File"]
                .map(String::from)
                .to_vec(),
        ))
    }
}

impl ScriptEngine for Ps1Engine {
    fn name(&self) -> &str {
        "ps1"
    }

    fn extension(&self) -> &str {
        PS1_EXTENSION
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
        _imports: &IndexSet<PartialReference>,
        _parent_repository: Option<&str>,
        _source: &dyn ImportSource,
        _temporary_folder: &NormalizedPath,
    ) -> Result<String> {
        Ok(text.to_string())
    }

    fn run_action(
        &self,
        package: &Package,
        action: &str,
        host: &ActionHost,
        _source: &dyn ImportSource,
    ) -> Result<()> {
        if action != INSTALL_ACTION {
            return Err(Error::ActionUnsupported {
                engine: self.name().to_string(),
                action: action.to_string(),
            });
        }

        let script = host.temporary_folder.join(self.name()).join(format!(
            "{}.{}",
            reference_slug(
                &package.meta.name,
                &package.meta.version,
                package.meta.repository.as_deref(),
            ),
            self.extension()
        ));
        uppm_fs::write_text(&script, &package.meta.script_text)?;

        self.runtime.run(&script, action, package, host)
    }
}
