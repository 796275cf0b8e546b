//! Runtime invocation
//!
//! Engines do not embed their scripting language; they hand the
//! materialized script to an external runtime binary. The host context
//! travels through `UPPM_*` environment variables so any runtime can
//! read it without argument-parsing conventions.

use std::process::Command;

use uppm_core::{ActionHost, Error, Package, Result};
use uppm_fs::NormalizedPath;

/// The command line that launches an engine's runtime.
#[derive(Debug, Clone)]
pub struct RuntimeCommand {
    pub program: String,
    /// Arguments placed before the script path.
    pub args: Vec<String>,
}

impl RuntimeCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Run `script` for `action`, blocking until the runtime exits.
    ///
    /// Standard streams are inherited; install scripts may interact with
    /// the user directly unless the host says unattended.
    pub fn run(
        &self,
        script: &NormalizedPath,
        action: &str,
        package: &Package,
        host: &ActionHost,
    ) -> Result<()> {
        let reference = package.reference().to_string();
        let fail = |message: String| Error::ActionFailed {
            action: action.to_string(),
            reference: reference.clone(),
            message,
        };

        tracing::debug!(%script, program = %self.program, action, "spawning runtime");
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(script.to_native())
            .env("UPPM_ACTION", action)
            .env("UPPM_PACK_NAME", &package.meta.name)
            .env("UPPM_PACK_VERSION", &package.meta.version)
            .env("UPPM_PACK_FOLDER", host.pack_folder.as_str())
            .env("UPPM_TARGET_APP", &host.target_app.short_name)
            .env("UPPM_APP_FOLDER", host.target_app.app_folder.as_str())
            .env("UPPM_SCOPE", host.scope.to_string())
            .env("UPPM_TEMP", host.temporary_folder.as_str())
            .env("UPPM_UNATTENDED", host.unattended.to_string())
            .status()
            .map_err(|e| fail(format!("could not start {}: {e}", self.program)))?;

        if status.success() {
            Ok(())
        } else {
            Err(fail(format!("runtime exited with {status}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use uppm_core::{InstalledScope, ScriptEngine, TargetApp};

    use crate::csup::CsupEngine;

    fn fixture(temp: &tempfile::TempDir) -> (Package, ActionHost, NormalizedPath) {
        let root = NormalizedPath::new(temp.path());
        let engine = Arc::new(CsupEngine::default());
        let script_text = "/*\nuppm 0.1 { name: \"pack\", version: \"1.0\" }\n*/\nbody\n";
        let meta = engine.try_get_meta(script_text, None).unwrap();
        let package = Package::new(meta, engine);

        let host = ActionHost {
            target_app: TargetApp {
                short_name: "app".into(),
                architecture: None,
                app_folder: root.join("app"),
                global_packs_folder: root.join("global"),
                local_packs_folder: root.join("local"),
                executable: None,
                default_repository: None,
            },
            scope: InstalledScope::Local,
            pack_folder: root.join("local").join("pack"),
            temporary_folder: root.join("temp"),
            unattended: true,
        };

        let script = root.join("script.csup");
        uppm_fs::write_text(&script, script_text).unwrap();
        (package, host, script)
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_runtime_exit() {
        let temp = tempfile::TempDir::new().unwrap();
        let (package, host, script) = fixture(&temp);

        let runtime = RuntimeCommand::new("true", Vec::new());
        runtime.run(&script, "install", &package, &host).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_action_failed() {
        let temp = tempfile::TempDir::new().unwrap();
        let (package, host, script) = fixture(&temp);

        let runtime = RuntimeCommand::new("false", Vec::new());
        let result = runtime.run(&script, "install", &package, &host);
        assert!(matches!(result, Err(Error::ActionFailed { .. })));
    }

    #[test]
    fn test_missing_runtime_is_action_failed() {
        let temp = tempfile::TempDir::new().unwrap();
        let (package, host, script) = fixture(&temp);

        let runtime = RuntimeCommand::new("uppm-no-such-runtime-binary", Vec::new());
        let result = runtime.run(&script, "install", &package, &host);
        match result {
            Err(Error::ActionFailed { message, .. }) => {
                assert!(message.contains("could not start"));
            }
            other => panic!("expected ActionFailed, got {other:?}"),
        }
    }
}
