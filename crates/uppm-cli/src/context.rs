//! Session wiring
//!
//! Builds the process-wide registries from the configuration manifest:
//! engines (with runtime overrides), repository factories and extra
//! repositories, target apps and the selected current app.

use std::sync::Arc;

use uppm_core::{
    EngineRegistry, PartialReference, RepositoryRegistry, ResolveContext, TargetAppRegistry,
    Unattended, UserInput,
};
use uppm_engine::{CsupEngine, Ps1Engine, RuntimeCommand};
use uppm_fs::NormalizedPath;
use uppm_repo::{register_default_factories, GitOptions};

use crate::config::{Config, RuntimeSection};
use crate::error::{CliError, Result};
use crate::prompt::ConsolePrompt;

/// Everything a command needs, wired once per invocation.
pub struct Session {
    engines: Arc<EngineRegistry>,
    pub repositories: RepositoryRegistry,
    pub targets: TargetAppRegistry,
    temporary_folder: NormalizedPath,
    unattended: bool,
    prompt: Box<dyn UserInput>,
}

impl Session {
    pub fn bootstrap(
        config: &Config,
        target_app: Option<&str>,
        unattended: bool,
    ) -> Result<Self> {
        let temporary_folder = config.temporary_folder();

        let mut engines = EngineRegistry::new();
        match runtime_command(config.engines.csup.as_ref())? {
            Some(runtime) => engines.register(Arc::new(CsupEngine::new(runtime))),
            None => engines.register(Arc::new(CsupEngine::default())),
        }
        match runtime_command(config.engines.ps1.as_ref())? {
            Some(runtime) => engines.register(Arc::new(Ps1Engine::new(runtime))),
            None => engines.register(Arc::new(Ps1Engine::default())),
        }
        let engines = Arc::new(engines);

        let repositories = RepositoryRegistry::new();
        register_default_factories(
            &repositories,
            engines.clone(),
            GitOptions::new(temporary_folder.clone()),
        );

        for section in &config.repositories {
            match repositories.get_or_create(&section.url) {
                Ok(repository) => repositories.register_default(repository),
                Err(error) => {
                    tracing::warn!(url = %section.url, %error, "skipping configured repository")
                }
            }
        }

        let mut targets = TargetAppRegistry::new();
        for section in &config.target_apps {
            targets.register(section.to_target_app());
        }

        let selected = target_app
            .map(String::from)
            .or_else(|| config.general.target_app.clone())
            .or_else(|| config.target_apps.first().map(|a| a.short_name.clone()));
        if let Some(name) = selected {
            targets.set_current(&name, &repositories)?;
        }

        let prompt: Box<dyn UserInput> = if unattended {
            Box::new(Unattended)
        } else {
            Box::new(ConsolePrompt)
        };

        Ok(Self {
            engines,
            repositories,
            targets,
            temporary_folder,
            unattended,
            prompt,
        })
    }

    pub fn context(&self) -> ResolveContext<'_> {
        ResolveContext {
            repositories: &self.repositories,
            targets: &self.targets,
            engines: &self.engines,
            prompt: self.prompt.as_ref(),
            temporary_folder: self.temporary_folder.clone(),
            unattended: self.unattended,
        }
    }

    pub fn engines(&self) -> &EngineRegistry {
        &self.engines
    }

    /// Parse a user-supplied reference, accepting both the text form and
    /// the `uppm-ref:` URI form. A URI naming a different target app
    /// switches the session to it.
    pub fn parse_reference(&mut self, input: &str) -> Result<PartialReference> {
        let trimmed = input.trim();
        let is_uri = trimmed
            .get(..uppm_core::reference::URI_SCHEME.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(uppm_core::reference::URI_SCHEME));
        let reference = if is_uri {
            PartialReference::parse_uri(trimmed)?
        } else {
            PartialReference::parse(trimmed)?
        };

        if let Some(app) = &reference.target_app {
            let already_current = self
                .targets
                .current()
                .is_some_and(|current| current.short_name.eq_ignore_ascii_case(app));
            if !already_current {
                self.targets.set_current(app, &self.repositories)?;
            }
        }

        Ok(reference)
    }
}

fn runtime_command(section: Option<&RuntimeSection>) -> Result<Option<RuntimeCommand>> {
    let Some(section) = section else {
        return Ok(None);
    };
    let (program, args) = section
        .runtime
        .split_first()
        .ok_or_else(|| CliError::config("engine runtime must name a program"))?;
    Ok(Some(RuntimeCommand::new(program.clone(), args.to_vec())))
}
