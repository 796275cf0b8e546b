//! Configuration manifest
//!
//! `uppm.toml` declares the target applications, extra repositories and
//! engine runtime overrides:
//!
//! ```toml
//! [general]
//! temporary_folder = "/tmp/uppm"
//! target_app = "vvvv"
//!
//! [[target_app]]
//! short_name = "vvvv"
//! app_folder = "C:/vvvv"
//! global_packs_folder = "C:/vvvv/packs"
//! local_packs_folder = "./packs"
//! default_repository = "https://github.com/vvvv/uppm.vvvv.repo.git"
//!
//! [[repository]]
//! url = "https://example.com/more.packs.repo.git"
//!
//! [engines.ps1]
//! runtime = ["pwsh", "-NoProfile", "-File"]
//! ```
//!
//! Discovery order: the `--config` flag, `./uppm.toml`, then
//! `~/.config/uppm/uppm.toml`.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use uppm_core::TargetApp;
use uppm_fs::NormalizedPath;

use crate::error::{CliError, Result};

pub const CONFIG_FILE_NAME: &str = "uppm.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralSection,
    #[serde(rename = "target_app")]
    pub target_apps: Vec<TargetAppSection>,
    #[serde(rename = "repository")]
    pub repositories: Vec<RepositorySection>,
    pub engines: EnginesSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GeneralSection {
    /// Checkouts and materialized imports live here.
    pub temporary_folder: Option<String>,
    /// Target app selected when no `--target-app` flag is given.
    pub target_app: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetAppSection {
    pub short_name: String,
    #[serde(default)]
    pub architecture: Option<String>,
    pub app_folder: String,
    pub global_packs_folder: String,
    pub local_packs_folder: String,
    #[serde(default)]
    pub executable: Option<String>,
    #[serde(default)]
    pub default_repository: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositorySection {
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EnginesSection {
    pub csup: Option<RuntimeSection>,
    pub ps1: Option<RuntimeSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeSection {
    /// Runtime program followed by its leading arguments.
    pub runtime: Vec<String>,
}

impl Config {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| CliError::config(e.to_string()))
    }

    /// Load configuration from `explicit` or the discovery locations.
    /// No file at all yields the default configuration.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            let content = std::fs::read_to_string(path).map_err(|e| {
                CliError::config(format!("cannot read {}: {e}", path.display()))
            })?;
            return Self::parse(&content);
        }

        for candidate in discovery_paths() {
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate).map_err(|e| {
                    CliError::config(format!("cannot read {}: {e}", candidate.display()))
                })?;
                return Self::parse(&content);
            }
        }

        Ok(Self::default())
    }

    /// The temporary folder, defaulting beneath the OS temp dir.
    pub fn temporary_folder(&self) -> NormalizedPath {
        match &self.general.temporary_folder {
            Some(folder) => NormalizedPath::new(folder),
            None => NormalizedPath::new(std::env::temp_dir()).join("uppm"),
        }
    }
}

impl TargetAppSection {
    pub fn to_target_app(&self) -> TargetApp {
        TargetApp {
            short_name: self.short_name.clone(),
            architecture: self.architecture.clone(),
            app_folder: NormalizedPath::new(&self.app_folder),
            global_packs_folder: NormalizedPath::new(&self.global_packs_folder),
            local_packs_folder: NormalizedPath::new(&self.local_packs_folder),
            executable: self.executable.clone(),
            default_repository: self.default_repository.clone(),
        }
    }
}

fn discovery_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(home) = std::env::var_os("HOME") {
        paths.push(
            PathBuf::from(home)
                .join(".config")
                .join("uppm")
                .join(CONFIG_FILE_NAME),
        );
    }
    paths
}
