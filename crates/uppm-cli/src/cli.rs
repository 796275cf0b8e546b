//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// uppm - decentralized package manager for target applications
#[derive(Parser, Debug)]
#[command(name = "uppm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file to use instead of the discovered one
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Target application to operate on
    #[arg(short = 't', long, global = true)]
    pub target_app: Option<String>,

    /// Never prompt; answer every question with its default
    #[arg(long, global = true)]
    pub unattended: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install a package and its dependencies
    ///
    /// The reference follows `name:version@repository`, where version
    /// and repository are optional.
    ///
    /// Examples:
    ///   uppm install mypack
    ///   uppm install mypack:2.3
    ///   uppm install "mypack:latest@https://example.com/packs.repo.git"
    Install {
        /// Package reference to install
        reference: String,

        /// Install only this package, not its dependencies
        #[arg(long)]
        no_deps: bool,

        /// Fetch Git repositories again even if already synchronized
        #[arg(long)]
        force_resync: bool,
    },

    /// Run an arbitrary engine action for a package
    Run {
        /// Action name, e.g. "uninstall"
        action: String,

        /// Package reference
        reference: String,
    },

    /// Resolve a reference and show its metadata without running anything
    Info {
        /// Package reference
        reference: String,
    },

    /// List installed packages of the current target app
    List {
        /// Which installation scope to list
        #[arg(long, value_enum, default_value_t)]
        scope: ScopeArg,
    },

    /// Inspect or refresh repositories
    #[command(subcommand)]
    Repo(RepoCommands),
}

#[derive(Subcommand, Debug)]
pub enum RepoCommands {
    /// Show every repository known to this run
    List,

    /// Refresh one repository by URL
    Refresh {
        /// Repository URL
        url: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScopeArg {
    Global,
    #[default]
    Local,
}

impl From<ScopeArg> for uppm_core::InstalledScope {
    fn from(scope: ScopeArg) -> Self {
        match scope {
            ScopeArg::Global => Self::Global,
            ScopeArg::Local => Self::Local,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_install_flags() {
        let cli = Cli::parse_from([
            "uppm",
            "--target-app",
            "vvvv",
            "install",
            "mypack:2.3",
            "--no-deps",
        ]);
        assert_eq!(cli.target_app.as_deref(), Some("vvvv"));
        match cli.command {
            Commands::Install {
                reference,
                no_deps,
                force_resync,
            } => {
                assert_eq!(reference, "mypack:2.3");
                assert!(no_deps);
                assert!(!force_resync);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_run_takes_action_then_reference() {
        let cli = Cli::parse_from(["uppm", "run", "uninstall", "mypack"]);
        match cli.command {
            Commands::Run { action, reference } => {
                assert_eq!(action, "uninstall");
                assert_eq!(reference, "mypack");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_list_scope_defaults_to_local() {
        let cli = Cli::parse_from(["uppm", "list"]);
        match cli.command {
            Commands::List { scope } => assert_eq!(scope, ScopeArg::Local),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
