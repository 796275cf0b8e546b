//! uppm command line interface

mod cli;
mod commands;
mod config;
mod context;
mod error;
mod prompt;

use clap::Parser;
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Commands, RepoCommands};
use config::Config;
use context::Session;
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
        tracing::debug!("Verbose mode enabled");
    }

    let config = Config::load(cli.config.as_deref())?;
    let mut session = Session::bootstrap(&config, cli.target_app.as_deref(), cli.unattended)?;

    match cli.command {
        Commands::Install {
            reference,
            no_deps,
            force_resync,
        } => commands::run_install(&mut session, &reference, no_deps, force_resync),
        Commands::Run { action, reference } => {
            commands::run_custom_action(&mut session, &action, &reference)
        }
        Commands::Info { reference } => commands::run_info(&mut session, &reference),
        Commands::List { scope } => commands::run_list(&session, scope.into()),
        Commands::Repo(RepoCommands::List) => commands::run_repo_list(&session),
        Commands::Repo(RepoCommands::Refresh { url }) => {
            commands::run_repo_refresh(&session, &url)
        }
    }
}
