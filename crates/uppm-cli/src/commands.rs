//! Command implementations

use colored::Colorize;
use uppm_core::{run_action, InstalledScope, INSTALL_ACTION};

use crate::context::Session;
use crate::error::{CliError, Result};

pub fn run_install(
    session: &mut Session,
    reference: &str,
    no_deps: bool,
    force_resync: bool,
) -> Result<()> {
    if force_resync {
        uppm_repo::set_force_synchronization(true);
    }

    let partial = session.parse_reference(reference)?;
    let mut package = session.repositories.try_get_package(&partial)?;
    run_action(
        &mut package,
        INSTALL_ACTION,
        !no_deps,
        true,
        &session.context(),
    )?;

    println!(
        "{} {} {}",
        "installed".green().bold(),
        package.meta.name,
        package.meta.version
    );
    Ok(())
}

pub fn run_custom_action(session: &mut Session, action: &str, reference: &str) -> Result<()> {
    let partial = session.parse_reference(reference)?;
    let mut package = session.repositories.try_get_package(&partial)?;
    run_action(&mut package, action, true, false, &session.context())?;

    println!(
        "{} {} for {} {}",
        "completed".green().bold(),
        action,
        package.meta.name,
        package.meta.version
    );
    Ok(())
}

pub fn run_info(session: &mut Session, reference: &str) -> Result<()> {
    let partial = session.parse_reference(reference)?;
    let package = session.repositories.try_get_package(&partial)?;
    let meta = &package.meta;

    println!("{} {}", meta.name.bold(), meta.version);
    let optional = [
        ("target app", &meta.target_app),
        ("author", &meta.author),
        ("license", &meta.license),
        ("project", &meta.project_url),
        ("repository", &meta.repository),
        ("description", &meta.description),
    ];
    for (label, value) in optional {
        if let Some(value) = value {
            println!("  {}: {}", label.cyan(), value);
        }
    }
    if meta.force_global {
        println!("  {}: installs globally", "scope".cyan());
    }
    if !meta.dependencies.is_empty() {
        println!("  {}:", "dependencies".cyan());
        for dependency in &meta.dependencies {
            println!("    {dependency}");
        }
    }
    Ok(())
}

pub fn run_list(session: &Session, scope: InstalledScope) -> Result<()> {
    let app = session
        .targets
        .current()
        .ok_or_else(|| CliError::user("no target app configured"))?;

    let mut count = 0usize;
    app.enumerate_installed(scope, session.engines(), &mut |installed| {
        println!(
            "{} {} {}",
            installed.meta.name.bold(),
            installed.meta.version,
            format!("({})", installed.scope).dimmed()
        );
        count += 1;
        true
    });

    if count == 0 {
        println!(
            "no {scope} packages installed for {}",
            app.short_name.bold()
        );
    }
    Ok(())
}

pub fn run_repo_list(session: &Session) -> Result<()> {
    let repositories = session.repositories.present();
    if repositories.is_empty() {
        println!("no repositories known yet");
        return Ok(());
    }

    for repository in repositories {
        let status = if repository.ready() {
            "ready".green()
        } else {
            "not ready".red()
        };
        println!(
            "{} [{status}] {} packages",
            repository.url(),
            repository.catalog().len()
        );
    }
    Ok(())
}

pub fn run_repo_refresh(session: &Session, url: &str) -> Result<()> {
    let repository = session.repositories.get_or_create(url)?;
    repository.refresh()?;
    println!(
        "{} {} ({} packages)",
        "refreshed".green().bold(),
        repository.url(),
        repository.catalog().len()
    );
    Ok(())
}
