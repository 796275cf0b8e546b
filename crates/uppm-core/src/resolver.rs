//! Dependency resolution
//!
//! Flattens the transitive dependency graph of a root package into its
//! `flat_dependencies` mapping, reconciling against already installed
//! packages and resolving name collisions through an ordered rule set.
//! A dependency that fails to load is logged and left out; it never
//! aborts the build.

use crate::engine::EngineRegistry;
use crate::package::{InstalledScope, Package};
use crate::prompt::UserInput;
use crate::reference::{PartialReference, VersionKind};
use crate::registry::RepositoryRegistry;
use crate::target::TargetAppRegistry;
use crate::version::Version;
use crate::Result;
use uppm_fs::NormalizedPath;

/// Shared collaborators for resolution and action running.
pub struct ResolveContext<'a> {
    pub repositories: &'a RepositoryRegistry,
    pub targets: &'a TargetAppRegistry,
    pub engines: &'a EngineRegistry,
    pub prompt: &'a dyn UserInput,
    pub temporary_folder: NormalizedPath,
    pub unattended: bool,
}

/// Build the flat dependency set of `root`.
///
/// Idempotent for a fixed catalog and installed inventory: re-running
/// produces the same mapping.
pub fn resolve_dependencies(root: &mut Package, ctx: &ResolveContext) -> Result<()> {
    let dependencies: Vec<PartialReference> = root.meta.dependencies.iter().cloned().collect();
    let scope = root.effective_scope();

    let mut flat = std::mem::take(&mut root.flat_dependencies);
    flat.clear();
    add_dependencies(&dependencies, 0, scope, &mut flat, ctx)?;
    root.flat_dependencies = flat;
    Ok(())
}

/// Process the dependency list of a node at `parent_depth`.
fn add_dependencies(
    dependencies: &[PartialReference],
    parent_depth: u32,
    scope: InstalledScope,
    flat: &mut indexmap::IndexMap<String, Package>,
    ctx: &ResolveContext,
) -> Result<()> {
    for dependency in dependencies {
        let mut dep_ref = dependency.clone();

        // Phase 1: reconcile with what is already installed.
        match reconcile_installed(&dep_ref, scope, ctx) {
            Reconciled::Skip => continue,
            Reconciled::Update => {}
            Reconciled::UpdateWithExisting(installed) => dep_ref = installed,
        }

        // Phase 2: load. A failure here is not fatal for the tree.
        let package = match ctx.repositories.try_get_package(&dep_ref) {
            Ok(package) => package,
            Err(error) => {
                tracing::warn!(reference = %dep_ref, %error, "skipping unloadable dependency");
                continue;
            }
        };

        // Phase 3: flatten, resolving name collisions.
        merge_dependency(package, parent_depth + 1, scope, flat, ctx)?;
    }
    Ok(())
}

/// Insert `candidate` into the flat set, or resolve the collision with
/// the entry already holding its name.
fn merge_dependency(
    mut candidate: Package,
    depth: u32,
    scope: InstalledScope,
    flat: &mut indexmap::IndexMap<String, Package>,
    ctx: &ResolveContext,
) -> Result<()> {
    let key = Package::flat_key(&candidate.meta.name);
    candidate.depth = depth;
    candidate.scope = scope;

    let Some(existing) = flat.get(&key) else {
        let children: Vec<PartialReference> =
            candidate.meta.dependencies.iter().cloned().collect();
        let child_scope = candidate.effective_scope();
        flat.insert(key, candidate);
        return add_dependencies(&children, depth, child_scope, flat, ctx);
    };

    if resolve_conflict(existing, &candidate) == Winner::Candidate {
        let children: Vec<PartialReference> =
            candidate.meta.dependencies.iter().cloned().collect();
        let child_scope = candidate.effective_scope();
        // IndexMap keeps the original position on reinsert, so the
        // mapping stays deterministic across conflict rewrites.
        flat.insert(key, candidate);
        return add_dependencies(&children, depth, child_scope, flat, ctx);
    }

    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Winner {
    Existing,
    Candidate,
}

/// The ordered conflict rules for two packages sharing a name.
///
/// Non-special beats special, specific beats `latest`, and between
/// semantical versions the higher wins under newest inference. Only a
/// candidate win triggers re-running tree construction, because only
/// then does an unvisited dependency list enter the flat set.
fn resolve_conflict(existing: &Package, candidate: &Package) -> Winner {
    let name = candidate.meta.name.as_str();
    let e_version = existing.meta.version.as_str();
    let c_version = candidate.meta.version.as_str();
    let e_kind = version_kind(e_version);
    let c_kind = version_kind(c_version);

    let e_special = matches!(e_kind, VersionKind::Special);
    let c_special = matches!(c_kind, VersionKind::Special);
    if e_special && c_special {
        if !e_version.eq_ignore_ascii_case(c_version) {
            tracing::warn!(
                name,
                existing = e_version,
                candidate = c_version,
                "conflicting special versions, keeping the first"
            );
        }
        return Winner::Existing;
    }
    if e_special != c_special {
        tracing::warn!(
            name,
            existing = e_version,
            candidate = c_version,
            "special and non-special versions collide, keeping the non-special"
        );
        return if e_special {
            Winner::Candidate
        } else {
            Winner::Existing
        };
    }

    let e_latest = matches!(e_kind, VersionKind::Latest);
    let c_latest = matches!(c_kind, VersionKind::Latest);
    if e_latest && c_latest {
        return Winner::Existing;
    }
    if e_latest != c_latest {
        // The more specific side wins over the bare `latest` label.
        return if e_latest {
            Winner::Candidate
        } else {
            Winner::Existing
        };
    }

    // Both semantical at this point.
    let e_semver = Version::parse(e_version).expect("classified as semantical");
    let c_semver = Version::parse(c_version).expect("classified as semantical");

    let winner = if c_semver > e_semver {
        Winner::Candidate
    } else {
        Winner::Existing
    };
    if e_semver.components()[..2] != c_semver.components()[..2] {
        tracing::warn!(
            name,
            existing = e_version,
            candidate = c_version,
            "major/minor version conflict between dependency requests"
        );
    }
    winner
}

fn version_kind(version: &str) -> VersionKind {
    PartialReference {
        name: String::new(),
        version: Some(version.to_string()),
        ..Default::default()
    }
    .version_kind()
}

enum Reconciled {
    /// Nothing to do; the dependency does not enter the tree.
    Skip,
    /// Proceed with the requested reference.
    Update,
    /// Proceed with the installed package's own reference.
    UpdateWithExisting(PartialReference),
}

/// The installed-package reconciliation decision table.
///
/// Consults the current target app for an installed package with the
/// dependency's name in the effective scope and decides whether to skip,
/// follow the request, or adopt the installed reference.
fn reconcile_installed(
    dep_ref: &PartialReference,
    scope: InstalledScope,
    ctx: &ResolveContext,
) -> Reconciled {
    let Some(app) = ctx.targets.current() else {
        return Reconciled::Update;
    };
    let Some(installed) = app.try_get_installed_package(dep_ref, scope, ctx.engines) else {
        return Reconciled::Update;
    };

    let installed_version = installed.meta.version.clone();
    let requested_version = dep_ref.version.clone();
    let name = dep_ref.name.as_str();

    // Exact version string match: already satisfied.
    if requested_version
        .as_deref()
        .is_some_and(|v| v.eq_ignore_ascii_case(&installed_version))
    {
        return Reconciled::Skip;
    }

    let installed_kind = version_kind(&installed_version);
    let requested_kind = dep_ref.version_kind();

    let installed_special = matches!(installed_kind, VersionKind::Special);
    let requested_special = matches!(requested_kind, VersionKind::Special);
    if installed_special && requested_special {
        tracing::warn!(
            name,
            installed = %installed_version,
            requested = ?requested_version,
            "conflicting special versions, keeping the installed package"
        );
        return Reconciled::Skip;
    }

    if matches!(installed_kind, VersionKind::Latest) && !requested_special {
        let question = format!(
            "{name} is installed as 'latest'. Keep the installed package instead of {}?",
            requested_version.as_deref().unwrap_or("the newest release"),
        );
        return if ctx.prompt.confirm(&question, true) {
            Reconciled::UpdateWithExisting(installed.meta.reference())
        } else {
            Reconciled::Skip
        };
    }

    if let (Some(installed_semver), Some(requested_semver)) = (
        parse_semantical(&installed_kind),
        parse_semantical(&requested_kind),
    ) {
        if installed_semver == requested_semver {
            return Reconciled::Skip;
        }
        if requested_semver > installed_semver {
            let question = format!(
                "{name} {installed_version} is installed. Update to {}?",
                requested_version.as_deref().unwrap_or("a newer version"),
            );
            return if ctx.prompt.confirm(&question, false) {
                Reconciled::Update
            } else {
                Reconciled::Skip
            };
        }
        if installed_semver.components()[0] > requested_semver.components()[0] {
            tracing::warn!(
                name,
                installed = %installed_version,
                requested = ?requested_version,
                "major version conflict with the installed package, keeping it"
            );
            return Reconciled::Skip;
        }
        if installed_semver.scope() < requested_semver.scope() {
            let question = format!(
                "{name} is installed with the broader version {installed_version}. Keep it?"
            );
            return if ctx.prompt.confirm(&question, true) {
                Reconciled::UpdateWithExisting(installed.meta.reference())
            } else {
                Reconciled::Skip
            };
        }
        // Installed is newer than requested within the same major.
        let question =
            format!("{name} {installed_version} is installed. Downgrade to {requested_semver}?");
        return if ctx.prompt.confirm(&question, false) {
            Reconciled::Update
        } else {
            Reconciled::Skip
        };
    }

    Reconciled::Update
}

fn parse_semantical(kind: &VersionKind) -> Option<Version> {
    match kind {
        VersionKind::Semantical(version) => Some(*version),
        _ => None,
    }
}
