//! Action execution
//!
//! Runs a named action over a resolved package and its flat dependency
//! set. Dependency failures abort the run; there is no rollback, partial
//! filesystem effects remain for the user to inspect.

use crate::engine::ActionHost;
use crate::package::Package;
use crate::resolver::{resolve_dependencies, ResolveContext};
use crate::{Error, Result};

/// The action gated by license confirmation.
pub const INSTALL_ACTION: &str = "install";

/// Execute `action` for `package` and, when `recursive`, for its flat
/// dependencies first.
///
/// On the root invocation this builds the dependency tree if it has not
/// been built yet, and for `install` asks the user to accept the
/// licenses involved before anything runs.
pub fn run_action(
    package: &mut Package,
    action: &str,
    recursive: bool,
    confirm_license: bool,
    ctx: &ResolveContext,
) -> Result<()> {
    let target_name =
        package
            .meta
            .target_app
            .clone()
            .ok_or_else(|| Error::UnknownTargetApp {
                name: format!("<none declared by {}>", package.meta.name),
            })?;
    let app = ctx
        .targets
        .get(&target_name)
        .ok_or(Error::UnknownTargetApp { name: target_name })?
        .clone();

    if package.depth == 0 && recursive {
        if package.flat_dependencies.is_empty() {
            resolve_dependencies(package, ctx)?;
        }
        if action == INSTALL_ACTION && confirm_license && !confirm_licenses(package, ctx) {
            return Err(Error::ActionFailed {
                action: action.to_string(),
                reference: package.reference().to_string(),
                message: "license terms were not accepted".to_string(),
            });
        }
    }

    if recursive {
        for dependency in package.flat_dependencies.values_mut() {
            if let Err(error) = run_action(dependency, action, true, confirm_license, ctx) {
                tracing::error!(
                    reference = %dependency.reference(),
                    %error,
                    "dependency action failed, aborting"
                );
                return Err(match error {
                    failed @ Error::ActionFailed { .. } => failed,
                    other => Error::ActionFailed {
                        action: action.to_string(),
                        reference: dependency.reference().to_string(),
                        message: other.to_string(),
                    },
                });
            }
        }
    }

    let host = ActionHost {
        scope: package.effective_scope(),
        pack_folder: app.installed_pack_folder(&package.meta.name, package.effective_scope()),
        target_app: app,
        temporary_folder: ctx.temporary_folder.clone(),
        unattended: ctx.unattended,
    };

    tracing::info!(reference = %package.reference(), action, "running action");
    package
        .engine
        .run_action(package, action, &host, ctx.repositories)
}

/// Show every license in the tree and ask for one confirmation.
fn confirm_licenses(package: &Package, ctx: &ResolveContext) -> bool {
    let mut lines = vec![license_line(package)];
    lines.extend(package.flat_dependencies.values().map(license_line));

    let question = format!(
        "Installing the following packages:\n{}\nDo you accept the license terms?",
        lines.join("\n")
    );
    ctx.prompt.confirm(&question, true)
}

fn license_line(package: &Package) -> String {
    format!(
        "  {} {} (license: {})",
        package.meta.name,
        package.meta.version,
        package.meta.license.as_deref().unwrap_or("unspecified")
    )
}
