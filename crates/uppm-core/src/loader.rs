//! Package loading pipeline
//!
//! The shared helper behind `Repository::try_get_package`: infer the
//! complete reference, bind the engine, fetch the text, extract the
//! metadata, and stamp the resolved version onto it.

use crate::package::Package;
use crate::reference::PartialReference;
use crate::repository::Repository;
use crate::{Error, Result};

/// Load the package `partial` resolves to inside `repository`.
pub fn load_package<R: Repository + ?Sized>(
    repository: &R,
    partial: &PartialReference,
) -> Result<Package> {
    if !repository.ready() {
        return Err(Error::RepositoryRefreshFailed {
            url: repository.url().to_string(),
            message: repository
                .last_refresh_error()
                .unwrap_or_else(|| "repository has not been refreshed".to_string()),
        });
    }

    let complete =
        repository
            .try_infer_reference(partial)
            .ok_or_else(|| Error::PackageNotFound {
                reference: partial.to_string(),
            })?;
    tracing::debug!(reference = %complete, "reference inferred");

    let engine =
        repository
            .try_get_script_engine(&complete)
            .ok_or_else(|| Error::EngineUnavailable {
                reference: complete.to_string(),
            })?;

    let text =
        repository
            .try_get_package_text(&complete)
            .ok_or_else(|| Error::PackageTextUnavailable {
                reference: complete.to_string(),
            })?;

    let mut meta = engine.try_get_meta(&text, Some(&complete))?;
    meta.version = complete.version.clone();

    Ok(Package::new(meta, engine))
}
