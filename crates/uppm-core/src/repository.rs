//! Repository contract
//!
//! A repository is a catalog of packages keyed by complete references,
//! backed by a filesystem directory or a Git working tree. Backends live
//! in the `uppm-repo` crate; the core works against this trait and
//! creates backends through [`RepositoryFactory`] probing.

use std::sync::Arc;

use indexmap::IndexMap;
use uppm_fs::NormalizedPath;

use crate::engine::ScriptEngine;
use crate::package::Package;
use crate::reference::{CompleteReference, PartialReference};
use crate::Result;

/// Complete reference → package file path, in discovery order.
pub type Catalog = IndexMap<CompleteReference, NormalizedPath>;

/// Common contract over repository backends.
///
/// Every operation blocks until done; `refresh` in particular completes
/// any clone or scan before returning.
pub trait Repository: Send + Sync {
    /// The URL this repository was created from.
    fn url(&self) -> &str;

    /// Whether the last refresh succeeded and the catalog is usable.
    fn ready(&self) -> bool;

    /// The failure that made the repository not ready, if any.
    fn last_refresh_error(&self) -> Option<String>;

    /// Shape-check the URL without touching the filesystem or network.
    fn reference_syntactically_valid(&self) -> bool;

    /// Actively probe whether the backing store is reachable.
    fn exists(&self) -> bool;

    /// Rebuild the catalog.
    fn refresh(&self) -> Result<()>;

    /// A snapshot of the current catalog.
    fn catalog(&self) -> Catalog;

    /// The text of the package file `reference` points at.
    fn try_get_package_text(&self, reference: &CompleteReference) -> Option<String>;

    /// The engine owning the catalog entry's file extension.
    fn try_get_script_engine(&self, reference: &CompleteReference)
        -> Option<Arc<dyn ScriptEngine>>;

    /// Complete a partial reference against this repository's catalog.
    fn try_infer_reference(&self, partial: &PartialReference) -> Option<CompleteReference>;

    /// Load the package a partial reference resolves to in this
    /// repository. The shared pipeline is [`crate::loader::load_package`].
    fn try_get_package(&self, partial: &PartialReference) -> Result<Package>;
}

/// Constructs one backend kind from a URL.
///
/// The repository registry probes factories in registration order; the
/// first whose product passes the syntactic and existence checks wins.
pub trait RepositoryFactory: Send + Sync {
    /// Backend kind name for diagnostics.
    fn kind(&self) -> &str;

    fn create(&self, url: &str) -> Arc<dyn Repository>;
}
