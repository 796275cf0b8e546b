//! Catalog construction
//!
//! Both backends index packages through the same fixed-depth walk over
//! `<root>/<author>/<name>/<version>.<extension>`. The author level is
//! informational only; the file stem becomes the version and the
//! extension must belong to a registered engine for the entry to count.

use std::fs;
use std::path::Path;

use uppm_core::{Catalog, CompleteReference, EngineRegistry};
use uppm_fs::NormalizedPath;

/// Walk `root` and build the catalog for the repository at `url`.
///
/// Entries appear sorted by author, package and file name so the catalog
/// order is stable across platforms. Unreadable directories are skipped.
pub fn scan(root: &NormalizedPath, url: &str, engines: &EngineRegistry) -> Catalog {
    let mut catalog = Catalog::new();

    for author in sorted_entries(&root.to_native(), EntryKind::Dir) {
        for pack in sorted_entries(&author, EntryKind::Dir) {
            let Some(pack_name) = dir_name(&pack) else {
                continue;
            };
            for file in sorted_entries(&pack, EntryKind::File) {
                let path = NormalizedPath::new(&file);
                let (Some(version), Some(extension)) = (path.file_stem(), path.extension())
                else {
                    continue;
                };
                if engines.by_extension(extension).is_none() {
                    continue;
                }
                catalog.insert(CompleteReference::new(pack_name, version, url), path);
            }
        }
    }

    tracing::debug!(url, entries = catalog.len(), "catalog scanned");
    catalog
}

enum EntryKind {
    Dir,
    File,
}

/// Child paths of `dir` of the requested kind, sorted by name, hidden
/// entries excluded.
fn sorted_entries(dir: &Path, kind: EntryKind) -> Vec<std::path::PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut paths: Vec<_> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'));
            let kind_matches = match kind {
                EntryKind::Dir => path.is_dir(),
                EntryKind::File => path.is_file(),
            };
            !hidden && kind_matches
        })
        .collect();
    paths.sort();
    paths
}

fn dir_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}
