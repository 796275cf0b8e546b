//! Locked atomic file operations

use std::fs::{self, OpenOptions};
use std::io::Write;

use fs2::FileExt;

use crate::{Error, NormalizedPath, Result};

/// Read a UTF-8 text file.
pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native = path.to_native();
    let bytes = fs::read(&native).map_err(|e| Error::io(&native, e))?;
    String::from_utf8(bytes).map_err(|_| Error::NotText { path: native })
}

/// Create a directory and all of its parents.
pub fn ensure_dir(path: &NormalizedPath) -> Result<()> {
    let native = path.to_native();
    fs::create_dir_all(&native).map_err(|e| Error::io(&native, e))
}

/// Write content atomically under an advisory lock.
///
/// Writes to a sibling temp file first, then renames over the target so
/// readers never observe a partial file. Used for materialized import
/// scripts, which may be re-resolved while an engine still holds the
/// previous copy.
pub fn write_atomic(path: &NormalizedPath, content: &[u8]) -> Result<()> {
    let native = path.to_native();

    if let Some(parent) = native.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let temp_name = format!(
        ".{}.{}.part",
        native
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = native.with_file_name(temp_name);

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;

    file.lock_exclusive().map_err(|_| Error::LockFailed {
        path: native.clone(),
    })?;

    file.write_all(content)
        .map_err(|e| Error::io(&temp_path, e))?;
    file.sync_all().map_err(|e| Error::io(&temp_path, e))?;

    file.unlock().map_err(|_| Error::LockFailed {
        path: native.clone(),
    })?;
    drop(file);

    fs::rename(&temp_path, &native).map_err(|e| Error::io(&native, e))
}

/// Write UTF-8 text atomically.
pub fn write_text(path: &NormalizedPath, content: &str) -> Result<()> {
    write_atomic(path, content.as_bytes())
}
