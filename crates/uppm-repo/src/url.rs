//! Repository URL recognition

use std::sync::LazyLock;

use regex::Regex;

static GIT_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^https?://\S+?\.git(?:[?:].*)?$").unwrap());

static DRIVE_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]:[\\/]").unwrap());

/// What kind of backend a URL's shape asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    /// A remote Git repository over http(s).
    Git,
    /// An absolute filesystem location, including UNC shares.
    FilesystemAbsolute,
    /// A filesystem location relative to the working directory.
    FilesystemRelative,
    Unrecognized,
}

/// Classify a repository URL by shape alone; no I/O.
pub fn classify(url: &str) -> UrlKind {
    if GIT_URL_RE.is_match(url) {
        return UrlKind::Git;
    }
    if url.starts_with("\\\\") || url.starts_with("//") || DRIVE_PREFIX_RE.is_match(url) {
        return UrlKind::FilesystemAbsolute;
    }
    if url.starts_with('.') || url.starts_with('\\') || url.starts_with('/') {
        return UrlKind::FilesystemRelative;
    }
    UrlKind::Unrecognized
}
