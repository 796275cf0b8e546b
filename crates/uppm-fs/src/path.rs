//! Forward-slash-normalized path handling

use std::path::{Path, PathBuf};

/// A path stored with forward slashes regardless of platform.
///
/// Repository catalogs, pack folders and temp-file locations all travel
/// through this type; conversion to the platform-native form happens only
/// at I/O boundaries via [`NormalizedPath::to_native`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedPath {
    inner: String,
}

impl NormalizedPath {
    /// Create a normalized path from any path-like input.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let raw = path.as_ref().to_string_lossy().replace('\\', "/");
        // A single trailing slash carries no meaning for directories;
        // keep "/" itself intact.
        let inner = if raw.len() > 1 {
            raw.trim_end_matches('/').to_string()
        } else {
            raw
        };
        Self { inner }
    }

    /// The normalized string form.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Convert to a platform-native [`PathBuf`] for I/O.
    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    /// Append one or more segments.
    pub fn join(&self, segment: impl AsRef<str>) -> Self {
        let segment = segment.as_ref().replace('\\', "/");
        let segment = segment.trim_start_matches('/');
        if self.inner.is_empty() {
            return Self::new(segment);
        }
        Self::new(format!("{}/{}", self.inner, segment))
    }

    /// Parent directory, if any.
    pub fn parent(&self) -> Option<Self> {
        let cut = self.inner.rfind('/')?;
        if cut == 0 {
            return Some(Self {
                inner: "/".to_string(),
            });
        }
        Some(Self {
            inner: self.inner[..cut].to_string(),
        })
    }

    /// Final path component.
    pub fn file_name(&self) -> Option<&str> {
        self.inner.rsplit('/').next().filter(|s| !s.is_empty())
    }

    /// Final component with its extension removed.
    pub fn file_stem(&self) -> Option<&str> {
        let name = self.file_name()?;
        match name.rfind('.') {
            Some(0) | None => Some(name),
            Some(idx) => Some(&name[..idx]),
        }
    }

    /// Extension of the final component, without the dot.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name()?;
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(&name[idx + 1..]),
        }
    }

    pub fn exists(&self) -> bool {
        self.to_native().exists()
    }

    pub fn is_dir(&self) -> bool {
        self.to_native().is_dir()
    }

    pub fn is_file(&self) -> bool {
        self.to_native().is_file()
    }
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.inner)
    }
}

impl From<&str> for NormalizedPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NormalizedPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<PathBuf> for NormalizedPath {
    fn from(p: PathBuf) -> Self {
        Self::new(p)
    }
}

impl From<&Path> for NormalizedPath {
    fn from(p: &Path) -> Self {
        Self::new(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backslashes_normalized() {
        let p = NormalizedPath::new(r"C:\packs\author\pack");
        assert_eq!(p.as_str(), "C:/packs/author/pack");
    }

    #[test]
    fn test_join_and_parent() {
        let p = NormalizedPath::new("/repo").join("author").join("pack");
        assert_eq!(p.as_str(), "/repo/author/pack");
        assert_eq!(p.parent().unwrap().as_str(), "/repo/author");
    }

    #[test]
    fn test_trailing_slash_dropped() {
        let p = NormalizedPath::new("/repo/");
        assert_eq!(p.as_str(), "/repo");
    }

    #[test]
    fn test_file_name_stem_extension() {
        let p = NormalizedPath::new("/repo/author/pack/1.2.3.csup");
        assert_eq!(p.file_name(), Some("1.2.3.csup"));
        assert_eq!(p.file_stem(), Some("1.2.3"));
        assert_eq!(p.extension(), Some("csup"));
    }

    #[test]
    fn test_dotfile_has_no_extension() {
        let p = NormalizedPath::new("/repo/.hidden");
        assert_eq!(p.extension(), None);
        assert_eq!(p.file_stem(), Some(".hidden"));
    }

    #[test]
    fn test_root_parent() {
        let p = NormalizedPath::new("/repo");
        assert_eq!(p.parent().unwrap().as_str(), "/");
    }
}
