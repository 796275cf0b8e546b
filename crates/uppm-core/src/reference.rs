//! Package references
//!
//! The textual form is `name:version@repository` where the version and
//! repository parts are optional; the URI form used by import directives
//! and OS integration is `uppm-ref:<target-app>/<text-form>`. References
//! are case-insensitive everywhere, including as map keys.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use regex::Regex;

use crate::version::Version;
use crate::{Error, Result};

/// URI scheme of the uri form.
pub const URI_SCHEME: &str = "uppm-ref:";

// Name and version may contain spaces but neither the grammar separators
// nor characters that cannot appear in a file name.
static TEXT_FORM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*([^:@<>"/\\|?*]+?)\s*(?::\s*([^:@<>"/\\|?*]+?)\s*)?(?:@\s*(.+?)\s*)?$"#)
        .unwrap()
});

/// Classification of a reference's version field, which drives inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionKind {
    /// No version requested.
    Unspecified,
    /// The case-insensitive label `latest`.
    Latest,
    /// Parses as a [`Version`].
    Semantical(Version),
    /// Any other non-empty label, e.g. `nightly`.
    Special,
}

/// A user-supplied reference in which any field but the name may be absent.
#[derive(Debug, Clone, Default)]
pub struct PartialReference {
    pub name: String,
    pub version: Option<String>,
    pub repository: Option<String>,
    pub target_app: Option<String>,
}

impl PartialReference {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Parse the `name:version@repository` text form.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || Error::InvalidReference {
            input: input.to_string(),
        };

        let caps = TEXT_FORM_RE.captures(input).ok_or_else(invalid)?;
        let name = caps.get(1).ok_or_else(invalid)?.as_str().to_string();
        if name.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            name,
            version: caps.get(2).map(|m| m.as_str().to_string()),
            repository: caps.get(3).map(|m| m.as_str().to_string()),
            target_app: None,
        })
    }

    /// Parse the `uppm-ref:<target-app>/<text-form>` URI form.
    ///
    /// The input is URL-decoded before parsing. The target-app prefix is
    /// mandatory in this form.
    pub fn parse_uri(input: &str) -> Result<Self> {
        let invalid = || Error::InvalidReference {
            input: input.to_string(),
        };

        let trimmed = input.trim();
        let scheme_matches = trimmed
            .get(..URI_SCHEME.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(URI_SCHEME));
        if !scheme_matches {
            return Err(invalid());
        }

        let decoded = percent_decode_str(&trimmed[URI_SCHEME.len()..])
            .decode_utf8()
            .map_err(|_| invalid())?;

        let (target_app, text_form) = decoded.split_once('/').ok_or_else(invalid)?;
        let target_app = target_app.trim();
        if target_app.is_empty() {
            return Err(invalid());
        }

        let mut reference = Self::parse(text_form)?;
        reference.target_app = Some(target_app.to_string());
        Ok(reference)
    }

    /// Classify the version field.
    pub fn version_kind(&self) -> VersionKind {
        classify(self.version.as_deref())
    }

    pub fn is_latest(&self) -> bool {
        matches!(self.version_kind(), VersionKind::Latest)
    }

    pub fn is_special(&self) -> bool {
        matches!(self.version_kind(), VersionKind::Special)
    }

    /// The version as a [`Version`], with `latest` standing in for the
    /// newest possible version.
    pub fn semantical_version(&self) -> Option<Version> {
        match self.version_kind() {
            VersionKind::Semantical(v) => Some(v),
            VersionKind::Latest => Some(Version::newest()),
            _ => None,
        }
    }

    /// Whether two references identify the same package.
    ///
    /// Names compare case-insensitively; repositories must both be absent
    /// or both equal; versions are compared with `version_comparator`.
    /// The default comparator is [`default_version_match`].
    pub fn matches(
        &self,
        other: &PartialReference,
        version_comparator: impl Fn(Option<&str>, Option<&str>) -> bool,
    ) -> bool {
        if !self.name.eq_ignore_ascii_case(&other.name) {
            return false;
        }
        let repositories_match = match (&self.repository, &other.repository) {
            (None, None) => true,
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        };
        repositories_match
            && version_comparator(self.version.as_deref(), other.version.as_deref())
    }
}

/// The default version comparator for [`PartialReference::matches`].
///
/// Both semantical: semantical equality. Both non-semantical: string
/// equality, case-insensitive. Both absent: a match. Anything else is a
/// mismatch.
pub fn default_version_match(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => match (Version::parse(a), Version::parse(b)) {
            (Ok(a), Ok(b)) => a == b,
            (Err(_), Err(_)) => a.eq_ignore_ascii_case(b),
            _ => false,
        },
        _ => false,
    }
}

impl fmt::Display for PartialReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(version) = &self.version {
            write!(f, ":{version}")?;
        }
        if let Some(repository) = &self.repository {
            write!(f, "@{repository}")?;
        }
        Ok(())
    }
}

impl PartialEq for PartialReference {
    fn eq(&self, other: &Self) -> bool {
        eq_ci(&self.name, &other.name)
            && eq_ci_opt(self.version.as_deref(), other.version.as_deref())
            && eq_ci_opt(self.repository.as_deref(), other.repository.as_deref())
    }
}

impl Eq for PartialReference {}

impl Hash for PartialReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_ci(&self.name, state);
        hash_ci_opt(self.version.as_deref(), state);
        hash_ci_opt(self.repository.as_deref(), state);
    }
}

/// A reference whose version and repository are known to resolve.
///
/// Only reference inference constructs these, which is what makes the
/// completeness contract hold.
#[derive(Debug, Clone)]
pub struct CompleteReference {
    pub name: String,
    pub version: String,
    pub repository: String,
}

impl CompleteReference {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        repository: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            repository: repository.into(),
        }
    }

    pub fn as_partial(&self) -> PartialReference {
        PartialReference {
            name: self.name.clone(),
            version: Some(self.version.clone()),
            repository: Some(self.repository.clone()),
            target_app: None,
        }
    }

    pub fn version_kind(&self) -> VersionKind {
        classify(Some(&self.version))
    }

    pub fn semantical_version(&self) -> Option<Version> {
        match self.version_kind() {
            VersionKind::Semantical(v) => Some(v),
            VersionKind::Latest => Some(Version::newest()),
            _ => None,
        }
    }
}

impl fmt::Display for CompleteReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}@{}", self.name, self.version, self.repository)
    }
}

impl PartialEq for CompleteReference {
    fn eq(&self, other: &Self) -> bool {
        eq_ci(&self.name, &other.name)
            && eq_ci(&self.version, &other.version)
            && eq_ci(&self.repository, &other.repository)
    }
}

impl Eq for CompleteReference {}

impl Hash for CompleteReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_ci(&self.name, state);
        hash_ci(&self.version, state);
        hash_ci(&self.repository, state);
    }
}

impl From<CompleteReference> for PartialReference {
    fn from(complete: CompleteReference) -> Self {
        complete.as_partial()
    }
}

fn classify(version: Option<&str>) -> VersionKind {
    match version {
        None => VersionKind::Unspecified,
        Some(v) if v.trim().is_empty() => VersionKind::Unspecified,
        Some(v) if v.eq_ignore_ascii_case("latest") => VersionKind::Latest,
        Some(v) => match Version::parse(v) {
            Ok(parsed) => VersionKind::Semantical(parsed),
            Err(_) => VersionKind::Special,
        },
    }
}

fn eq_ci(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

fn eq_ci_opt(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => eq_ci(a, b),
        _ => false,
    }
}

fn hash_ci<H: Hasher>(s: &str, state: &mut H) {
    for b in s.bytes() {
        state.write_u8(b.to_ascii_lowercase());
    }
    state.write_u8(0xff);
}

fn hash_ci_opt<H: Hasher>(s: Option<&str>, state: &mut H) {
    match s {
        None => state.write_u8(0),
        Some(s) => {
            state.write_u8(1);
            hash_ci(s, state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_only() {
        let r = PartialReference::parse("mypack").unwrap();
        assert_eq!(r.name, "mypack");
        assert_eq!(r.version, None);
        assert_eq!(r.repository, None);
    }

    #[test]
    fn test_parse_name_version() {
        let r = PartialReference::parse("mypack : 2.3").unwrap();
        assert_eq!(r.name, "mypack");
        assert_eq!(r.version.as_deref(), Some("2.3"));
    }

    #[test]
    fn test_parse_full_form() {
        let r = PartialReference::parse("mypack:2.3@https://example.com/packs.repo.git")
            .unwrap();
        assert_eq!(r.name, "mypack");
        assert_eq!(r.version.as_deref(), Some("2.3"));
        assert_eq!(
            r.repository.as_deref(),
            Some("https://example.com/packs.repo.git")
        );
    }

    #[test]
    fn test_parse_repo_without_version() {
        let r = PartialReference::parse("mypack@C:/my/repo").unwrap();
        assert_eq!(r.name, "mypack");
        assert_eq!(r.version, None);
        assert_eq!(r.repository.as_deref(), Some("C:/my/repo"));
    }

    #[test]
    fn test_parse_names_may_contain_spaces() {
        let r = PartialReference::parse("my pack : pre release").unwrap();
        assert_eq!(r.name, "my pack");
        assert_eq!(r.version.as_deref(), Some("pre release"));
    }

    #[test]
    fn test_parse_rejects_illegal_names() {
        for bad in ["", "  ", "a|b", "a?b:1", "<pack>"] {
            assert!(PartialReference::parse(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn test_parse_uri_form() {
        let r = PartialReference::parse_uri("uppm-ref:vvvv/mypack%3A2.3").unwrap();
        assert_eq!(r.target_app.as_deref(), Some("vvvv"));
        assert_eq!(r.name, "mypack");
        assert_eq!(r.version.as_deref(), Some("2.3"));
    }

    #[test]
    fn test_parse_uri_requires_target_app() {
        assert!(PartialReference::parse_uri("uppm-ref:mypack").is_err());
        assert!(PartialReference::parse_uri("mypack:2.3").is_err());
        assert!(PartialReference::parse_uri("uppm-ref:/mypack").is_err());
    }

    #[test]
    fn test_display_parse_round_trip() {
        let r = PartialReference::parse("MyPack:2.3@https://example.com/r.git").unwrap();
        assert_eq!(PartialReference::parse(&r.to_string()).unwrap(), r);
    }

    #[test]
    fn test_equality_is_case_insensitive() {
        let a = PartialReference::parse("MyPack:Nightly@C:/Repo").unwrap();
        let b = PartialReference::parse("mypack:nightly@c:/repo").unwrap();
        assert_eq!(a, b);

        let mut hashes = std::collections::HashSet::new();
        hashes.insert(a);
        assert!(hashes.contains(&b));
    }

    #[test]
    fn test_version_kinds() {
        let kind = |v: &str| PartialReference {
            name: "p".into(),
            version: Some(v.into()),
            ..Default::default()
        }
        .version_kind();

        assert_eq!(kind("Latest"), VersionKind::Latest);
        assert!(matches!(kind("2.3.1"), VersionKind::Semantical(_)));
        assert_eq!(kind("nightly"), VersionKind::Special);
        assert_eq!(
            PartialReference::new("p").version_kind(),
            VersionKind::Unspecified
        );
    }

    #[test]
    fn test_latest_is_newest_semantical() {
        let r = PartialReference {
            name: "p".into(),
            version: Some("latest".into()),
            ..Default::default()
        };
        assert!(r.semantical_version().unwrap() > Version::parse("999.9").unwrap());
    }

    #[test]
    fn test_matches_default_comparator() {
        let make = |v: Option<&str>| PartialReference {
            name: "p".into(),
            version: v.map(String::from),
            ..Default::default()
        };

        assert!(make(Some("2.3")).matches(&make(Some("2.3")), default_version_match));
        // Scope-aware semantics: 2.3 and 2.3.0.0 are different versions.
        assert!(!make(Some("2.3")).matches(&make(Some("2.3.0.0")), default_version_match));
        assert!(make(Some("RC1")).matches(&make(Some("rc1")), default_version_match));
        assert!(make(None).matches(&make(None), default_version_match));
        assert!(!make(Some("2.3")).matches(&make(Some("rc1")), default_version_match));
        assert!(!make(Some("2.3")).matches(&make(None), default_version_match));
    }

    #[test]
    fn test_matches_requires_same_repository_presence() {
        let mut a = PartialReference::new("p");
        let mut b = PartialReference::new("p");
        a.repository = Some("C:/repo".into());
        assert!(!a.matches(&b, default_version_match));
        b.repository = Some("c:/REPO".into());
        assert!(a.matches(&b, default_version_match));
    }
}
