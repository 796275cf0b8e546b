//! Scope-aware package versions
//!
//! Versions have up to four components, `major.minor.build.revision`, and
//! only the major component is mandatory. What a missing component means
//! depends on who is asking: a search for `2.3` wants missing components
//! treated as "as new as possible", while a comparison against a fully
//! specified version wants them treated as zero. The policy is therefore
//! carried on each [`Version`] value and applied whenever components are
//! read for comparison.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

use regex::Regex;

use crate::{Error, Result};

/// Version grammar fragment reused by the metadata header pattern.
pub const VERSION_PATTERN: &str = r"\d+(?:\.\d+){0,3}";

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:\.(\d+))?$").unwrap());

static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([\[\(])\s*([0-9.]*?)\s*,\s*([0-9.]*?)\s*([\]\)])\s*$").unwrap()
});

/// Policy for components the version string did not specify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Inference {
    /// Treat a missing component as the maximum value. This is the search
    /// policy: `2.3` means "the newest 2.3 there is".
    #[default]
    Newest,
    /// Treat a missing component as zero.
    Zero,
}

/// A package version with up to four components.
///
/// Equality, ordering and hashing all go through [`Version::components`],
/// so two versions compare by what their inference policies make of them,
/// never by the raw optional fields.
#[derive(Debug, Clone, Copy)]
pub struct Version {
    major: u32,
    minor: Option<u32>,
    build: Option<u32>,
    revision: Option<u32>,
    missing: Inference,
}

impl Version {
    /// Parse a version string such as `2`, `2.3`, `2.3.1` or `2.3.1.4`.
    ///
    /// The resulting version uses [`Inference::Newest`]; call
    /// [`Version::with_inference`] to change the policy.
    pub fn parse(input: &str) -> Result<Self> {
        let caps = VERSION_RE
            .captures(input.trim())
            .ok_or_else(|| Error::InvalidVersion {
                input: input.to_string(),
            })?;

        let component = |i: usize| -> Result<Option<u32>> {
            match caps.get(i) {
                None => Ok(None),
                Some(m) => m
                    .as_str()
                    .parse::<u32>()
                    .map(Some)
                    .map_err(|_| Error::InvalidVersion {
                        input: input.to_string(),
                    }),
            }
        };

        Ok(Self {
            major: component(1)?.expect("major is mandatory in the grammar"),
            minor: component(2)?,
            build: component(3)?,
            revision: component(4)?,
            missing: Inference::default(),
        })
    }

    /// The version that outranks every semantical version.
    ///
    /// Used to treat the `latest` label as a semantical version during
    /// inference.
    pub fn newest() -> Self {
        Self {
            major: u32::MAX,
            minor: None,
            build: None,
            revision: None,
            missing: Inference::Newest,
        }
    }

    /// Return the same version under a different missing-component policy.
    pub fn with_inference(mut self, missing: Inference) -> Self {
        self.missing = missing;
        self
    }

    pub fn inference(&self) -> Inference {
        self.missing
    }

    /// Index of the deepest explicitly specified component.
    ///
    /// `2` has scope 0, `2.3.1.4` has scope 3.
    pub fn scope(&self) -> usize {
        if self.revision.is_some() {
            3
        } else if self.build.is_some() {
            2
        } else if self.minor.is_some() {
            1
        } else {
            0
        }
    }

    /// All four components with the missing-component policy applied.
    pub fn components(&self) -> [u32; 4] {
        let fill = match self.missing {
            Inference::Newest => u32::MAX,
            Inference::Zero => 0,
        };
        [
            self.major,
            self.minor.unwrap_or(fill),
            self.build.unwrap_or(fill),
            self.revision.unwrap_or(fill),
        ]
    }

    /// The raw component at `index` (0..=3), `None` when unspecified.
    pub fn explicit_component(&self, index: usize) -> Option<u32> {
        match index {
            0 => Some(self.major),
            1 => self.minor,
            2 => self.build,
            3 => self.revision,
            _ => None,
        }
    }

    /// Whether this version lies inside the given range expression.
    ///
    /// The expression is either a bare version, meaning "this version or
    /// newer", or an interval such as `[1.0, 2.0)` with square brackets
    /// inclusive and parentheses exclusive. Either bound may be omitted.
    pub fn is_inside_range(&self, expr: &str) -> Result<bool> {
        let range = VersionRange::parse(expr)?;
        Ok(range.contains(self))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.components() == other.components()
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components().cmp(&other.components())
    }
}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.components().hash(state);
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.major)?;
        for part in [self.minor, self.build, self.revision].into_iter().flatten() {
            write!(f, ".{part}")?;
        }
        Ok(())
    }
}

/// The version of this uppm build, against which packages declare their
/// minimum requirement.
static CORE_VERSION: LazyLock<Version> = LazyLock::new(|| {
    Version::parse(env!("CARGO_PKG_VERSION"))
        .expect("CARGO_PKG_VERSION is a valid version")
        .with_inference(Inference::Zero)
});

pub fn core_version() -> Version {
    *CORE_VERSION
}

/// A package's minimum-core-version declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionRequirement {
    pub min_version: Version,
    pub compatible: bool,
}

impl VersionRequirement {
    /// Evaluate `min_version` against the running core version.
    ///
    /// Both sides are compared under [`Inference::Zero`], so `0.1`
    /// requires at least `0.1.0.0`.
    pub fn new(min_version: Version) -> Self {
        let compatible = min_version.with_inference(Inference::Zero) <= core_version();
        Self {
            min_version,
            compatible,
        }
    }
}

/// An inclusive/exclusive interval of versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionRange {
    lower: Option<Version>,
    upper: Option<Version>,
    lower_inclusive: bool,
    upper_inclusive: bool,
}

impl VersionRange {
    /// Parse a range expression.
    ///
    /// `[1.0, 2.0]`, `(1.0, 2.0)`, `[1.0,)` and `[,2.0]` are intervals; a
    /// bare version `v` is shorthand for `[v,)`. Lower bounds compare
    /// under [`Inference::Zero`] and upper bounds under
    /// [`Inference::Newest`], so `[,2.3]` still admits every `2.3.*`.
    pub fn parse(expr: &str) -> Result<Self> {
        let trimmed = expr.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidVersionRange {
                input: expr.to_string(),
            });
        }

        if let Some(caps) = RANGE_RE.captures(trimmed) {
            let bound = |i: usize, missing: Inference| -> Result<Option<Version>> {
                let text = caps.get(i).map(|m| m.as_str()).unwrap_or("");
                if text.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Version::parse(text)?.with_inference(missing)))
                }
            };
            return Ok(Self {
                lower: bound(2, Inference::Zero)?,
                upper: bound(3, Inference::Newest)?,
                lower_inclusive: &caps[1] == "[",
                upper_inclusive: &caps[4] == "]",
            });
        }

        // Bare version: at least this version.
        let lower = Version::parse(trimmed).map_err(|_| Error::InvalidVersionRange {
            input: expr.to_string(),
        })?;
        Ok(Self {
            lower: Some(lower.with_inference(Inference::Zero)),
            upper: None,
            lower_inclusive: true,
            upper_inclusive: false,
        })
    }

    pub fn contains(&self, version: &Version) -> bool {
        if let Some(lower) = &self.lower {
            let ok = if self.lower_inclusive {
                version >= lower
            } else {
                version > lower
            };
            if !ok {
                return false;
            }
        }
        if let Some(upper) = &self.upper {
            let ok = if self.upper_inclusive {
                version <= upper
            } else {
                version < upper
            };
            if !ok {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_parse_component_counts() {
        assert_eq!(v("2").scope(), 0);
        assert_eq!(v("2.3").scope(), 1);
        assert_eq!(v("2.3.0").scope(), 2);
        assert_eq!(v("2.3.0.7").scope(), 3);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "a", "1.a", "1..2", "1.2.3.4.5", "-1", "1.2-rc"] {
            assert!(Version::parse(bad).is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn test_display_round_trip_preserves_scope() {
        for s in ["2", "2.3", "2.3.0", "2.3.0.7", "0.1.0"] {
            let parsed = v(s);
            assert_eq!(parsed.to_string(), s);
            assert_eq!(Version::parse(&parsed.to_string()).unwrap(), parsed);
        }
    }

    #[test]
    fn test_newest_inference_fills_with_max() {
        let version = v("2.3").with_inference(Inference::Newest);
        assert_eq!(version.components(), [2, 3, u32::MAX, u32::MAX]);
    }

    #[test]
    fn test_zero_inference_fills_with_zero() {
        let version = v("2.3").with_inference(Inference::Zero);
        assert_eq!(version.components(), [2, 3, 0, 0]);
    }

    #[test]
    fn test_comparison_is_total() {
        let versions = ["1", "1.2", "1.2.3", "2", "2.0.0.1"];
        for a in versions {
            for b in versions {
                let (a, b) = (v(a), v(b));
                let outcomes =
                    [a < b, a == b, a > b].iter().filter(|o| **o).count();
                assert_eq!(outcomes, 1, "{a} vs {b}");
            }
        }
    }

    #[test]
    fn test_partial_version_newest_beats_fuller() {
        // Under the search policy, 2.3 stands for the newest 2.3.*.
        assert!(v("2.3") > v("2.3.12"));
        assert!(v("2.3").with_inference(Inference::Zero) < v("2.3.12"));
    }

    #[test]
    fn test_each_side_keeps_its_own_policy() {
        let search = v("1.2").with_inference(Inference::Newest);
        let floor = v("1.2").with_inference(Inference::Zero);
        assert!(search > floor);
        assert!(floor < search);
    }

    #[test]
    fn test_requirement_against_core_version() {
        assert!(VersionRequirement::new(v("0.0.1")).compatible);
        assert!(VersionRequirement::new(core_version()).compatible);
        assert!(!VersionRequirement::new(v("999.0")).compatible);
    }

    #[test]
    fn test_range_inclusive_bounds() {
        let range = VersionRange::parse("[1.0, 2.0]").unwrap();
        assert!(range.contains(&v("1.0")));
        assert!(range.contains(&v("1.5.3")));
        assert!(range.contains(&v("2.0.9")));
        assert!(!range.contains(&v("0.9")));
        assert!(!range.contains(&v("2.1")));
    }

    #[test]
    fn test_range_exclusive_bounds() {
        let range = VersionRange::parse("(1.0, 2.0)").unwrap();
        assert!(!range.contains(&v("1.0").with_inference(Inference::Zero)));
        assert!(range.contains(&v("1.0.1")));
        assert!(!range.contains(&v("2.0").with_inference(Inference::Newest)));
    }

    #[test]
    fn test_range_open_ends() {
        assert!(VersionRange::parse("[2.0,)")
            .unwrap()
            .contains(&v("99.0")));
        assert!(VersionRange::parse("[,2.0]")
            .unwrap()
            .contains(&v("0.1")));
    }

    #[test]
    fn test_bare_version_means_at_least() {
        let range = VersionRange::parse("2.3").unwrap();
        assert!(range.contains(&v("2.3")));
        assert!(range.contains(&v("3.0")));
        assert!(!range.contains(&v("2.2.9").with_inference(Inference::Zero)));
    }

    #[test]
    fn test_range_rejects_garbage() {
        for bad in ["", "[", "[1.0", "1.0]", "[a,b]"] {
            assert!(VersionRange::parse(bad).is_err(), "{bad:?}");
        }
    }
}
