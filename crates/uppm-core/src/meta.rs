//! Package metadata and header extraction
//!
//! A package script carries its metadata in a header comment near the top
//! of the file:
//!
//! ```text
//! /*
//! uppm 0.1.0 {
//!     name: my-pack
//!     version: "1.2"
//!     dependencies: [ "other-pack:1.0" ]
//! }
//! */
//! ```
//!
//! The comment delimiters are engine-specific; each engine contributes a
//! [`HeaderExtractor`] built from its own delimiter pair. The payload is
//! HJSON and everything beyond the known fields is retained verbatim in
//! [`PackageMeta::metadata_object`].

use indexmap::IndexSet;
use regex::Regex;
use serde::Deserialize;

use crate::reference::{CompleteReference, PartialReference};
use crate::version::{core_version, Version, VersionRequirement, VERSION_PATTERN};
use crate::{Error, Result};

/// Locates and parses the uppm header comment for one delimiter pair.
#[derive(Debug)]
pub struct HeaderExtractor {
    pattern: Regex,
}

impl HeaderExtractor {
    /// Build an extractor from two regex fragments matching the opening
    /// and closing comment delimiter.
    ///
    /// Panics on an invalid fragment; delimiters are engine constants.
    pub fn new(open: &str, close: &str) -> Self {
        let pattern = format!(r"(?s){open}\s+uppm\s+({VERSION_PATTERN})\s+(.*?)\s*{close}");
        Self {
            pattern: Regex::new(&pattern).expect("engine header delimiters form a valid pattern"),
        }
    }

    /// Extract [`PackageMeta`] from script text.
    ///
    /// `reference` is the complete reference being loaded, when known; it
    /// labels errors and fills the repository field if the header left it
    /// empty.
    pub fn extract(
        &self,
        text: &str,
        reference: Option<&CompleteReference>,
    ) -> Result<PackageMeta> {
        let origin = reference
            .map(|r| r.to_string())
            .unwrap_or_else(|| "<script>".to_string());

        let caps = self
            .pattern
            .captures(text)
            .ok_or(Error::MalformedHeader { name: origin })?;

        let required = VersionRequirement::new(Version::parse(&caps[1])?);
        if !required.compatible {
            return Err(Error::CoreTooOld {
                required: required.min_version.to_string(),
                current: core_version().to_string(),
            });
        }

        let value: serde_json::Value =
            deser_hjson::from_str(&caps[2]).map_err(|e| Error::MalformedMetadata {
                message: e.to_string(),
            })?;

        let mut meta = PackageMeta::from_value(value)?;
        meta.required_core_version = Some(required);
        meta.raw_text = text.to_string();
        meta.script_text = text.to_string();
        if meta.repository.is_none() {
            meta.repository = reference.map(|r| r.repository.clone());
        }
        Ok(meta)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct HeaderFields {
    name: Option<String>,
    version: Option<String>,
    target_app: Option<String>,
    compatible_app_version: Option<String>,
    author: Option<String>,
    license: Option<String>,
    project_url: Option<String>,
    repository: Option<String>,
    description: Option<String>,
    force_global: bool,
    dependencies: Vec<String>,
    imports: Vec<String>,
}

/// Everything the header declares about a package.
#[derive(Debug, Clone, Default)]
pub struct PackageMeta {
    pub name: String,
    pub version: String,
    pub target_app: Option<String>,
    pub compatible_app_version: Option<String>,
    pub required_core_version: Option<VersionRequirement>,
    pub author: Option<String>,
    pub license: Option<String>,
    pub project_url: Option<String>,
    pub repository: Option<String>,
    pub description: Option<String>,
    pub force_global: bool,
    /// Direct dependencies in declaration order, deduplicated
    /// case-insensitively.
    pub dependencies: IndexSet<PartialReference>,
    /// Script imports in declaration order.
    pub imports: IndexSet<PartialReference>,
    /// The unmodified script file text.
    pub raw_text: String,
    /// The text handed to the engine for execution.
    pub script_text: String,
    /// The full parsed header payload, including fields uppm does not
    /// interpret.
    pub metadata_object: serde_json::Value,
}

impl PackageMeta {
    /// Build metadata from a parsed header payload.
    ///
    /// `name` and `version` are mandatory; everything else defaults.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let fields: HeaderFields =
            serde_json::from_value(value.clone()).map_err(|e| Error::MalformedMetadata {
                message: e.to_string(),
            })?;

        let name = fields
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| Error::MalformedMetadata {
                message: "missing required field: name".to_string(),
            })?;
        let version = fields
            .version
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| Error::MalformedMetadata {
                message: "missing required field: version".to_string(),
            })?;

        Ok(Self {
            name,
            version,
            target_app: fields.target_app,
            compatible_app_version: fields.compatible_app_version,
            required_core_version: None,
            author: fields.author,
            license: fields.license,
            project_url: fields.project_url,
            repository: fields.repository,
            description: fields.description,
            force_global: fields.force_global,
            dependencies: parse_reference_list(fields.dependencies)?,
            imports: parse_reference_list(fields.imports)?,
            raw_text: String::new(),
            script_text: String::new(),
            metadata_object: value,
        })
    }

    /// The back-reference identifying this package, built from the three
    /// identifying fields.
    pub fn reference(&self) -> PartialReference {
        PartialReference {
            name: self.name.clone(),
            version: Some(self.version.clone()),
            repository: self.repository.clone(),
            target_app: self.target_app.clone(),
        }
    }

    /// Whether `app_version` satisfies the `compatibleAppVersion` range.
    ///
    /// No declared range means compatible with everything.
    pub fn is_app_compatible(&self, app_version: &Version) -> Result<bool> {
        match &self.compatible_app_version {
            None => Ok(true),
            Some(expr) => app_version.is_inside_range(expr),
        }
    }
}

fn parse_reference_list(entries: Vec<String>) -> Result<IndexSet<PartialReference>> {
    let mut references = IndexSet::new();
    for entry in entries {
        references.insert(PartialReference::parse(&entry)?);
    }
    Ok(references)
}
