//! Import resolution
//!
//! Engines reference other packages through `#load "uppm-ref:…"`
//! directives. Each directive is resolved through the repository
//! registry, the imported script is materialized into a temp file (its
//! own imports resolved first), and the directive is rewritten to point
//! at that file. Engines therefore need no in-memory source maps; the
//! runtime just reads files.

use std::sync::LazyLock;

use indexmap::IndexSet;
use regex::Regex;
use uppm_core::{Error, ImportSource, PartialReference, Result, MAX_IMPORT_DEPTH};
use uppm_fs::NormalizedPath;

static LOAD_DIRECTIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^[ \t]*#load\s+"(uppm-ref:[^"]+)""#).unwrap());

/// Rewrite every `#load "uppm-ref:…"` directive in `text` to point at a
/// materialized temp file.
///
/// `parent_repository` scopes repository-less imports to the repository
/// of the enclosing script. `depth` counts nesting; crossing
/// [`MAX_IMPORT_DEPTH`] fails the whole resolution.
pub fn rewrite_load_directives(
    text: &str,
    parent_repository: Option<&str>,
    source: &dyn ImportSource,
    engine_name: &str,
    temporary_folder: &NormalizedPath,
    depth: u32,
) -> Result<String> {
    if depth > MAX_IMPORT_DEPTH {
        return Err(Error::ImportDepthExceeded {
            limit: MAX_IMPORT_DEPTH,
        });
    }

    let mut output = String::with_capacity(text.len());
    let mut cursor = 0;

    for caps in LOAD_DIRECTIVE_RE.captures_iter(text) {
        let whole = caps.get(0).expect("capture 0 always present");
        let reference = PartialReference::parse_uri(&caps[1])?;
        let file = materialize_import(
            &reference,
            parent_repository,
            source,
            engine_name,
            temporary_folder,
            depth,
        )?;

        output.push_str(&text[cursor..whole.start()]);
        output.push_str(&format!("#load \"{file}\""));
        cursor = whole.end();
    }
    output.push_str(&text[cursor..]);
    Ok(output)
}

/// Resolve one import and write it to disk, its own imports included.
///
/// Returns the materialized file path,
/// `<temp>/<engine>/<ref-slug>.<extension>`.
pub fn materialize_import(
    reference: &PartialReference,
    parent_repository: Option<&str>,
    source: &dyn ImportSource,
    engine_name: &str,
    temporary_folder: &NormalizedPath,
    depth: u32,
) -> Result<NormalizedPath> {
    if depth > MAX_IMPORT_DEPTH {
        return Err(Error::ImportDepthExceeded {
            limit: MAX_IMPORT_DEPTH,
        });
    }

    let import = source.resolve_import(reference, parent_repository)?;
    tracing::debug!(reference = %import.reference, depth, "materializing import");

    let rewritten = rewrite_load_directives(
        &import.text,
        Some(&import.reference.repository),
        source,
        engine_name,
        temporary_folder,
        depth + 1,
    )?;

    let file = temporary_folder.join(engine_name).join(format!(
        "{}.{}",
        reference_slug(
            &import.reference.name,
            &import.reference.version,
            Some(&import.reference.repository),
        ),
        import.extension
    ));
    uppm_fs::write_text(&file, &rewritten)?;
    Ok(file)
}

/// Materialize the metadata-declared imports of a script.
pub fn materialize_declared(
    imports: &IndexSet<PartialReference>,
    parent_repository: Option<&str>,
    source: &dyn ImportSource,
    engine_name: &str,
    temporary_folder: &NormalizedPath,
) -> Result<Vec<NormalizedPath>> {
    imports
        .iter()
        .map(|reference| {
            materialize_import(
                reference,
                parent_repository,
                source,
                engine_name,
                temporary_folder,
                1,
            )
        })
        .collect()
}

/// A filename-safe identifier for a reference.
pub fn reference_slug(name: &str, version: &str, repository: Option<&str>) -> String {
    let raw = match repository {
        Some(repository) => format!("{name}-{version}-{repository}"),
        None => format!("{name}-{version}"),
    };
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use uppm_core::{CompleteReference, ResolvedImport};

    const REPO: &str = "https://example.com/packs.repo.git";

    /// Import source backed by a map, recording parent repositories.
    struct MapSource {
        scripts: HashMap<String, String>,
        parents: Mutex<Vec<Option<String>>>,
    }

    impl MapSource {
        fn new(scripts: &[(&str, &str)]) -> Self {
            Self {
                scripts: scripts
                    .iter()
                    .map(|(n, t)| (n.to_string(), t.to_string()))
                    .collect(),
                parents: Mutex::new(Vec::new()),
            }
        }
    }

    impl ImportSource for MapSource {
        fn resolve_import(
            &self,
            reference: &PartialReference,
            parent_repository: Option<&str>,
        ) -> uppm_core::Result<ResolvedImport> {
            self.parents
                .lock()
                .unwrap()
                .push(parent_repository.map(String::from));
            let text = self.scripts.get(&reference.name.to_lowercase()).ok_or(
                Error::PackageNotFound {
                    reference: reference.to_string(),
                },
            )?;
            Ok(ResolvedImport {
                reference: CompleteReference::new(
                    &reference.name,
                    reference.version.as_deref().unwrap_or("1.0"),
                    REPO,
                ),
                extension: "csup".to_string(),
                text: text.clone(),
            })
        }
    }

    fn temp() -> (TempDir, NormalizedPath) {
        let dir = TempDir::new().unwrap();
        let path = NormalizedPath::new(dir.path());
        (dir, path)
    }

    #[test]
    fn test_directive_rewritten_to_materialized_file() {
        let source = MapSource::new(&[("util", "// util body")]);
        let (_dir, tmp) = temp();
        let script = "#load \"uppm-ref:app/util:1.0\"\nrest of script\n";

        let rewritten =
            rewrite_load_directives(script, Some(REPO), &source, "csup", &tmp, 0).unwrap();

        assert!(rewritten.contains("rest of script"));
        assert!(!rewritten.contains("uppm-ref:"));

        let loaded_path = rewritten
            .lines()
            .next()
            .unwrap()
            .trim_start_matches("#load \"")
            .trim_end_matches('"')
            .to_string();
        let materialized = uppm_fs::read_text(&NormalizedPath::new(&loaded_path)).unwrap();
        assert_eq!(materialized, "// util body");
    }

    #[test]
    fn test_nested_imports_resolve_recursively() {
        let source = MapSource::new(&[
            ("outer", "#load \"uppm-ref:app/inner:1.0\"\nouter body"),
            ("inner", "inner body"),
        ]);
        let (_dir, tmp) = temp();
        let script = "#load \"uppm-ref:app/outer:1.0\"\n";

        let rewritten =
            rewrite_load_directives(script, Some(REPO), &source, "csup", &tmp, 0).unwrap();
        assert!(!rewritten.contains("uppm-ref:"));

        let outer_file = tmp
            .join("csup")
            .join(format!("{}.csup", reference_slug("outer", "1.0", Some(REPO))));
        let outer_text = uppm_fs::read_text(&outer_file).unwrap();
        assert!(outer_text.contains("outer body"));
        assert!(!outer_text.contains("uppm-ref:"));
    }

    #[test]
    fn test_parent_repository_is_threaded_through() {
        let source = MapSource::new(&[
            ("outer", "#load \"uppm-ref:app/inner:1.0\"\n"),
            ("inner", "inner body"),
        ]);
        let (_dir, tmp) = temp();

        rewrite_load_directives(
            "#load \"uppm-ref:app/outer:1.0\"\n",
            Some("parent-repo"),
            &source,
            "csup",
            &tmp,
            0,
        )
        .unwrap();

        let parents = source.parents.lock().unwrap().clone();
        // The outer import binds to the enclosing script's repository,
        // the inner import binds to the outer script's repository.
        assert_eq!(
            parents,
            vec![Some("parent-repo".to_string()), Some(REPO.to_string())]
        );
    }

    #[test]
    fn test_import_cycle_exceeds_depth_limit() {
        let source = MapSource::new(&[
            ("a", "#load \"uppm-ref:app/b:1.0\"\n"),
            ("b", "#load \"uppm-ref:app/a:1.0\"\n"),
        ]);
        let (_dir, tmp) = temp();

        let result = rewrite_load_directives(
            "#load \"uppm-ref:app/a:1.0\"\n",
            Some(REPO),
            &source,
            "csup",
            &tmp,
            0,
        );
        assert!(matches!(result, Err(Error::ImportDepthExceeded { .. })));
    }

    #[test]
    fn test_unresolvable_import_fails() {
        let source = MapSource::new(&[]);
        let (_dir, tmp) = temp();

        let result = rewrite_load_directives(
            "#load \"uppm-ref:app/ghost:1.0\"\n",
            Some(REPO),
            &source,
            "csup",
            &tmp,
            0,
        );
        assert!(matches!(result, Err(Error::PackageNotFound { .. })));
    }

    #[test]
    fn test_text_without_directives_is_untouched() {
        let source = MapSource::new(&[]);
        let (_dir, tmp) = temp();
        let script = "plain script\n// #load mention in a comment body\n";

        let rewritten =
            rewrite_load_directives(script, None, &source, "csup", &tmp, 0).unwrap();
        assert_eq!(rewritten, script);
    }

    #[test]
    fn test_slug_is_filename_safe() {
        let slug = reference_slug("My Pack", "2.3", Some("https://example.com/r.git"));
        assert!(slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_'));
        assert!(slug.starts_with("my_pack-2.3-"));
    }
}
