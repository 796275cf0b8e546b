//! Reference inference
//!
//! Completes a partially specified reference against a repository
//! catalog, honoring the scope-aware version semantics: a requested
//! `2.3` binds to the newest `2.3.*` the catalog has, never to a bare
//! `2.3.0`, and a requested `2.3.0` never binds to a bare `2.3`.

use crate::reference::{CompleteReference, PartialReference, VersionKind};
use crate::repository::Catalog;
use crate::version::Version;

/// Complete `partial` against `catalog`, which belongs to the repository
/// at `repository_url`. Returns `None` when nothing matches.
pub fn complete_reference(
    catalog: &Catalog,
    repository_url: &str,
    partial: &PartialReference,
) -> Option<CompleteReference> {
    if let Some(requested_repo) = &partial.repository {
        if !requested_repo.eq_ignore_ascii_case(repository_url) {
            return None;
        }
    }

    let candidates: Vec<&CompleteReference> = catalog
        .keys()
        .filter(|c| c.name.eq_ignore_ascii_case(&partial.name))
        .collect();
    if candidates.is_empty() {
        return None;
    }

    match partial.version_kind() {
        VersionKind::Special => {
            let requested = partial.version.as_deref().expect("special implies a version");
            candidates
                .iter()
                .find(|c| c.version.eq_ignore_ascii_case(requested))
                .map(|c| (*c).clone())
        }

        VersionKind::Unspecified | VersionKind::Latest => {
            if let Some(labeled) = candidates
                .iter()
                .find(|c| c.version.eq_ignore_ascii_case("latest"))
            {
                return Some((*labeled).clone());
            }
            newest_semantical(&candidates, None)
        }

        VersionKind::Semantical(requested) => newest_semantical(&candidates, Some(&requested)),
    }
}

/// The candidate with the highest semantical version, optionally
/// restricted to those agreeing with `prefix` in every explicitly
/// specified component.
///
/// Missing components are inferred as newest, so among `2.3` and `2.3.7`
/// the bare `2.3` wins. Ties keep the earlier catalog entry.
fn newest_semantical(
    candidates: &[&CompleteReference],
    prefix: Option<&Version>,
) -> Option<CompleteReference> {
    let mut best: Option<(Version, &CompleteReference)> = None;

    for candidate in candidates.iter().copied() {
        let Ok(version) = Version::parse(&candidate.version) else {
            continue;
        };

        if let Some(prefix) = prefix {
            let agrees = (0..=prefix.scope()).all(|i| {
                version.explicit_component(i) == prefix.explicit_component(i)
            });
            if !agrees {
                continue;
            }
        }

        match &best {
            Some((winner, _)) if version <= *winner => {}
            _ => best = Some((version, candidate)),
        }
    }

    best.map(|(_, candidate)| candidate.clone())
}
