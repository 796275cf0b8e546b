//! Cross-module behavior of the public core API

use uppm_core::{
    infer, Catalog, CompleteReference, Inference, PartialReference, Version, VersionRange,
};
use uppm_fs::NormalizedPath;

const REPO: &str = "https://example.com/packs.repo.git";

fn catalog_of(entries: &[(&str, &str)]) -> Catalog {
    let mut catalog = Catalog::new();
    for (name, version) in entries {
        catalog.insert(
            CompleteReference::new(*name, *version, REPO),
            NormalizedPath::new(format!("/checkout/someone/{name}/{version}.csup")),
        );
    }
    catalog
}

#[test]
fn version_parse_print_round_trip_under_both_policies() {
    for input in ["1", "4.2", "0.9.17", "2.3.0.7"] {
        for policy in [Inference::Newest, Inference::Zero] {
            let version = Version::parse(input).unwrap().with_inference(policy);
            let reparsed = Version::parse(&version.to_string())
                .unwrap()
                .with_inference(policy);
            assert_eq!(version, reparsed);
        }
    }
}

#[test]
fn reference_parse_print_round_trip() {
    for input in [
        "pack:1.2@https://example.com/packs.repo.git",
        "pack:nightly@C:/local/repo",
        "My Pack:latest@./relative/repo",
    ] {
        let reference = PartialReference::parse(input).unwrap();
        assert_eq!(
            PartialReference::parse(&reference.to_string()).unwrap(),
            reference
        );
    }
}

#[test]
fn latest_semantical_resolution_end_to_end() {
    let catalog = catalog_of(&[("p", "1.0"), ("p", "1.2"), ("p", "2.0")]);
    let complete =
        infer::complete_reference(&catalog, REPO, &PartialReference::new("p")).unwrap();
    assert_eq!(complete.version, "2.0");
    assert_eq!(complete.repository, REPO);
}

#[test]
fn scope_restricted_resolution_end_to_end() {
    let catalog = catalog_of(&[("p", "2.3.1"), ("p", "2.3.7"), ("p", "2.4.0")]);
    let request = PartialReference::parse("p:2.3").unwrap();
    let complete = infer::complete_reference(&catalog, REPO, &request).unwrap();
    assert_eq!(complete.version, "2.3.7");
}

#[test]
fn partial_request_binds_to_extension_not_bare_equal() {
    let catalog = catalog_of(&[("p", "2.3.5"), ("p", "2.3.12"), ("p", "2.4.1")]);
    let request = PartialReference::parse("p:2.3").unwrap();
    let complete = infer::complete_reference(&catalog, REPO, &request).unwrap();
    assert_eq!(complete.version, "2.3.12");

    let exact = PartialReference::parse("p:2.3.0").unwrap();
    let only_bare = catalog_of(&[("p", "2.3")]);
    assert!(infer::complete_reference(&only_bare, REPO, &exact).is_none());
}

#[test]
fn special_label_resolution_is_case_insensitive() {
    let catalog = catalog_of(&[("p", "nightly"), ("p", "1.0")]);
    for request in ["p:nightly", "p:Nightly"] {
        let reference = PartialReference::parse(request).unwrap();
        let complete = infer::complete_reference(&catalog, REPO, &reference).unwrap();
        assert_eq!(complete.version, "nightly");
    }
}

#[test]
fn inference_output_is_always_a_catalog_entry() {
    let catalog = catalog_of(&[("p", "1.0"), ("p", "latest"), ("p", "rc2"), ("q", "3.1")]);
    for request in ["p", "p:latest", "p:1.0", "p:rc2", "q", "q:3.1"] {
        let reference = PartialReference::parse(request).unwrap();
        let complete = infer::complete_reference(&catalog, REPO, &reference)
            .unwrap_or_else(|| panic!("{request} should resolve"));
        assert!(catalog.contains_key(&complete), "{request}");
    }
}

#[test]
fn compatible_app_version_range_semantics() {
    let range = VersionRange::parse("[2.0, 2.5]").unwrap();
    assert!(range.contains(&Version::parse("2.3.7").unwrap()));
    assert!(!range.contains(&Version::parse("2.6").unwrap()));
    assert!(!range.contains(&Version::parse("1.9").unwrap()));
}
