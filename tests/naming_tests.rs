//! # Naming Tests
//!
//! Child names and versions derived from API declarations.

use component_operator::controller::naming::{
    child_name, desired_children, normalize_exposed, version_from_url, NormalizeError,
};
use component_operator::controller::segment::{ApiKind, Segment};
use component_operator::crd::{
    ComponentSpec, DependentApiDeclaration, ExposedApiDeclaration, SpecificationEntry,
};

fn entry(url: &str) -> SpecificationEntry {
    SpecificationEntry {
        url: Some(url.to_string()),
        ..Default::default()
    }
}

fn exposed(name: &str, urls: &[&str]) -> ExposedApiDeclaration {
    ExposedApiDeclaration {
        name: name.to_string(),
        specification: urls.iter().map(|u| entry(u)).collect(),
        ..Default::default()
    }
}

#[test]
fn test_version_from_url_patterns() {
    let cases = [
        ("https://x/TMF620-ProductCatalog_v4.0.0.json", Some("v4")),
        ("https://x/catalog-v5.1.json", Some("v5")),
        ("https://x/party/v2/openapi.json", Some("v2")),
        ("https://x/catalog/v5/catalog-v4.json", Some("v5")),
        ("https://x/v3/party_v4.0.0.json", Some("v4")),
        ("https://x/openapi.json", None),
    ];
    for (url, expected) in cases {
        assert_eq!(version_from_url(url).as_deref(), expected, "url: {url}");
    }
}

#[test]
fn test_core_children_are_versioned_per_specification() {
    let mut spec = ComponentSpec::default();
    spec.core_function.exposed_apis = vec![exposed(
        "catalog",
        &["https://x/catalog_v4.0.0.json", "https://x/catalog_v5.0.0.json"],
    )];

    let desired = desired_children("productcatalog", Segment::Core, ApiKind::Exposed, &spec)
        .expect("valid declarations");
    let names: Vec<&str> = desired.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["productcatalog-catalog-v4", "productcatalog-catalog-v5"]);
    assert_eq!(desired[0].version.as_deref(), Some("v4"));
}

#[test]
fn test_explicit_version_wins_and_dots_become_dashes() {
    let mut spec = ComponentSpec::default();
    spec.core_function.exposed_apis = vec![ExposedApiDeclaration {
        name: "catalog".into(),
        specification: vec![SpecificationEntry {
            url: Some("https://x/catalog_v4.0.0.json".into()),
            version: Some("v4.1".into()),
            ..Default::default()
        }],
        ..Default::default()
    }];
    let desired = desired_children("pc", Segment::Core, ApiKind::Exposed, &spec).expect("valid");
    assert_eq!(desired[0].name, "pc-catalog-v4-1");
}

#[test]
fn test_unversioned_declaration_gets_default_version() {
    let mut spec = ComponentSpec::default();
    spec.core_function.dependent_apis = vec![DependentApiDeclaration {
        name: "party".into(),
        ..Default::default()
    }];
    let desired =
        desired_children("pc", Segment::Core, ApiKind::Dependent, &spec).expect("valid");
    assert_eq!(desired.len(), 1);
    assert_eq!(desired[0].name, "pc-party-v4");
}

#[test]
fn test_root_url_version_applies_when_entry_url_has_none() {
    let mut spec = ComponentSpec::default();
    spec.core_function.dependent_apis = vec![DependentApiDeclaration {
        name: "party".into(),
        url: Some("https://x/party_v5.0.0.json".into()),
        specification: vec![entry("https://x/party/openapi.json")],
        ..Default::default()
    }];
    let desired =
        desired_children("pc", Segment::Core, ApiKind::Dependent, &spec).expect("valid");
    assert_eq!(desired.len(), 1);
    assert_eq!(desired[0].name, "pc-party-v5");
}

#[test]
fn test_entry_url_version_beats_root_url() {
    let mut spec = ComponentSpec::default();
    spec.core_function.exposed_apis = vec![ExposedApiDeclaration {
        url: Some("https://x/catalog_v5.0.0.json".into()),
        ..exposed("catalog", &["https://x/catalog_v4.0.0.json"])
    }];
    let desired = desired_children("pc", Segment::Core, ApiKind::Exposed, &spec).expect("valid");
    assert_eq!(desired[0].name, "pc-catalog-v4");
}

#[test]
fn test_security_children_are_unversioned() {
    let mut spec = ComponentSpec::default();
    spec.security_function.exposed_apis = vec![exposed(
        "partyrole",
        &["https://x/partyrole_v4.0.0.json", "https://x/partyrole_v5.0.0.json"],
    )];
    let desired = desired_children("pc", Segment::Security, ApiKind::Exposed, &spec).expect("valid");
    assert_eq!(desired.len(), 1);
    assert_eq!(desired[0].name, "pc-partyrole");
    assert_eq!(desired[0].version, None);
    assert_eq!(desired[0].specification.len(), 2);
}

#[test]
fn test_names_are_deterministic() {
    let mut spec = ComponentSpec::default();
    spec.core_function.exposed_apis = vec![exposed("catalog", &["https://x/catalog_v4.0.0.json"])];
    let first = desired_children("pc", Segment::Core, ApiKind::Exposed, &spec).expect("valid");
    let second = desired_children("pc", Segment::Core, ApiKind::Exposed, &spec).expect("valid");
    assert_eq!(first, second);
}

#[test]
fn test_empty_name_is_rejected() {
    let mut spec = ComponentSpec::default();
    spec.management_function.exposed_apis = vec![exposed("  ", &[])];
    let err = desired_children("pc", Segment::Management, ApiKind::Exposed, &spec).unwrap_err();
    assert!(matches!(err, NormalizeError::EmptyName { index: 0, .. }));
}

#[test]
fn test_invalid_child_name_is_rejected() {
    let mut spec = ComponentSpec::default();
    spec.core_function.exposed_apis = vec![exposed("Bad_Name", &["https://x/a_v1.json"])];
    let desired = desired_children("pc", Segment::Core, ApiKind::Exposed, &spec);
    assert!(matches!(desired, Err(NormalizeError::InvalidChildName { .. })));

    let long = "a".repeat(300);
    let mut spec = ComponentSpec::default();
    spec.management_function.exposed_apis = vec![exposed(&long, &[])];
    let desired = desired_children("pc", Segment::Management, ApiKind::Exposed, &spec)
        .map(|d| d.len());
    assert!(matches!(desired, Err(NormalizeError::InvalidChildName { .. })));
}

#[test]
fn test_child_name_lowercases() {
    let records = normalize_exposed(Segment::Core, &[exposed("Catalog", &["https://x/c_v4.json"])])
        .expect("valid");
    assert_eq!(child_name("PC", &records[0]).expect("valid name"), "pc-catalog-v4");
}
