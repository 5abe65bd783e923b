//! # API Normalization and Naming
//!
//! Flattens multi-version API declarations into single-version records and
//! derives the deterministic child resource name of each.
//!
//! Everything here is pure: the same declarations always produce the same
//! records, names and versions, independent of call order.

use crate::constants::{DEFAULT_API_TYPE, DEFAULT_API_VERSION, MAX_OBJECT_NAME_LENGTH};
use crate::controller::segment::{ApiKind, Segment};
use crate::crd::{ComponentSpec, DependentApiDeclaration, ExposedApiDeclaration, SpecificationEntry};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;

static VERSION_UNDERSCORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_v(\d+)\.").expect("underscore version pattern is valid"));

static VERSION_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/v(\d+)/").expect("version path pattern is valid"));

static VERSION_HYPHEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-v(\d+)\.").expect("hyphen version pattern is valid"));

static RFC1123_SUBDOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("RFC 1123 pattern is valid")
});

/// A declaration that can never produce a valid child
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("{segment} {kind} API declaration #{index} has an empty name")]
    EmptyName {
        segment: &'static str,
        kind: &'static str,
        index: usize,
    },
    #[error("derived child name '{name}' is not a valid RFC 1123 subdomain")]
    InvalidChildName { name: String },
}

/// One fully resolved, single-version API record
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedApi {
    pub segment: Segment,
    pub kind: ApiKind,
    pub name: String,
    pub version: String,
    pub api_type: String,
    pub specification_url: Option<String>,
    pub implementation: Option<String>,
    pub path: Option<String>,
    pub port: Option<i32>,
    pub developer_ui: Option<String>,
    pub gateway_configuration: Option<Value>,
    pub resources: Option<Vec<Value>>,
    pub api_sdo: Option<String>,
    pub required: bool,
}

/// A desired child: its name plus the record(s) that produced it
///
/// Legacy (unversioned) segments may fold several records into one child; the
/// first record supplies the payload and every record contributes its URL.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredChild {
    pub name: String,
    pub api: ResolvedApi,
    pub specification: Vec<String>,
    /// `None` when the child name carries no version
    pub version: Option<String>,
}

/// Resolve a version from a specification URL
///
/// Patterns are tried in order `_vN.`, `/vN/`, `-vN.`; the first that
/// matches anywhere in the URL wins.
#[must_use]
pub fn version_from_url(url: &str) -> Option<String> {
    [&*VERSION_UNDERSCORE, &*VERSION_PATH, &*VERSION_HYPHEN]
        .into_iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| format!("v{}", m.as_str()))
}

fn resolve_version(entry: Option<&SpecificationEntry>, root_url: Option<&str>) -> String {
    entry
        .and_then(|e| e.version.clone())
        .filter(|v| !v.trim().is_empty())
        .or_else(|| entry.and_then(|e| e.url.as_deref()).and_then(version_from_url))
        .or_else(|| root_url.and_then(version_from_url))
        .unwrap_or_else(|| DEFAULT_API_VERSION.to_string())
}

fn check_name(name: &str, segment: Segment, kind: ApiKind, index: usize) -> Result<(), NormalizeError> {
    if name.trim().is_empty() {
        return Err(NormalizeError::EmptyName {
            segment: segment.spec_key(),
            kind: kind.as_str(),
            index,
        });
    }
    Ok(())
}

/// Flatten exposed-API declarations of one segment
///
/// # Errors
///
/// Returns [`NormalizeError::EmptyName`] for a declaration without a name.
pub fn normalize_exposed(
    segment: Segment,
    declarations: &[ExposedApiDeclaration],
) -> Result<Vec<ResolvedApi>, NormalizeError> {
    let mut records = Vec::new();
    for (index, decl) in declarations.iter().enumerate() {
        check_name(&decl.name, segment, ApiKind::Exposed, index)?;
        let entries: Vec<Option<&SpecificationEntry>> = if decl.specification.is_empty() {
            vec![None]
        } else {
            decl.specification.iter().map(Some).collect()
        };

        for entry in entries {
            records.push(ResolvedApi {
                segment,
                kind: ApiKind::Exposed,
                name: decl.name.clone(),
                version: resolve_version(entry, decl.url.as_deref()),
                api_type: entry
                    .and_then(|e| e.api_type.clone())
                    .or_else(|| decl.api_type.clone())
                    .unwrap_or_else(|| DEFAULT_API_TYPE.to_string()),
                specification_url: match entry {
                    Some(e) => e.url.clone(),
                    None => decl.url.clone(),
                },
                implementation: entry
                    .and_then(|e| e.implementation.clone())
                    .or_else(|| decl.implementation.clone()),
                path: entry.and_then(|e| e.path.clone()).or_else(|| decl.path.clone()),
                port: entry.and_then(|e| e.port).or(decl.port),
                developer_ui: entry
                    .and_then(|e| e.developer_ui.clone())
                    .or_else(|| decl.developer_ui.clone()),
                gateway_configuration: entry
                    .and_then(|e| e.gateway_configuration.clone())
                    .or_else(|| decl.gateway_configuration.clone()),
                resources: entry
                    .and_then(|e| e.resources.clone())
                    .or_else(|| decl.resources.clone()),
                api_sdo: entry
                    .and_then(|e| e.api_sdo.clone())
                    .or_else(|| decl.api_sdo.clone()),
                required: false,
            });
        }
    }
    Ok(records)
}

/// Flatten dependent-API declarations of one segment
///
/// Only `apiType`, `resources` and `apiSDO` inherit from the root level.
///
/// # Errors
///
/// Returns [`NormalizeError::EmptyName`] for a declaration without a name.
pub fn normalize_dependent(
    segment: Segment,
    declarations: &[DependentApiDeclaration],
) -> Result<Vec<ResolvedApi>, NormalizeError> {
    let mut records = Vec::new();
    for (index, decl) in declarations.iter().enumerate() {
        check_name(&decl.name, segment, ApiKind::Dependent, index)?;
        let entries: Vec<Option<&SpecificationEntry>> = if decl.specification.is_empty() {
            vec![None]
        } else {
            decl.specification.iter().map(Some).collect()
        };

        for entry in entries {
            records.push(ResolvedApi {
                segment,
                kind: ApiKind::Dependent,
                name: decl.name.clone(),
                version: resolve_version(entry, decl.url.as_deref()),
                api_type: entry
                    .and_then(|e| e.api_type.clone())
                    .or_else(|| decl.api_type.clone())
                    .unwrap_or_else(|| DEFAULT_API_TYPE.to_string()),
                specification_url: match entry {
                    Some(e) => e.url.clone(),
                    None => decl.url.clone(),
                },
                implementation: None,
                path: None,
                port: None,
                developer_ui: None,
                gateway_configuration: None,
                resources: entry
                    .and_then(|e| e.resources.clone())
                    .or_else(|| decl.resources.clone()),
                api_sdo: entry
                    .and_then(|e| e.api_sdo.clone())
                    .or_else(|| decl.api_sdo.clone()),
                required: decl.required,
            });
        }
    }
    Ok(records)
}

/// Deterministic child name for a resolved record
///
/// Core: `<component>-<api>-<version>` with version dots replaced by `-`.
/// Management and security: `<component>-<api>`.
///
/// # Errors
///
/// Returns [`NormalizeError::InvalidChildName`] if the result is not a valid
/// RFC 1123 subdomain.
pub fn child_name(component: &str, api: &ResolvedApi) -> Result<String, NormalizeError> {
    let raw = if api.segment.uses_versioned_names() {
        format!("{}-{}-{}", component, api.name, api.version.replace('.', "-"))
    } else {
        format!("{}-{}", component, api.name)
    };
    let name = raw.to_lowercase();
    if name.len() > MAX_OBJECT_NAME_LENGTH || !RFC1123_SUBDOMAIN.is_match(&name) {
        return Err(NormalizeError::InvalidChildName { name });
    }
    Ok(name)
}

/// Desired children of one segment and API kind, in declaration order
///
/// # Errors
///
/// Returns a [`NormalizeError`] if any declaration is malformed.
pub fn desired_children(
    component: &str,
    segment: Segment,
    kind: ApiKind,
    spec: &ComponentSpec,
) -> Result<Vec<DesiredChild>, NormalizeError> {
    let records = match kind {
        ApiKind::Exposed => normalize_exposed(segment, segment.exposed_declarations(spec))?,
        ApiKind::Dependent => normalize_dependent(segment, segment.dependent_declarations(spec))?,
    };

    let mut desired: Vec<DesiredChild> = Vec::with_capacity(records.len());
    for api in records {
        let name = child_name(component, &api)?;
        if let Some(existing) = desired.iter_mut().find(|d| d.name == name) {
            if let Some(url) = &api.specification_url {
                if !existing.specification.contains(url) {
                    existing.specification.push(url.clone());
                }
            }
            continue;
        }
        let version = segment.uses_versioned_names().then(|| api.version.clone());
        desired.push(DesiredChild {
            name,
            specification: api.specification_url.iter().cloned().collect(),
            version,
            api,
        });
    }
    Ok(desired)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exposed(name: &str, urls: &[&str]) -> ExposedApiDeclaration {
        ExposedApiDeclaration {
            name: name.to_string(),
            implementation: Some("svc".to_string()),
            port: Some(8080),
            specification: urls
                .iter()
                .map(|u| SpecificationEntry {
                    url: Some((*u).to_string()),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_spec_entry_overrides_root_field() {
        let mut decl = exposed("catalog", &["https://x/catalog_v4.0.0.json"]);
        decl.specification[0].port = Some(9090);
        let records = normalize_exposed(Segment::Core, &[decl]).unwrap();
        assert_eq!(records[0].port, Some(9090));
        assert_eq!(records[0].implementation.as_deref(), Some("svc"));
    }

    #[test]
    fn test_dependent_does_not_inherit_exposed_only_fields() {
        let decl = DependentApiDeclaration {
            name: "party".to_string(),
            api_sdo: Some("TMForum".to_string()),
            specification: vec![SpecificationEntry {
                url: Some("https://x/party/v5/spec.json".to_string()),
                implementation: Some("ignored".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let records = normalize_dependent(Segment::Core, &[decl]).unwrap();
        assert_eq!(records[0].version, "v5");
        assert_eq!(records[0].api_sdo.as_deref(), Some("TMForum"));
        assert_eq!(records[0].implementation, None);
    }

    #[test]
    fn test_legacy_segment_folds_versions_into_one_child() {
        let mut spec = ComponentSpec::default();
        spec.management_function.exposed_apis = vec![exposed(
            "metrics",
            &["https://x/metrics_v1.json", "https://x/metrics_v2.json"],
        )];

        let desired = desired_children("comp", Segment::Management, ApiKind::Exposed, &spec).unwrap();
        assert_eq!(desired.len(), 1);
        assert_eq!(desired[0].name, "comp-metrics");
        assert_eq!(desired[0].version, None);
        assert_eq!(desired[0].specification.len(), 2);
    }

    #[test]
    fn test_core_segment_keeps_one_child_per_version() {
        let mut spec = ComponentSpec::default();
        spec.core_function.exposed_apis = vec![exposed(
            "catalog",
            &["https://x/catalog_v4.0.0.json", "https://x/catalog_v5.0.0.json"],
        )];

        let desired = desired_children("comp", Segment::Core, ApiKind::Exposed, &spec).unwrap();
        let names: Vec<&str> = desired.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["comp-catalog-v4", "comp-catalog-v5"]);
        assert_eq!(desired[0].version.as_deref(), Some("v4"));
    }
}
