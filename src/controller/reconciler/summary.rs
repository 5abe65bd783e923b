//! # Deployment State Machine
//!
//! Recomputes `status.summary` from the current status snapshot and the
//! desired spec. Pure: no store calls, and it never reads its own previous
//! output, so it is safe to re-run on every status change.

use crate::constants::PLACEHOLDER_IDENTITY_PROVIDERS;
use crate::controller::naming::desired_children;
use crate::controller::segment::{ApiKind, Segment};
use crate::crd::{ApiStatusEntry, ComponentSpec, ComponentStatus, ComponentSummary, DeploymentStatus};
use std::collections::HashSet;

/// Every desired child of `kind` has a ready status entry
///
/// Only entries naming a currently desired child count, so a stale ready entry
/// cannot stand in for a missing one. A malformed declaration never satisfies
/// the gate.
#[must_use]
pub fn all_ready(component: &str, spec: &ComponentSpec, status: &ComponentStatus, kind: ApiKind) -> bool {
    Segment::ALL.into_iter().all(|segment| {
        let Ok(desired) = desired_children(component, segment, kind, spec) else {
            return false;
        };
        let wanted: HashSet<&str> = desired.iter().map(|d| d.name.as_str()).collect();
        let ready: HashSet<&str> = segment
            .status_entries(kind, status)
            .iter()
            .filter(|e| e.ready && wanted.contains(e.name.as_str()))
            .map(|e| e.name.as_str())
            .collect();
        ready.len() == wanted.len()
    })
}

/// The identity provider is resolved to a real value
#[must_use]
pub fn identity_resolved(status: &ComponentStatus) -> bool {
    status
        .identity_config
        .as_ref()
        .and_then(|ic| ic.identity_provider.as_deref())
        .map(str::trim)
        .is_some_and(|provider| {
            !PLACEHOLDER_IDENTITY_PROVIDERS
                .iter()
                .any(|placeholder| provider.eq_ignore_ascii_case(placeholder))
        })
}

/// The secrets backend is ready, or none was requested
#[must_use]
pub fn secrets_ready(spec: &ComponentSpec, status: &ComponentStatus) -> bool {
    spec.security_function.secrets_management.is_none()
        || status
            .security_secrets_management
            .as_ref()
            .is_some_and(|s| s.ready)
}

fn join_urls<'a>(entries: impl IntoIterator<Item = &'a ApiStatusEntry>) -> String {
    entries
        .into_iter()
        .filter_map(|e| e.url.as_deref())
        .filter(|u| !u.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Compute the summary block for a Component
#[must_use]
pub fn compute_summary(component: &str, spec: &ComponentSpec, status: &ComponentStatus) -> ComponentSummary {
    let deployment_status = if !all_ready(component, spec, status, ApiKind::Exposed) {
        DeploymentStatus::InProgressCompCon
    } else if !identity_resolved(status) {
        DeploymentStatus::InProgressIdConfOp
    } else if !secrets_ready(spec, status) {
        DeploymentStatus::InProgressSecretMan
    } else if !all_ready(component, spec, status, ApiKind::Dependent) {
        DeploymentStatus::InProgressDepApi
    } else {
        DeploymentStatus::Complete
    };

    let developer_ui_summary = Segment::ALL
        .into_iter()
        .flat_map(|s| s.status_entries(ApiKind::Exposed, status))
        .filter_map(|e| e.developer_ui.as_deref())
        .filter(|u| !u.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    ComponentSummary {
        deployment_status,
        core_api_summary: join_urls(&status.core_apis),
        management_api_summary: join_urls(&status.management_apis),
        security_api_summary: join_urls(&status.security_apis),
        developer_ui_summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{ExposedApiDeclaration, IdentityConfigSummary};

    fn spec_with_catalog() -> ComponentSpec {
        let mut spec = ComponentSpec::default();
        spec.core_function.exposed_apis = vec![ExposedApiDeclaration {
            name: "catalog".into(),
            ..Default::default()
        }];
        spec
    }

    #[test]
    fn test_stale_ready_entry_does_not_count() {
        let spec = spec_with_catalog();
        let status = ComponentStatus {
            core_apis: vec![ApiStatusEntry {
                name: "comp-gone-v4".into(),
                uid: "u".into(),
                ready: true,
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(!all_ready("comp", &spec, &status, ApiKind::Exposed));
    }

    #[test]
    fn test_placeholder_provider_is_not_resolved() {
        for provider in ["", "Unknown", "none", "PENDING"] {
            let status = ComponentStatus {
                identity_config: Some(IdentityConfigSummary {
                    identity_provider: Some(provider.into()),
                    listener_registered: None,
                }),
                ..Default::default()
            };
            assert!(!identity_resolved(&status), "{provider} should be a placeholder");
        }
    }

    #[test]
    fn test_summaries_join_urls() {
        let status = ComponentStatus {
            core_apis: vec![
                ApiStatusEntry {
                    name: "a".into(),
                    url: Some("https://gw/a".into()),
                    developer_ui: Some("https://gw/a/docs".into()),
                    ..Default::default()
                },
                ApiStatusEntry {
                    name: "b".into(),
                    url: Some("https://gw/b".into()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let summary = compute_summary("comp", &ComponentSpec::default(), &status);
        assert_eq!(summary.core_api_summary, "https://gw/a https://gw/b");
        assert_eq!(summary.developer_ui_summary, "https://gw/a/docs");
        assert_eq!(summary.management_api_summary, "");
    }
}
