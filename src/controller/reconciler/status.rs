//! # Component Status Writer
//!
//! Every write to a Component's status goes through here. The new status is
//! diffed against the live one; nothing is sent when they match, otherwise a
//! merge patch carrying the live `resourceVersion` is sent so a concurrent
//! writer turns into a retryable conflict instead of a lost update.

use crate::controller::reconciler::patch::merge_diff;
use crate::controller::reconciler::types::ReconcilerError;
use crate::controller::store::{Store, StoreError};
use crate::crd::{Component, ComponentStatus};
use serde_json::{json, Value};
use tracing::debug;

/// Write `desired` as the status of `component` if it differs from the live status
///
/// Returns `true` when a patch was sent.
///
/// # Errors
///
/// Returns a store error (conflicts included) if the patch fails.
pub async fn write_component_status<S: Store>(
    store: &S,
    component: &Component,
    desired: &ComponentStatus,
) -> Result<bool, ReconcilerError> {
    let live = serde_json::to_value(component.status.clone().unwrap_or_default())
        .map_err(StoreError::from)?;
    let want = serde_json::to_value(desired).map_err(StoreError::from)?;

    let Some(diff) = merge_diff(&live, &want) else {
        debug!("Component status unchanged, skipping write");
        return Ok(false);
    };

    let name = component
        .metadata
        .name
        .as_deref()
        .ok_or(ReconcilerError::MissingMetadata {
            kind: "Component".to_string(),
            field: "name",
        })?;
    let namespace = component
        .metadata
        .namespace
        .as_deref()
        .ok_or(ReconcilerError::MissingMetadata {
            kind: "Component".to_string(),
            field: "namespace",
        })?;

    let mut patch = json!({ "status": diff });
    if let Some(rv) = &component.metadata.resource_version {
        patch["metadata"] = json!({ "resourceVersion": rv });
    }

    debug!(
        resource.name = name,
        keys = ?diff_keys(&patch["status"]),
        "Patching Component status"
    );
    store
        .patch_status::<Component>(namespace, name, &patch)
        .await?;
    Ok(true)
}

fn diff_keys(diff: &Value) -> Vec<String> {
    diff.as_object()
        .map(|m| m.keys().cloned().collect())
        .unwrap_or_default()
}
