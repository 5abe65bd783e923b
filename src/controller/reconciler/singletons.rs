//! # Singleton Children
//!
//! SecretsManagement and IdentityConfig: at most one of each per Component,
//! named after the Component, created or deleted depending on whether the
//! security segment declares them.

use crate::constants::{PARTY_ROLE_API, PERMISSION_SPECIFICATION_SET_API};
use crate::controller::reconciler::patch::merge_diff;
use crate::controller::reconciler::segments::SegmentParent;
use crate::controller::store::{Store, StoreError, StoredResource};
use crate::crd::{
    ComponentSpec, ComponentStatus, IdentityConfig, IdentityConfigSpec, SecretsManagement,
    SecretsManagementSpec, SecretsManagementSummary,
};
use crate::observability::metrics;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Desired SecretsManagement spec, if the security segment declares one
#[must_use]
pub fn desired_secrets_management(component: &str, spec: &ComponentSpec) -> Option<SecretsManagementSpec> {
    spec.security_function
        .secrets_management
        .as_ref()
        .map(|decl| SecretsManagementSpec {
            component_name: component.to_string(),
            backend_type: decl.backend_type.clone(),
            sidecar: decl.sidecar.clone(),
            pod_selector: decl.pod_selector.clone(),
        })
}

/// Desired IdentityConfig spec, if the security segment names a canvas system role
#[must_use]
pub fn desired_identity_config(component: &str, spec: &ComponentSpec) -> Option<IdentityConfigSpec> {
    let security = &spec.security_function;
    let role = security
        .canvas_system_role
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())?;
    let exposes = |api: &str| {
        security
            .exposed_apis
            .iter()
            .any(|decl| decl.name.eq_ignore_ascii_case(api))
    };
    Some(IdentityConfigSpec {
        component_name: component.to_string(),
        canvas_system_role: role.to_string(),
        component_role: security.component_role.clone(),
        party_role: exposes(PARTY_ROLE_API),
        permission_specification_set: exposes(PERMISSION_SPECIFICATION_SET_API),
    })
}

/// Create the singleton if missing, or patch its spec if it drifted
async fn ensure<S, K, P>(
    store: &S,
    parent: &SegmentParent<'_>,
    desired: P,
    build: impl FnOnce(&str, P) -> K,
    live_spec: impl Fn(&K) -> &P,
) -> Result<(), StoreError>
where
    S: Store,
    K: StoredResource,
    P: PartialEq + Serialize,
{
    let kind = K::kind(&()).to_string();
    match store.get_opt::<K>(parent.namespace, parent.component).await? {
        Some(live) => {
            if !parent.owns(&live) {
                warn!(child = parent.component, "{} is owned by another object", kind);
                return Err(StoreError::AlreadyExists {
                    kind,
                    name: parent.component.to_string(),
                });
            }
            if live_spec(&live) == &desired {
                return Ok(());
            }
            let have = serde_json::to_value(live_spec(&live))?;
            let want = serde_json::to_value(&desired)?;
            if let Some(diff) = merge_diff(&have, &want) {
                store
                    .patch::<K>(parent.namespace, parent.component, &json!({ "spec": diff }))
                    .await?;
                metrics::increment_child_operations(&kind, "patch");
            }
        }
        None => {
            let mut child = build(parent.component, desired);
            let meta = child.meta_mut();
            meta.labels = Some(BTreeMap::from([(
                parent.component_name_label.to_string(),
                parent.component.to_string(),
            )]));
            meta.owner_references = Some(vec![parent.owner.clone()]);
            match store.create::<K>(parent.namespace, &child).await {
                Ok(_) => {
                    metrics::increment_child_operations(&kind, "create");
                    info!(child = parent.component, "Created {}", kind);
                }
                // raced with an earlier pass of ours; the next pass compares specs
                Err(StoreError::AlreadyExists { kind: k, name: n }) => {
                    match store.get_opt::<K>(parent.namespace, parent.component).await? {
                        Some(live) if parent.owns(&live) => {}
                        _ => return Err(StoreError::AlreadyExists { kind: k, name: n }),
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
    Ok(())
}

async fn remove<S: Store, K: StoredResource>(
    store: &S,
    parent: &SegmentParent<'_>,
) -> Result<(), StoreError> {
    let kind = K::kind(&()).to_string();
    match store.delete::<K>(parent.namespace, parent.component).await {
        Ok(()) => {
            metrics::increment_child_operations(&kind, "delete");
            info!(child = parent.component, "Deleted {}", kind);
            Ok(())
        }
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(e),
    }
}

/// Converge the SecretsManagement child and its status block
///
/// # Errors
///
/// Returns the first store error; `status` is only changed on success.
pub async fn reconcile_secrets_management<S: Store>(
    store: &S,
    parent: &SegmentParent<'_>,
    spec: &ComponentSpec,
    status: &mut ComponentStatus,
) -> Result<(), StoreError> {
    match desired_secrets_management(parent.component, spec) {
        Some(desired) => {
            ensure(store, parent, desired, SecretsManagement::new, |sm: &SecretsManagement| {
                &sm.spec
            })
            .await?;
            status
                .security_secrets_management
                .get_or_insert(SecretsManagementSummary { ready: false });
        }
        None => {
            remove::<S, SecretsManagement>(store, parent).await?;
            status.security_secrets_management = None;
        }
    }
    Ok(())
}

/// Converge the IdentityConfig child and its status block
///
/// # Errors
///
/// Returns the first store error; `status` is only changed on success.
pub async fn reconcile_identity_config<S: Store>(
    store: &S,
    parent: &SegmentParent<'_>,
    spec: &ComponentSpec,
    status: &mut ComponentStatus,
) -> Result<(), StoreError> {
    match desired_identity_config(parent.component, spec) {
        Some(desired) => {
            ensure(store, parent, desired, IdentityConfig::new, |ic: &IdentityConfig| &ic.spec)
                .await?;
        }
        None => {
            remove::<S, IdentityConfig>(store, parent).await?;
            status.identity_config = None;
        }
    }
    Ok(())
}
