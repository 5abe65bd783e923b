//! # Child to Parent Status Propagation
//!
//! Pushes readiness and endpoint fields reported on a child into the owning
//! Component's status. Entries are matched by child `uid`, never by name.
//!
//! The "skip when already equal" check is a hard invariant: every parent write
//! re-triggers the status aggregator, so writing unchanged values would loop.

use crate::constants::COMPONENT_KIND;
use crate::controller::reconciler::singletons::desired_identity_config;
use crate::controller::reconciler::status::write_component_status;
use crate::controller::reconciler::types::ReconcilerError;
use crate::controller::segment::{ApiKind, Segment};
use crate::controller::store::{Store, StoredResource};
use crate::crd::{
    Component, ComponentStatus, DependentApi, ExposedApi, IdentityConfig, IdentityConfigSummary,
    SecretsManagement, SecretsManagementSummary,
};
use crate::observability::metrics;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    /// The parent status was written
    Patched,
    /// Nothing to write: values already equal, or no live parent
    Unchanged,
}

impl Propagation {
    fn as_str(self) -> &'static str {
        match self {
            Propagation::Patched => "patched",
            Propagation::Unchanged => "unchanged",
        }
    }
}

fn child_namespace<K: StoredResource>(child: &K) -> Result<String, ReconcilerError> {
    child
        .meta()
        .namespace
        .clone()
        .ok_or(ReconcilerError::MissingMetadata {
            kind: K::kind(&()).to_string(),
            field: "namespace",
        })
}

/// The live Component that owns `child`, if any
async fn owning_component<S: Store, K: StoredResource>(
    store: &S,
    child: &K,
) -> Result<Option<Component>, ReconcilerError> {
    let Some(owner) = child
        .meta()
        .owner_references
        .iter()
        .flatten()
        .find(|o| o.kind == COMPONENT_KIND)
    else {
        return Ok(None);
    };
    let namespace = child_namespace(child)?;
    let parent = store.get_opt::<Component>(&namespace, &owner.name).await?;
    // a same-named successor does not own this child
    Ok(parent.filter(|p| p.metadata.uid.as_deref() == Some(owner.uid.as_str())))
}

/// Segment whose `kind` list holds the entry for `uid`, trying `hint` first
fn locate(status: &ComponentStatus, kind: ApiKind, uid: &str, hint: Option<Segment>) -> Option<Segment> {
    hint.into_iter()
        .chain(Segment::ALL)
        .find(|segment| segment.status_entries(kind, status).iter().any(|e| e.uid == uid))
}

fn segment_hint<K: StoredResource>(child: &K) -> Option<Segment> {
    child
        .meta()
        .labels
        .as_ref()
        .and_then(|l| l.get(crate::constants::SEGMENT_LABEL))
        .and_then(|s| Segment::from_spec_key(s))
}

async fn commit<S: Store>(
    store: &S,
    parent: &Component,
    updated: ComponentStatus,
    source: &str,
) -> Result<Propagation, ReconcilerError> {
    let outcome = if write_component_status(store, parent, &updated).await? {
        Propagation::Patched
    } else {
        Propagation::Unchanged
    };
    metrics::increment_status_propagations(source, outcome.as_str());
    Ok(outcome)
}

fn unchanged(source: &str) -> Result<Propagation, ReconcilerError> {
    metrics::increment_status_propagations(source, Propagation::Unchanged.as_str());
    Ok(Propagation::Unchanged)
}

/// Copy `ready`/`url`/`developerUI` from an API child into its parent entry
async fn propagate_api<S: Store, K: StoredResource>(
    store: &S,
    child: &K,
    kind: ApiKind,
    ready: bool,
    url: Option<String>,
    developer_ui: Option<Option<String>>,
) -> Result<Propagation, ReconcilerError> {
    let source = K::kind(&()).to_string();
    let Some(parent) = owning_component(store, child).await? else {
        debug!("No live owning Component, nothing to propagate");
        return unchanged(&source);
    };
    let uid = child.meta().uid.clone().unwrap_or_default();
    let current = parent.status.clone().unwrap_or_default();

    let Some(segment) = locate(&current, kind, &uid, segment_hint(child)) else {
        return Err(ReconcilerError::StatusEntryPending {
            parent: parent.metadata.name.clone().unwrap_or_default(),
            kind: source,
            uid,
        });
    };

    let mut updated = current.clone();
    for entry in segment
        .status_entries_mut(kind, &mut updated)
        .iter_mut()
        .filter(|e| e.uid == uid)
    {
        entry.ready = ready;
        entry.url.clone_from(&url);
        if let Some(developer_ui) = &developer_ui {
            entry.developer_ui.clone_from(developer_ui);
        }
    }

    if updated == current {
        return unchanged(&source);
    }
    commit(store, &parent, updated, &source).await
}

/// Propagate an ExposedAPI's `apiStatus` and `implementation.ready`
///
/// # Errors
///
/// Returns [`ReconcilerError::StatusEntryPending`] when the parent has no
/// entry for this child yet, or a store error if the parent write fails.
pub async fn propagate_exposed<S: Store>(
    store: &S,
    child: &ExposedApi,
) -> Result<Propagation, ReconcilerError> {
    let status = child.status.clone().unwrap_or_default();
    let endpoint = status.api_status.clone().unwrap_or_default();
    propagate_api(
        store,
        child,
        ApiKind::Exposed,
        status.ready(),
        endpoint.url,
        Some(endpoint.developer_ui),
    )
    .await
}

/// Propagate a DependentAPI's `implementation.ready` and resolved `url`
///
/// # Errors
///
/// See [`propagate_exposed`].
pub async fn propagate_dependent<S: Store>(
    store: &S,
    child: &DependentApi,
) -> Result<Propagation, ReconcilerError> {
    let status = child.status.clone().unwrap_or_default();
    propagate_api(store, child, ApiKind::Dependent, status.ready(), status.url.clone(), None).await
}

/// Propagate SecretsManagement readiness into `securitySecretsManagement`
///
/// # Errors
///
/// Returns a store error if the parent write fails.
pub async fn propagate_secrets_management<S: Store>(
    store: &S,
    child: &SecretsManagement,
) -> Result<Propagation, ReconcilerError> {
    let source = "SecretsManagement";
    let Some(parent) = owning_component(store, child).await? else {
        return unchanged(source);
    };
    if parent.spec.security_function.secrets_management.is_none() {
        // being removed; the segment reconciler clears the block
        return unchanged(source);
    }
    let current = parent.status.clone().unwrap_or_default();
    let reported = SecretsManagementSummary {
        ready: child.status.as_ref().is_some_and(|s| s.ready()),
    };
    if current.security_secrets_management.as_ref() == Some(&reported) {
        return unchanged(source);
    }
    let mut updated = current;
    updated.security_secrets_management = Some(reported);
    commit(store, &parent, updated, source).await
}

/// Propagate the IdentityConfig status payload into `identityConfig`
///
/// # Errors
///
/// Returns a store error if the parent write fails.
pub async fn propagate_identity_config<S: Store>(
    store: &S,
    child: &IdentityConfig,
) -> Result<Propagation, ReconcilerError> {
    let source = "IdentityConfig";
    let Some(parent) = owning_component(store, child).await? else {
        return unchanged(source);
    };
    let parent_name = parent.metadata.name.clone().unwrap_or_default();
    if desired_identity_config(&parent_name, &parent.spec).is_none() {
        return unchanged(source);
    }
    let current = parent.status.clone().unwrap_or_default();
    let status = child.status.clone().unwrap_or_default();
    let reported = IdentityConfigSummary {
        identity_provider: status.identity_provider,
        listener_registered: status.listener_registered,
    };
    if current.identity_config.as_ref() == Some(&reported) {
        return unchanged(source);
    }
    let mut updated = current;
    updated.identity_config = Some(reported);
    commit(store, &parent, updated, source).await
}
