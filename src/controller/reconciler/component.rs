//! # Component Handler
//!
//! Entry point for Component events. Runs the segment reconcilers when the
//! spec changed and the status aggregator when the status changed, then
//! writes the resulting status once.
//!
//! Every (segment, kind) pair is reconciled independently: a malformed
//! declaration or failing child call in one pair leaves the others' status
//! untouched.

use crate::constants::COMPONENT_KIND;
use crate::controller::dispatch::{Handler, RouteTarget};
use crate::controller::naming::{desired_children, NormalizeError};
use crate::controller::reconciler::segments::{reconcile_segment, SegmentParent};
use crate::controller::reconciler::singletons::{
    reconcile_identity_config, reconcile_secrets_management,
};
use crate::controller::reconciler::status::write_component_status;
use crate::controller::reconciler::summary::compute_summary;
use crate::controller::reconciler::types::{cache_key, resource_key, Reconciler, ReconcilerError};
use crate::controller::segment::{ApiKind, Segment};
use crate::controller::store::{Store, StoreError};
use crate::crd::{Component, DependentApi, ExposedApi};
use crate::observability::metrics;
use kube::runtime::controller::Action;
use kube::Resource;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Reconcile one Component event
///
/// # Errors
///
/// - [`ReconcilerError::PartialFailure`] (retryable) when any child call failed;
///   the status of every other segment is still written
/// - [`ReconcilerError::InvalidDeclaration`] (permanent) when a declaration
///   cannot be normalized
/// - store errors from the status write
pub async fn reconcile_component<S: Store>(
    component: Arc<Component>,
    ctx: Arc<Reconciler<S>>,
) -> Result<Action, ReconcilerError> {
    let start = Instant::now();
    let name = component
        .metadata
        .name
        .clone()
        .ok_or(ReconcilerError::MissingMetadata {
            kind: COMPONENT_KIND.to_string(),
            field: "name",
        })?;
    let namespace = component
        .metadata
        .namespace
        .clone()
        .ok_or(ReconcilerError::MissingMetadata {
            kind: COMPONENT_KIND.to_string(),
            field: "namespace",
        })?;
    let key = cache_key(component.as_ref());

    if component.metadata.deletion_timestamp.is_some() {
        // owned children are removed by garbage collection
        ctx.field_cache.forget(&key);
        return Ok(Action::await_change());
    }

    let snapshot = serde_json::to_value(component.as_ref()).map_err(StoreError::from)?;
    let plan = ctx.field_cache.plan(RouteTarget::Component, &key, &snapshot);
    if plan.handlers().is_empty() {
        debug!("No routed field changed, skipping");
        return Ok(Action::await_change());
    }

    let label = ctx.component_name_label().await;
    let owner = component
        .controller_owner_ref(&())
        .ok_or(ReconcilerError::MissingMetadata {
            kind: COMPONENT_KIND.to_string(),
            field: "uid",
        })?;
    let parent = SegmentParent {
        namespace: &namespace,
        component: &name,
        owner,
        component_name_label: &label,
    };
    let store = ctx.store.as_ref();
    let spec = &component.spec;
    let mut status = component.status.clone().unwrap_or_default();
    let mut failures: Vec<String> = Vec::new();
    let mut invalid: Option<NormalizeError> = None;

    if plan.runs(Handler::SegmentReconciler) {
        metrics::increment_reconciliations(Handler::SegmentReconciler.as_str());
        for segment in Segment::ALL {
            for kind in [ApiKind::Exposed, ApiKind::Dependent] {
                let desired = match desired_children(&name, segment, kind, spec) {
                    Ok(desired) => desired,
                    Err(e) => {
                        warn!(
                            segment = %segment,
                            kind = kind.as_str(),
                            error = %e,
                            "Invalid declaration, leaving segment status untouched"
                        );
                        invalid.get_or_insert(e);
                        continue;
                    }
                };
                let previous = segment.status_entries(kind, &status).to_vec();
                let outcome = match kind {
                    ApiKind::Exposed => {
                        reconcile_segment::<S, ExposedApi>(store, &parent, segment, &desired, &previous)
                            .await
                    }
                    ApiKind::Dependent => {
                        reconcile_segment::<S, DependentApi>(
                            store, &parent, segment, &desired, &previous,
                        )
                        .await
                    }
                };
                failures.extend(
                    outcome
                        .failures
                        .iter()
                        .map(|f| format!("{} {}: {}", f.verb, f.name, f.error)),
                );
                *segment.status_entries_mut(kind, &mut status) = outcome.entries;
            }
        }

        if let Err(e) = reconcile_secrets_management(store, &parent, spec, &mut status).await {
            warn!(error = %e, "Failed to reconcile SecretsManagement");
            failures.push(format!("SecretsManagement {name}: {e}"));
        }
        if let Err(e) = reconcile_identity_config(store, &parent, spec, &mut status).await {
            warn!(error = %e, "Failed to reconcile IdentityConfig");
            failures.push(format!("IdentityConfig {name}: {e}"));
        }

        if failures.is_empty() && invalid.is_none() {
            status.observed_generation = component.metadata.generation;
        }
    }

    if plan.runs(Handler::StatusAggregator) {
        metrics::increment_reconciliations(Handler::StatusAggregator.as_str());
    }
    let summary = compute_summary(&name, spec, &status);
    let previous_state = component
        .status
        .as_ref()
        .and_then(|s| s.summary.as_ref())
        .map(|s| s.deployment_status);
    if previous_state != Some(summary.deployment_status) {
        info!(
            from = previous_state.map(|s| s.as_str()).unwrap_or("none"),
            to = summary.deployment_status.as_str(),
            "Deployment status changed"
        );
    }
    status.summary = Some(summary);

    write_component_status(store, &component, &status).await?;

    // a permanent declaration error is settled until the spec changes
    if failures.is_empty() {
        plan.commit(&ctx.field_cache, Handler::SegmentReconciler);
    }
    plan.commit(&ctx.field_cache, Handler::StatusAggregator);

    let elapsed = start.elapsed().as_secs_f64();
    for handler in plan.handlers() {
        metrics::observe_reconciliation_duration(handler.as_str(), elapsed);
    }

    if let Some(first) = failures.first() {
        return Err(ReconcilerError::PartialFailure {
            failed: failures.len(),
            first: first.clone(),
        });
    }
    if let Some(e) = invalid {
        return Err(ReconcilerError::InvalidDeclaration(e));
    }

    ctx.reset_backoff(&resource_key(COMPONENT_KIND, &namespace, &name));
    Ok(Action::await_change())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerConfig;
    use crate::controller::reconciler::propagate::{
        propagate_exposed, propagate_identity_config, Propagation,
    };
    use crate::controller::store::memory::MemoryStore;
    use crate::crd::{
        ComponentSpec, DeploymentStatus, ExposedApiDeclaration, IdentityConfig,
        SecretsManagement, SecretsManagementDeclaration, SpecificationEntry,
    };
    use serde_json::json;
    use tokio::sync::RwLock;

    fn context(store: &MemoryStore) -> Arc<Reconciler<MemoryStore>> {
        Arc::new(Reconciler::new(
            store.clone(),
            Arc::new(RwLock::new(ControllerConfig::default())),
        ))
    }

    fn catalog_spec() -> ComponentSpec {
        let mut spec = ComponentSpec::default();
        spec.core_function.exposed_apis = vec![ExposedApiDeclaration {
            name: "catalog".into(),
            implementation: Some("catalog-svc".into()),
            port: Some(8080),
            specification: vec![SpecificationEntry {
                url: Some("https://specs.example/catalog_v4.0.0.json".into()),
                ..Default::default()
            }],
            ..Default::default()
        }];
        spec
    }

    fn live(store: &MemoryStore) -> Arc<Component> {
        Arc::new(store.get::<Component>("ns", "comp").unwrap())
    }

    fn deployment_status(store: &MemoryStore) -> DeploymentStatus {
        live(store).status.clone().unwrap().summary.unwrap().deployment_status
    }

    #[tokio::test]
    async fn test_catalog_component_reaches_complete() {
        let store = MemoryStore::new();
        let ctx = context(&store);
        let mut spec = catalog_spec();
        spec.security_function.canvas_system_role = Some("Admin".into());
        store.insert("ns", &Component::new("comp", spec));

        reconcile_component(live(&store), ctx.clone()).await.unwrap();
        let child: ExposedApi = store.get("ns", "comp-catalog-v4").unwrap();
        assert_eq!(child.spec.version.as_deref(), Some("v4"));
        assert_eq!(deployment_status(&store), DeploymentStatus::InProgressCompCon);

        let child: ExposedApi = store.set_status(
            "ns",
            "comp-catalog-v4",
            json!({"implementation": {"ready": true}, "apiStatus": {"url": "https://gw/catalog"}}),
        );
        assert_eq!(propagate_exposed(&store, &child).await.unwrap(), Propagation::Patched);
        reconcile_component(live(&store), ctx.clone()).await.unwrap();
        assert_eq!(deployment_status(&store), DeploymentStatus::InProgressIdConfOp);

        let identity: IdentityConfig = store.set_status(
            "ns",
            "comp",
            json!({"identityProvider": "Keycloak", "listenerRegistered": true}),
        );
        propagate_identity_config(&store, &identity).await.unwrap();
        reconcile_component(live(&store), ctx.clone()).await.unwrap();

        let status = live(&store).status.clone().unwrap();
        let summary = status.summary.unwrap();
        assert_eq!(summary.deployment_status, DeploymentStatus::Complete);
        assert_eq!(summary.core_api_summary, "https://gw/catalog");
        assert!(status.core_apis[0].ready);
    }

    #[tokio::test]
    async fn test_unchanged_component_issues_no_further_writes() {
        let store = MemoryStore::new();
        let ctx = context(&store);
        store.insert("ns", &Component::new("comp", catalog_spec()));

        reconcile_component(live(&store), ctx.clone()).await.unwrap();
        // the status write re-delivers the object
        reconcile_component(live(&store), ctx.clone()).await.unwrap();
        reconcile_component(live(&store), ctx.clone()).await.unwrap();

        assert_eq!(store.count("create", "ExposedAPI"), 1);
        assert_eq!(store.count("patch_status", "Component"), 1);
    }

    #[tokio::test]
    async fn test_secrets_block_removal_deletes_child() {
        let store = MemoryStore::new();
        let ctx = context(&store);
        let mut spec = catalog_spec();
        spec.security_function.secrets_management = Some(SecretsManagementDeclaration::default());
        let component = store.insert("ns", &Component::new("comp", spec));
        reconcile_component(live(&store), ctx.clone()).await.unwrap();
        assert!(store.get::<SecretsManagement>("ns", "comp").is_some());

        let mut updated = (*live(&store)).clone();
        updated.spec = component.spec.clone();
        updated.spec.security_function.secrets_management = None;
        store.insert("ns", &updated);
        reconcile_component(live(&store), ctx.clone()).await.unwrap();

        assert!(store.get::<SecretsManagement>("ns", "comp").is_none());
        assert!(live(&store).status.clone().unwrap().security_secrets_management.is_none());
    }

    #[tokio::test]
    async fn test_invalid_segment_leaves_sibling_segments_reconciled() {
        let store = MemoryStore::new();
        let ctx = context(&store);
        let mut spec = catalog_spec();
        spec.management_function.exposed_apis = vec![ExposedApiDeclaration::default()];
        store.insert("ns", &Component::new("comp", spec));

        let err = reconcile_component(live(&store), ctx.clone()).await.unwrap_err();
        assert!(matches!(err, ReconcilerError::InvalidDeclaration(_)));
        assert!(!err.is_retryable());
        assert_eq!(live(&store).status.clone().unwrap().core_apis.len(), 1);
    }

    #[tokio::test]
    async fn test_child_failure_is_retryable_and_status_still_written() {
        let store = MemoryStore::new();
        let ctx = context(&store);
        store.insert("ns", &Component::new("comp", catalog_spec()));
        store.fail_next("create", "ExposedAPI", StoreError::Transport("reset".into()));

        let err = reconcile_component(live(&store), ctx.clone()).await.unwrap_err();
        assert!(matches!(err, ReconcilerError::PartialFailure { failed: 1, .. }));
        assert!(err.is_retryable());
        assert_eq!(store.count("patch_status", "Component"), 1);

        // the retry runs the segment reconciler again
        reconcile_component(live(&store), ctx.clone()).await.unwrap();
        assert!(store.get::<ExposedApi>("ns", "comp-catalog-v4").is_some());
    }
}
