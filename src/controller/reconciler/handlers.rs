//! # Child Handlers
//!
//! Controller entry points for child and adoptable resources. Each consults
//! the field cache so a handler only runs when one of its routed fields
//! changed since its last success.

use crate::controller::dispatch::{DispatchPlan, Handler, RouteTarget};
use crate::controller::reconciler::adopt::adopt;
use crate::controller::reconciler::propagate::{
    propagate_dependent, propagate_exposed, propagate_identity_config,
    propagate_secrets_management,
};
use crate::controller::reconciler::types::{cache_key, resource_key, Reconciler, ReconcilerError};
use crate::controller::store::{Store, StoreError, StoredResource};
use crate::crd::{DependentApi, ExposedApi, IdentityConfig, SecretsManagement};
use crate::observability::metrics;
use kube::runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;

/// Dispatch plan for `obj`, or `None` when nothing routed to `handler` changed
fn plan_for<S: Store, K: StoredResource>(
    ctx: &Reconciler<S>,
    target: RouteTarget,
    handler: Handler,
    obj: &K,
) -> Result<Option<DispatchPlan>, ReconcilerError> {
    let key = cache_key(obj);
    if obj.meta().deletion_timestamp.is_some() {
        ctx.field_cache.forget(&key);
        return Ok(None);
    }
    let snapshot = serde_json::to_value(obj).map_err(StoreError::from)?;
    let plan = ctx.field_cache.plan(target, &key, &snapshot);
    Ok(plan.runs(handler).then_some(plan))
}

fn finish<S: Store, K: StoredResource>(
    ctx: &Reconciler<S>,
    plan: &DispatchPlan,
    handler: Handler,
    obj: &K,
    start: Instant,
) -> Action {
    plan.commit(&ctx.field_cache, handler);
    metrics::observe_reconciliation_duration(handler.as_str(), start.elapsed().as_secs_f64());
    let meta = obj.meta();
    ctx.reset_backoff(&resource_key(
        &K::kind(&()),
        meta.namespace.as_deref().unwrap_or_default(),
        meta.name.as_deref().unwrap_or_default(),
    ));
    Action::await_change()
}

/// Propagate ExposedAPI status to the parent Component
pub async fn reconcile_exposed_api<S: Store>(
    obj: Arc<ExposedApi>,
    ctx: Arc<Reconciler<S>>,
) -> Result<Action, ReconcilerError> {
    let handler = Handler::ExposedPropagator;
    let Some(plan) = plan_for(&ctx, RouteTarget::ExposedApi, handler, obj.as_ref())? else {
        return Ok(Action::await_change());
    };
    let start = Instant::now();
    metrics::increment_reconciliations(handler.as_str());
    propagate_exposed(ctx.store.as_ref(), &obj).await?;
    Ok(finish(&ctx, &plan, handler, obj.as_ref(), start))
}

/// Propagate DependentAPI status to the parent Component
pub async fn reconcile_dependent_api<S: Store>(
    obj: Arc<DependentApi>,
    ctx: Arc<Reconciler<S>>,
) -> Result<Action, ReconcilerError> {
    let handler = Handler::DependentPropagator;
    let Some(plan) = plan_for(&ctx, RouteTarget::DependentApi, handler, obj.as_ref())? else {
        return Ok(Action::await_change());
    };
    let start = Instant::now();
    metrics::increment_reconciliations(handler.as_str());
    propagate_dependent(ctx.store.as_ref(), &obj).await?;
    Ok(finish(&ctx, &plan, handler, obj.as_ref(), start))
}

pub async fn reconcile_secrets_management_child<S: Store>(
    obj: Arc<SecretsManagement>,
    ctx: Arc<Reconciler<S>>,
) -> Result<Action, ReconcilerError> {
    let handler = Handler::SecretsPropagator;
    let Some(plan) = plan_for(&ctx, RouteTarget::SecretsManagement, handler, obj.as_ref())? else {
        return Ok(Action::await_change());
    };
    let start = Instant::now();
    metrics::increment_reconciliations(handler.as_str());
    propagate_secrets_management(ctx.store.as_ref(), &obj).await?;
    Ok(finish(&ctx, &plan, handler, obj.as_ref(), start))
}

pub async fn reconcile_identity_config_child<S: Store>(
    obj: Arc<IdentityConfig>,
    ctx: Arc<Reconciler<S>>,
) -> Result<Action, ReconcilerError> {
    let handler = Handler::IdentityPropagator;
    let Some(plan) = plan_for(&ctx, RouteTarget::IdentityConfig, handler, obj.as_ref())? else {
        return Ok(Action::await_change());
    };
    let start = Instant::now();
    metrics::increment_reconciliations(handler.as_str());
    propagate_identity_config(ctx.store.as_ref(), &obj).await?;
    Ok(finish(&ctx, &plan, handler, obj.as_ref(), start))
}

/// Attach a labelled workload resource to its Component
pub async fn reconcile_adoptable<S: Store, K: StoredResource>(
    obj: Arc<K>,
    ctx: Arc<Reconciler<S>>,
) -> Result<Action, ReconcilerError> {
    let handler = Handler::Adopter;
    let Some(plan) = plan_for(&ctx, RouteTarget::Adoptable, handler, obj.as_ref())? else {
        return Ok(Action::await_change());
    };
    let start = Instant::now();
    metrics::increment_reconciliations(handler.as_str());
    let label = ctx.component_name_label().await;
    adopt(ctx.store.as_ref(), &label, obj.as_ref()).await?;
    Ok(finish(&ctx, &plan, handler, obj.as_ref(), start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerConfig;
    use crate::controller::store::memory::MemoryStore;
    use crate::crd::{Component, ComponentSpec, DependentApiSpec};
    use kube::Resource;
    use serde_json::json;
    use tokio::sync::RwLock;

    fn context(store: &MemoryStore) -> Arc<Reconciler<MemoryStore>> {
        Arc::new(Reconciler::new(
            store.clone(),
            Arc::new(RwLock::new(ControllerConfig::default())),
        ))
    }

    #[tokio::test]
    async fn test_unrelated_child_change_does_not_rerun_propagator() {
        let store = MemoryStore::new();
        let ctx = context(&store);
        let parent = store.insert("ns", &Component::new("comp", ComponentSpec::default()));
        let mut child = DependentApi::new("comp-party", DependentApiSpec::default());
        child.metadata.owner_references = parent.controller_owner_ref(&()).map(|o| vec![o]);
        let child = store.insert("ns", &child);
        let uid = child.metadata.uid.clone().unwrap();
        store.set_status::<Component>(
            "ns",
            "comp",
            json!({"coreDependentAPIs": [{"name": "comp-party", "uid": uid}]}),
        );
        let child: DependentApi =
            store.set_status("ns", "comp-party", json!({"implementation": {"ready": true}}));

        reconcile_dependent_api(Arc::new(child.clone()), ctx.clone()).await.unwrap();
        assert_eq!(store.count("patch_status", "Component"), 1);

        // a label edit is not a routed field
        let mut relabelled = child;
        relabelled.metadata.labels = Some([("team".to_string(), "a".to_string())].into());
        reconcile_dependent_api(Arc::new(relabelled), ctx.clone()).await.unwrap();
        assert_eq!(store.count("patch_status", "Component"), 1);
    }

    #[tokio::test]
    async fn test_pending_status_entry_is_retried() {
        let store = MemoryStore::new();
        let ctx = context(&store);
        let parent = store.insert("ns", &Component::new("comp", ComponentSpec::default()));
        let mut child = DependentApi::new("comp-party", DependentApiSpec::default());
        child.metadata.owner_references = parent.controller_owner_ref(&()).map(|o| vec![o]);
        let child = store.insert("ns", &child);

        let err = reconcile_dependent_api(Arc::new(child.clone()), ctx.clone())
            .await
            .unwrap_err();
        assert!(err.is_retryable());

        // not committed, so the same object runs the propagator again
        let again = reconcile_dependent_api(Arc::new(child), ctx.clone()).await;
        assert!(again.is_err());
    }
}
