//! # Watch Loop
//!
//! One controller per watched kind: the Component, its four child kinds and
//! every adoptable workload kind (filtered to objects carrying the
//! component-name label). Each controller restarts its watch after stream
//! errors until shutdown.

use crate::config::SharedControllerConfig;
use crate::constants::FIELD_CACHE_PRUNE_INTERVAL_SECS;
use crate::controller::dispatch::FieldCache;
use crate::controller::reconciler::{
    reconcile_adoptable, reconcile_component, reconcile_dependent_api, reconcile_exposed_api,
    reconcile_identity_config_child, reconcile_secrets_management_child, Reconciler,
    ReconcilerError,
};
use crate::controller::reconciler::types::cache_key;
use crate::controller::server::ServerState;
use crate::controller::store::{KubeStore, StoredResource};
use crate::crd::{Component, DependentApi, ExposedApi, IdentityConfig, SecretsManagement};
use crate::runtime::error_policy::{
    handle_reconciliation_error, handle_watch_stream_error, is_reconciler_failure,
};
use anyhow::Result;
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim, Secret, Service, ServiceAccount};
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use kube::{Api, Client};
use kube_runtime::{controller, controller::Action, reflector, watcher, Controller};
use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn, Instrument};

/// Initial backoff for watch streams hitting 429 (milliseconds)
const WATCH_BACKOFF_START_MS: u64 = 1000;

/// Everything a watch loop needs besides the kind-specific pieces
#[derive(Clone)]
pub struct WatchContext {
    pub client: Client,
    pub reconciler: Arc<Reconciler>,
    pub server_state: Arc<ServerState>,
    pub controller_config: SharedControllerConfig,
}

impl std::fmt::Debug for WatchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchContext")
            .field("server_ready", &self.server_state.ready())
            .finish_non_exhaustive()
    }
}

impl WatchContext {
    async fn api<K: StoredResource>(&self) -> Api<K> {
        match &self.controller_config.read().await.watch_namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        }
    }
}

/// Run one controller for `K`, restarting the watch until shutdown
pub async fn run_watch_loop<K, F, Fut>(
    ctx: WatchContext,
    watcher_config: watcher::Config,
    reconcile: F,
) -> Result<()>
where
    K: StoredResource,
    F: Fn(Arc<K>, Arc<Reconciler>) -> Fut + Copy + Send + 'static,
    Fut: Future<Output = Result<Action, ReconcilerError>> + Send + 'static,
{
    let kind = K::kind(&()).to_string();
    let backoff_duration_ms = Arc::new(AtomicU64::new(WATCH_BACKOFF_START_MS));

    loop {
        if !ctx.server_state.ready() {
            info!("Shutdown requested, exiting {} watch loop", kind);
            break;
        }

        let (concurrency, max_backoff_ms) = {
            let config = ctx.controller_config.read().await;
            (
                config.max_concurrent_reconciliations,
                config.backoff_max_secs.saturating_mul(1000),
            )
        };
        let api = ctx.api::<K>().await;
        let backoff = backoff_duration_ms.clone();
        let config_for_filter = ctx.controller_config.clone();
        let kind_for_filter = kind.clone();

        info!("Starting {} controller watch...", kind);
        let controller = Controller::new(api, watcher_config.clone())
            .with_config(controller::Config::default().concurrency(concurrency))
            .shutdown_on_signal();
        let pruner = tokio::spawn(prune_field_cache(
            controller.store(),
            ctx.reconciler.field_cache.clone(),
            kind.clone(),
        ));
        controller
            .run(
                move |obj, reconciler| traced_reconcile(obj, reconciler, reconcile),
                |obj, error, reconciler| handle_reconciliation_error(obj, error, reconciler),
                ctx.reconciler.clone(),
            )
            .filter_map(move |event| {
                let backoff = backoff.clone();
                let config = config_for_filter.clone();
                let kind = kind_for_filter.clone();
                async move {
                    match &event {
                        Ok(_) => {
                            backoff.store(
                                WATCH_BACKOFF_START_MS,
                                std::sync::atomic::Ordering::Relaxed,
                            );
                            debug!("watch.event.success");
                            Some(event)
                        }
                        Err(e) if is_reconciler_failure(e) => {
                            // requeue already decided by the error policy
                            debug!(error = %e, "watch.event.reconciler_failed");
                            None
                        }
                        Err(e) => {
                            let error_string = format!("{e:?}");
                            let restart_delay = config.read().await.watch_restart_delay_secs;
                            handle_watch_stream_error(
                                &kind,
                                &error_string,
                                &backoff,
                                max_backoff_ms,
                                restart_delay,
                            )
                            .await
                            .map(|()| event)
                        }
                    }
                }
            })
            .for_each(|_| futures::future::ready(()))
            .instrument(tracing::info_span!("controller.watch", resource.kind = kind.as_str()))
            .await;
        pruner.abort();

        if !ctx.server_state.ready() {
            info!("Shutdown requested, exiting {} watch loop", kind);
            break;
        }

        let delay = ctx
            .controller_config
            .read()
            .await
            .watch_restart_delay_after_end_duration();
        warn!(
            "{} watch stream ended, restarting in {} seconds...",
            kind,
            delay.as_secs()
        );
        tokio::time::sleep(delay).await;
    }

    info!("{} controller stopped", kind);
    Ok(())
}

/// Periodically drop field-cache entries of objects no longer in the reflector
async fn prune_field_cache<K: StoredResource>(
    reader: reflector::Store<K>,
    cache: Arc<FieldCache>,
    kind: String,
) {
    // an empty store before the initial list would wipe every entry
    if reader.wait_until_ready().await.is_err() {
        return;
    }
    let mut interval = tokio::time::interval(Duration::from_secs(FIELD_CACHE_PRUNE_INTERVAL_SECS));
    loop {
        interval.tick().await;
        let live: HashSet<String> = reader
            .state()
            .iter()
            .map(|obj| cache_key(obj.as_ref()))
            .collect();
        let dropped = cache.retain_live(&kind, &live);
        if dropped > 0 {
            debug!(resource.kind = kind.as_str(), dropped, "Pruned field cache entries of deleted objects");
        }
    }
}

/// Wrap a handler invocation in the per-object reconcile span
fn traced_reconcile<K, F, Fut>(
    obj: Arc<K>,
    reconciler: Arc<Reconciler>,
    reconcile: F,
) -> impl Future<Output = Result<Action, ReconcilerError>> + Send + 'static
where
    K: StoredResource,
    F: Fn(Arc<K>, Arc<Reconciler>) -> Fut,
    Fut: Future<Output = Result<Action, ReconcilerError>> + Send + 'static,
{
    let meta = obj.meta();
    let span = tracing::info_span!(
        "controller.watch.reconcile",
        resource.kind = %K::kind(&()),
        resource.name = meta.name.as_deref().unwrap_or("unknown"),
        resource.namespace = meta.namespace.as_deref().unwrap_or("default"),
        resource.version = meta.resource_version.as_deref().unwrap_or("unknown"),
        resource.generation = meta.generation.unwrap_or(0),
        event.r#type = "watch_triggered"
    );
    let fut = reconcile(obj, reconciler);
    async move {
        let result = fut.await;
        match &result {
            Ok(action) => debug!(action = ?action, "watch.event.reconciled"),
            Err(e) => error!(error = %e, "watch.event.reconciliation_failed"),
        }
        result
    }
    .instrument(span)
}

fn spawn_loop<K, F, Fut>(
    ctx: &WatchContext,
    watcher_config: watcher::Config,
    reconcile: F,
) -> BoxFuture<'static, Result<()>>
where
    K: StoredResource,
    F: Fn(Arc<K>, Arc<Reconciler>) -> Fut + Copy + Send + 'static,
    Fut: Future<Output = Result<Action, ReconcilerError>> + Send + 'static,
{
    run_watch_loop::<K, F, Fut>(ctx.clone(), watcher_config, reconcile).boxed()
}

fn adoptable<K: StoredResource>(ctx: &WatchContext, label: &str) -> BoxFuture<'static, Result<()>> {
    // label-exists selector: unlabelled objects never reach the adopter
    spawn_loop::<K, _, _>(
        ctx,
        watcher::Config::default().labels(label).any_semantic(),
        reconcile_adoptable::<KubeStore, K>,
    )
}

/// Run every controller until shutdown
///
/// # Errors
///
/// Returns the first error any watch loop returns.
pub async fn run_controllers(ctx: WatchContext) -> Result<()> {
    let label = ctx.controller_config.read().await.component_name_label.clone();

    let shutdown_state = ctx.server_state.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal (SIGINT/SIGTERM), initiating graceful shutdown...");
            shutdown_state.set_ready(false);
            info!("Marked server as not ready, waiting for in-flight reconciliations to complete...");
        }
    });

    let any = || watcher::Config::default().any_semantic();
    let loops: Vec<BoxFuture<'static, Result<()>>> = vec![
        spawn_loop::<Component, _, _>(&ctx, any(), reconcile_component::<KubeStore>),
        spawn_loop::<ExposedApi, _, _>(&ctx, any(), reconcile_exposed_api::<KubeStore>),
        spawn_loop::<DependentApi, _, _>(&ctx, any(), reconcile_dependent_api::<KubeStore>),
        spawn_loop::<SecretsManagement, _, _>(&ctx, any(), reconcile_secrets_management_child::<KubeStore>),
        spawn_loop::<IdentityConfig, _, _>(&ctx, any(), reconcile_identity_config_child::<KubeStore>),
        adoptable::<Service>(&ctx, &label),
        adoptable::<Deployment>(&ctx, &label),
        adoptable::<PersistentVolumeClaim>(&ctx, &label),
        adoptable::<Job>(&ctx, &label),
        adoptable::<CronJob>(&ctx, &label),
        adoptable::<StatefulSet>(&ctx, &label),
        adoptable::<ConfigMap>(&ctx, &label),
        adoptable::<Secret>(&ctx, &label),
        adoptable::<ServiceAccount>(&ctx, &label),
        adoptable::<Role>(&ctx, &label),
        adoptable::<RoleBinding>(&ctx, &label),
    ];

    info!("Starting {} controllers", loops.len());
    futures::future::try_join_all(loops).await?;
    info!("All controllers stopped gracefully");
    Ok(())
}
