//! # Initialization
//!
//! Operator startup: rustls provider, tracing, metrics, the probe server,
//! the Kubernetes client and the shared reconciler context.

use crate::config::{
    create_shared_config, start_configmap_watch, ControllerConfig, SharedControllerConfig,
    SharedServerConfig,
};
use crate::controller::reconciler::Reconciler;
use crate::controller::server::{start_server, ServerState};
use crate::controller::store::KubeStore;
use crate::crd::Component;
use crate::observability;
use crate::runtime::watch_loop::WatchContext;
use anyhow::{anyhow, Context, Result};
use kube::{api::Api, api::ListParams, Client};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Everything the watch loops need once startup has finished
pub struct InitializationResult {
    pub client: Client,
    pub reconciler: Arc<Reconciler>,
    pub server_state: Arc<ServerState>,
    /// Shared controller configuration (hot-reloadable)
    pub controller_config: SharedControllerConfig,
    /// Shared server configuration (hot-reloadable)
    pub server_config: SharedServerConfig,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.ready())
            .finish_non_exhaustive()
    }
}

impl InitializationResult {
    #[must_use]
    pub fn watch_context(&self) -> WatchContext {
        WatchContext {
            client: self.client.clone(),
            reconciler: self.reconciler.clone(),
            server_state: self.server_state.clone(),
            controller_config: self.controller_config.clone(),
        }
    }
}

/// Default filter when `RUST_LOG` is unset: the operator at `LOG_LEVEL`, dependencies quieter
fn default_filter(log_level: &str) -> EnvFilter {
    let level = log_level.to_lowercase();
    EnvFilter::try_new(format!("component_operator={level},kube=warn,tower_http=warn"))
        .unwrap_or_else(|_| EnvFilter::new("component_operator=info,kube=warn"))
}

fn init_tracing(config: &ControllerConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(&config.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if config.log_format.eq_ignore_ascii_case("json") {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow!("Failed to initialize tracing subscriber: {e}"))
}

/// Initialize the operator runtime
///
/// # Errors
///
/// Fails if the probe server cannot start, metrics cannot be registered,
/// or no Kubernetes client can be built.
pub async fn initialize() -> Result<InitializationResult> {
    // must happen before any rustls connection is made
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    let (controller_config, server_config) = create_shared_config();
    init_tracing(&*controller_config.read().await)?;

    info!("Starting Component Operator");
    info!(
        "Build info: datetime={}, git_hash={}",
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::new());
    let server_port = server_config.read().await.metrics_port;
    let server_state_clone = server_state.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle, server_config.clone()).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let field_manager = controller_config.read().await.field_manager.clone();
    let reconciler = Arc::new(Reconciler::new(
        KubeStore::new(client.clone(), field_manager),
        controller_config.clone(),
    ));

    let (controller_namespace, config_map_name) = {
        let config = controller_config.read().await;
        (config.controller_namespace.clone(), config.config_map_name.clone())
    };
    match config_map_name {
        Some(name) => {
            info!(
                "Hot-reload enabled: watching ConfigMap '{}' in namespace '{}'",
                name, controller_namespace
            );
            start_configmap_watch(
                client.clone(),
                &controller_namespace,
                &name,
                controller_config.clone(),
                server_config.clone(),
            );
        }
        None => info!("Hot-reload disabled - configuration changes require pod restart"),
    }

    log_existing_components(&client, &controller_config).await;

    info!("Operator initialized, starting watch loops...");
    Ok(InitializationResult {
        client,
        reconciler,
        server_state,
        controller_config,
        server_config,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    server_config: SharedServerConfig,
) -> Result<()> {
    let (startup_timeout, poll_interval) = {
        let config = server_config.read().await;
        (
            Duration::from_secs(config.startup_timeout_secs),
            Duration::from_millis(config.poll_interval_ms),
        )
    };
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow!("HTTP server failed to start"));
        }
        if server_state.ready() {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }
        if start_time.elapsed() > startup_timeout {
            return Err(anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }
        tokio::time::sleep(poll_interval).await;
    }
}

/// Log a startup summary of existing Components, doubling as a CRD check
///
/// The controllers' initial list reconciles every one of them.
async fn log_existing_components(client: &Client, controller_config: &SharedControllerConfig) {
    let span = tracing::info_span!(
        "controller.startup.list_existing",
        operation = "log_existing_components"
    );
    let _guard = span.enter();

    let api: Api<Component> = match &controller_config.read().await.watch_namespace {
        Some(namespace) => Api::namespaced(client.clone(), namespace),
        None => Api::all(client.clone()),
    };

    match api.list(&ListParams::default()).await {
        Ok(list) => {
            let mut by_namespace: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for item in &list.items {
                by_namespace
                    .entry(item.metadata.namespace.clone().unwrap_or_default())
                    .or_default()
                    .push(item.metadata.name.clone().unwrap_or_default());
            }
            info!(
                "Component CRD is queryable: {} existing Components in {} namespaces",
                list.items.len(),
                by_namespace.len()
            );
            for (namespace, mut names) in by_namespace {
                names.sort();
                let shown = if names.len() <= 3 {
                    names.join(", ")
                } else {
                    format!("{}, ... ({} total)", names[..3].join(", "), names.len())
                };
                info!("  {}: {}", namespace, shown);
            }
        }
        Err(e) => {
            error!("Component CRD is not queryable: {:?}. Is the CRD installed?", e);
            error!("Installation: component-operator crds | kubectl apply -f -");
            warn!("Continuing; the watch loops will retry");
        }
    }
}
