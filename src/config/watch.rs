//! # ConfigMap Watch
//!
//! Watches the operator ConfigMap and hot-reloads configuration.

use crate::config::{ControllerConfig, ServerConfig, SharedControllerConfig, SharedServerConfig};
use futures::{pin_mut, StreamExt};
use k8s_openapi::api::core::v1::ConfigMap;
use kube::Api;
use kube_runtime::watcher;
use std::collections::BTreeMap;
use tracing::{error, info, warn};

/// Start watching the named ConfigMap and hot-reload configuration on change
///
/// ConfigMap keys are upper-cased and take precedence over the process
/// environment. Deleting the ConfigMap reverts to environment/defaults.
pub fn start_configmap_watch(
    client: kube::Client,
    namespace: &str,
    configmap_name: &str,
    controller_config: SharedControllerConfig,
    server_config: SharedServerConfig,
) {
    let namespace = namespace.to_string();
    let configmap_name = configmap_name.to_string();
    tokio::spawn(async move {
        let configmaps: Api<ConfigMap> = Api::namespaced(client, &namespace);
        let watcher_config =
            watcher::Config::default().fields(&format!("metadata.name={configmap_name}"));

        info!(
            "Starting watch for ConfigMap '{}' in namespace '{}'",
            configmap_name, namespace
        );

        let stream = watcher(configmaps, watcher_config);
        pin_mut!(stream);

        while let Some(event_result) = stream.next().await {
            match event_result {
                Ok(watcher::Event::Apply(configmap)) => {
                    info!("ConfigMap '{}' changed, reloading configuration", configmap_name);
                    apply_configmap(configmap.data.as_ref(), &controller_config, &server_config)
                        .await;
                }
                Ok(watcher::Event::Delete(_)) => {
                    warn!(
                        "ConfigMap '{}' was deleted, reverting to environment defaults",
                        configmap_name
                    );
                    apply_configmap(None, &controller_config, &server_config).await;
                }
                Ok(watcher::Event::InitApply(configmap)) => {
                    apply_configmap(configmap.data.as_ref(), &controller_config, &server_config)
                        .await;
                }
                Ok(watcher::Event::Init | watcher::Event::InitDone) => {}
                Err(e) => {
                    // The watcher retries on its own; keep consuming.
                    error!("Error watching ConfigMap '{}': {}", configmap_name, e);
                }
            }
        }

        warn!("ConfigMap watch stream ended");
    });
}

async fn apply_configmap(
    data: Option<&BTreeMap<String, String>>,
    controller_config: &SharedControllerConfig,
    server_config: &SharedServerConfig,
) {
    let overrides = upper_case_keys(data);
    let lookup = |key: &str| {
        overrides
            .get(key)
            .cloned()
            .or_else(|| std::env::var(key).ok())
    };

    let new_controller_config = ControllerConfig::from_lookup(lookup);
    let new_server_config = ServerConfig::from_lookup(lookup);

    let controller_changed = {
        let mut config = controller_config.write().await;
        let changed = *config != new_controller_config;
        *config = new_controller_config.clone();
        changed
    };
    let server_changed = {
        let mut config = server_config.write().await;
        let changed = *config != new_server_config;
        *config = new_server_config;
        changed
    };

    if !controller_changed && !server_changed {
        return;
    }

    info!(
        retry_budget = new_controller_config.retry_budget,
        backoff_min_secs = new_controller_config.backoff_min_secs,
        backoff_max_secs = new_controller_config.backoff_max_secs,
        "Configuration reloaded"
    );
}

fn upper_case_keys(data: Option<&BTreeMap<String, String>>) -> BTreeMap<String, String> {
    data.map(|data| {
        data.iter()
            .map(|(key, value)| (key.to_uppercase(), value.clone()))
            .collect()
    })
    .unwrap_or_default()
}
