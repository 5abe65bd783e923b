//! # Configuration
//!
//! Operator and server configuration, shared behind async read/write locks so
//! the ConfigMap watch can hot-reload values without a restart.

mod controller;
mod server;
mod watch;

pub use controller::ControllerConfig;
pub use server::ServerConfig;
pub use watch::start_configmap_watch;

use std::sync::Arc;
use tokio::sync::RwLock;

pub type SharedControllerConfig = Arc<RwLock<ControllerConfig>>;
pub type SharedServerConfig = Arc<RwLock<ServerConfig>>;

/// Load both configurations from the environment and wrap them for sharing
#[must_use]
pub fn create_shared_config() -> (SharedControllerConfig, SharedServerConfig) {
    (
        Arc::new(RwLock::new(ControllerConfig::from_env())),
        Arc::new(RwLock::new(ServerConfig::from_env())),
    )
}
