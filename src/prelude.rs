//! # Prelude
//!
//! Re-exports commonly used types for convenience.
//!
//! ```rust
//! use component_operator::prelude::*;
//! ```
//!
//! This brings into scope:
//! - All CRD types (Component, ExposedApi, DeploymentStatus, etc.)
//! - Reconciler types (Reconciler, ReconcilerError, BackoffState)
//! - The resource store seam (Store, KubeStore, StoreError)
//! - Config types (ControllerConfig, ServerConfig)

pub use crate::crd::*;

pub use crate::controller::reconciler::{BackoffState, Reconciler, ReconcilerError};

pub use crate::controller::store::{KubeStore, Store, StoreError, StoredResource};

pub use crate::controller::naming::{child_name, desired_children, DesiredChild, NormalizeError};
pub use crate::controller::segment::{ApiKind, Segment};

pub use crate::config::{
    ControllerConfig, ServerConfig, SharedControllerConfig, SharedServerConfig,
};
