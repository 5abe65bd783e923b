//! # Types
//!
//! Core types for the reconciler.

use crate::config::SharedControllerConfig;
use crate::constants::{DEFAULT_BACKOFF_MAX_SECS, DEFAULT_BACKOFF_MIN_SECS};
use crate::controller::backoff::FibonacciBackoff;
use crate::controller::dispatch::FieldCache;
use crate::controller::naming::NormalizeError;
use crate::controller::store::{KubeStore, Store, StoreError};
use kube::Resource;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid API declaration: {0}")]
    InvalidDeclaration(#[from] NormalizeError),

    #[error("Component '{namespace}/{name}' not found")]
    ComponentNotFound { namespace: String, name: String },

    #[error("kind '{0}' cannot be adopted")]
    UnsupportedKind(String),

    #[error("{kind} is missing metadata.{field}")]
    MissingMetadata { kind: String, field: &'static str },

    #[error("{failed} child operation(s) failed, first: {first}")]
    PartialFailure { failed: usize, first: String },

    #[error("Component '{parent}' has no status entry for {kind} uid {uid} yet")]
    StatusEntryPending {
        parent: String,
        kind: String,
        uid: String,
    },
}

impl ReconcilerError {
    /// Permanent errors are never requeued; the object waits for its next change
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            ReconcilerError::Store(e) => e.is_retryable(),
            ReconcilerError::InvalidDeclaration(_)
            | ReconcilerError::UnsupportedKind(_)
            | ReconcilerError::MissingMetadata { .. } => false,
            ReconcilerError::ComponentNotFound { .. }
            | ReconcilerError::PartialFailure { .. }
            | ReconcilerError::StatusEntryPending { .. } => true,
        }
    }

    /// Short label used for metrics and requeue reasons
    #[must_use]
    pub fn class(&self) -> &'static str {
        match self {
            ReconcilerError::Store(e) => e.class(),
            ReconcilerError::InvalidDeclaration(_) => "invalid_declaration",
            ReconcilerError::ComponentNotFound { .. } => "component_not_found",
            ReconcilerError::UnsupportedKind(_) => "unsupported_kind",
            ReconcilerError::MissingMetadata { .. } => "missing_metadata",
            ReconcilerError::PartialFailure { .. } => "partial_failure",
            ReconcilerError::StatusEntryPending { .. } => "status_entry_pending",
        }
    }
}

/// Backoff state for a specific resource
/// Tracks error count and backoff calculator for progressive retries
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl Default for BackoffState {
    fn default() -> Self {
        Self::new(DEFAULT_BACKOFF_MIN_SECS, DEFAULT_BACKOFF_MAX_SECS)
    }
}

impl BackoffState {
    #[must_use]
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_secs, max_secs),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count += 1;
    }

    pub fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// Reconciler context shared by every controller
///
/// Owns all cross-invocation state explicitly; nothing is kept in globals
/// apart from the metrics registry.
pub struct Reconciler<S = KubeStore> {
    pub store: Arc<S>,
    pub config: SharedControllerConfig,
    // Backoff state per object (kind/namespace/name), driven by error_policy
    pub backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
    pub field_cache: Arc<FieldCache>,
}

impl<S> std::fmt::Debug for Reconciler<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler").finish_non_exhaustive()
    }
}

impl<S: Store> Reconciler<S> {
    pub fn new(store: S, config: SharedControllerConfig) -> Self {
        Self {
            store: Arc::new(store),
            config,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
            field_cache: Arc::new(FieldCache::default()),
        }
    }

    /// Forget accumulated backoff after a successful reconciliation
    pub fn reset_backoff(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            if let Some(state) = states.get_mut(resource_key) {
                state.reset();
            }
        }
    }

    pub async fn component_name_label(&self) -> String {
        self.config.read().await.component_name_label.clone()
    }
}

/// Key identifying one object across backoff state
#[must_use]
pub fn resource_key(kind: &str, namespace: &str, name: &str) -> String {
    format!("{kind}/{namespace}/{name}")
}

/// Field-cache key: [`resource_key`] plus uid, so a recreated object starts clean
#[must_use]
pub fn cache_key<K: Resource<DynamicType = ()>>(obj: &K) -> String {
    let meta = obj.meta();
    format!(
        "{}#{}",
        resource_key(
            &K::kind(&()),
            meta.namespace.as_deref().unwrap_or_default(),
            meta.name.as_deref().unwrap_or_default(),
        ),
        meta.uid.as_deref().unwrap_or_default()
    )
}
