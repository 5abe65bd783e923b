//! # Resource Store
//!
//! The seam between handlers and the Kubernetes API. Handlers only ever talk
//! to a [`Store`]; production uses [`KubeStore`], tests use an in-memory store
//! that records every write.

mod kube_store;
#[cfg(test)]
pub(crate) mod memory;

pub use kube_store::KubeStore;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Debug;
use thiserror::Error;

/// Any namespaced, statically typed resource the engine reads or writes
pub trait StoredResource:
    Resource<Scope = NamespaceResourceScope, DynamicType = ()>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<K> StoredResource for K where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{kind} '{name}' not found")]
    NotFound { kind: String, name: String },
    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: String, name: String },
    #[error("conflict writing {kind} '{name}': {message}")]
    Conflict {
        kind: String,
        name: String,
        message: String,
    },
    #[error("API error {code}: {message}")]
    Api { code: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Whether retrying the same call can succeed without a spec change
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, StoreError::Serialization(_))
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Short label used for metrics
    #[must_use]
    pub fn class(&self) -> &'static str {
        match self {
            StoreError::NotFound { .. } => "not_found",
            StoreError::AlreadyExists { .. } => "already_exists",
            StoreError::Conflict { .. } => "conflict",
            StoreError::Api { .. } => "api",
            StoreError::Transport(_) => "transport",
            StoreError::Serialization(_) => "serialization",
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Namespaced CRUD against the backing resource store
///
/// `replace` is the native update verb of the resource kind; `patch` and
/// `patch_status` send a JSON merge patch. A `metadata.resourceVersion` in an
/// object or patch acts as an optimistic-concurrency precondition.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn get_opt<K: StoredResource>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, StoreError>;

    async fn create<K: StoredResource>(&self, namespace: &str, obj: &K) -> Result<K, StoreError>;

    async fn replace<K: StoredResource>(
        &self,
        namespace: &str,
        name: &str,
        obj: &K,
    ) -> Result<K, StoreError>;

    async fn patch<K: StoredResource>(
        &self,
        namespace: &str,
        name: &str,
        patch: &Value,
    ) -> Result<K, StoreError>;

    async fn patch_status<K: StoredResource>(
        &self,
        namespace: &str,
        name: &str,
        patch: &Value,
    ) -> Result<K, StoreError>;

    async fn delete<K: StoredResource>(&self, namespace: &str, name: &str)
        -> Result<(), StoreError>;
}
