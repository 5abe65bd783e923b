//! # Kubernetes Store
//!
//! [`Store`] backed by a live cluster through typed `kube::Api` handles.

use super::{Store, StoreError, StoredResource};
use async_trait::async_trait;
use kube::api::{Api, DeleteParams, Patch, PatchParams, PostParams};
use kube::Client;
use serde_json::Value;

#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    field_manager: String,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore")
            .field("field_manager", &self.field_manager)
            .finish_non_exhaustive()
    }
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
        }
    }

    fn api<K: StoredResource>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn post_params(&self) -> PostParams {
        PostParams {
            field_manager: Some(self.field_manager.clone()),
            ..PostParams::default()
        }
    }

    fn patch_params(&self) -> PatchParams {
        PatchParams {
            field_manager: Some(self.field_manager.clone()),
            ..PatchParams::default()
        }
    }
}

/// Classify a kube error for the kind/name being written
fn classify<K: StoredResource>(name: &str, e: kube::Error) -> StoreError {
    let kind = K::kind(&()).to_string();
    match e {
        kube::Error::Api(ae) if ae.code == 404 => StoreError::NotFound {
            kind,
            name: name.to_string(),
        },
        kube::Error::Api(ae) if ae.code == 409 && ae.reason == "AlreadyExists" => {
            StoreError::AlreadyExists {
                kind,
                name: name.to_string(),
            }
        }
        kube::Error::Api(ae) if ae.code == 409 => StoreError::Conflict {
            kind,
            name: name.to_string(),
            message: ae.message,
        },
        kube::Error::Api(ae) => StoreError::Api {
            code: ae.code,
            message: ae.message,
        },
        kube::Error::SerdeError(e) => StoreError::Serialization(e.to_string()),
        other => StoreError::Transport(other.to_string()),
    }
}

#[async_trait]
impl Store for KubeStore {
    async fn get_opt<K: StoredResource>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, StoreError> {
        self.api::<K>(namespace)
            .get_opt(name)
            .await
            .map_err(|e| classify::<K>(name, e))
    }

    async fn create<K: StoredResource>(&self, namespace: &str, obj: &K) -> Result<K, StoreError> {
        let name = obj.meta().name.clone().unwrap_or_default();
        self.api::<K>(namespace)
            .create(&self.post_params(), obj)
            .await
            .map_err(|e| classify::<K>(&name, e))
    }

    async fn replace<K: StoredResource>(
        &self,
        namespace: &str,
        name: &str,
        obj: &K,
    ) -> Result<K, StoreError> {
        self.api::<K>(namespace)
            .replace(name, &self.post_params(), obj)
            .await
            .map_err(|e| classify::<K>(name, e))
    }

    async fn patch<K: StoredResource>(
        &self,
        namespace: &str,
        name: &str,
        patch: &Value,
    ) -> Result<K, StoreError> {
        self.api::<K>(namespace)
            .patch(name, &self.patch_params(), &Patch::Merge(patch))
            .await
            .map_err(|e| classify::<K>(name, e))
    }

    async fn patch_status<K: StoredResource>(
        &self,
        namespace: &str,
        name: &str,
        patch: &Value,
    ) -> Result<K, StoreError> {
        self.api::<K>(namespace)
            .patch_status(name, &self.patch_params(), &Patch::Merge(patch))
            .await
            .map_err(|e| classify::<K>(name, e))
    }

    async fn delete<K: StoredResource>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(), StoreError> {
        self.api::<K>(namespace)
            .delete(name, &DeleteParams::background())
            .await
            .map(|_| ())
            .map_err(|e| classify::<K>(name, e))
    }
}
