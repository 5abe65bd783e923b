//! In-memory [`Store`] for handler tests.
//!
//! Objects are kept as JSON keyed by (kind, namespace, name). Every write is
//! recorded so tests can assert on the exact calls a handler issued.

use super::{Store, StoreError, StoredResource};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

type Key = (String, String, String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Op {
    pub verb: &'static str,
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<Key, Value>,
    ops: Vec<Op>,
    next_uid: u64,
    next_version: u64,
    failures: Vec<(&'static str, String, StoreError)>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

fn kind_of<K: StoredResource>() -> String {
    K::kind(&()).to_string()
}

fn resource_version(value: &Value) -> Option<String> {
    value
        .pointer("/metadata/resourceVersion")
        .and_then(Value::as_str)
        .map(str::to_string)
}

impl State {
    fn bump_version(&mut self, value: &mut Value) {
        self.next_version += 1;
        value["metadata"]["resourceVersion"] = json!(self.next_version.to_string());
    }

    fn take_failure(&mut self, verb: &'static str, kind: &str) -> Option<StoreError> {
        let index = self
            .failures
            .iter()
            .position(|(v, k, _)| *v == verb && k == kind)?;
        Some(self.failures.remove(index).2)
    }

    fn check_precondition(
        &self,
        kind: &str,
        name: &str,
        requested: Option<String>,
        stored: &Value,
    ) -> Result<(), StoreError> {
        match requested {
            Some(rv) if Some(&rv) != resource_version(stored).as_ref() => {
                Err(StoreError::Conflict {
                    kind: kind.to_string(),
                    name: name.to_string(),
                    message: format!("resourceVersion {rv} is stale"),
                })
            }
            _ => Ok(()),
        }
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("memory store lock poisoned")
    }

    /// Seed an object as if it had been created out of band (status included)
    pub fn insert<K: StoredResource>(&self, namespace: &str, obj: &K) -> K {
        let mut state = self.lock();
        let mut value = serde_json::to_value(obj).expect("object serializes");
        let name = obj.meta().name.clone().unwrap_or_default();
        value["metadata"]["namespace"] = json!(namespace);
        if value.pointer("/metadata/uid").is_none() {
            state.next_uid += 1;
            value["metadata"]["uid"] = json!(format!("uid-{}", state.next_uid));
        }
        state.bump_version(&mut value);
        state
            .objects
            .insert((kind_of::<K>(), namespace.to_string(), name), value.clone());
        serde_json::from_value(value).expect("object deserializes")
    }

    pub fn get<K: StoredResource>(&self, namespace: &str, name: &str) -> Option<K> {
        self.lock()
            .objects
            .get(&(kind_of::<K>(), namespace.to_string(), name.to_string()))
            .map(|v| serde_json::from_value(v.clone()).expect("object deserializes"))
    }

    /// Overwrite the status of a stored object, as an external adapter would
    pub fn set_status<K: StoredResource>(&self, namespace: &str, name: &str, status: Value) -> K {
        let mut state = self.lock();
        let key = (kind_of::<K>(), namespace.to_string(), name.to_string());
        let mut value = state.objects.get(&key).cloned().expect("object exists");
        value["status"] = status;
        state.bump_version(&mut value);
        state.objects.insert(key, value.clone());
        serde_json::from_value(value).expect("object deserializes")
    }

    pub fn ops(&self) -> Vec<Op> {
        self.lock().ops.clone()
    }

    pub fn count(&self, verb: &str, kind: &str) -> usize {
        self.lock()
            .ops
            .iter()
            .filter(|op| op.verb == verb && op.kind == kind)
            .count()
    }

    pub fn clear_ops(&self) {
        self.lock().ops.clear();
    }

    /// Fail the next `verb` call against `kind` with `error`
    pub fn fail_next(&self, verb: &'static str, kind: &str, error: StoreError) {
        self.lock().failures.push((verb, kind.to_string(), error));
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_opt<K: StoredResource>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, StoreError> {
        let mut state = self.lock();
        if let Some(e) = state.take_failure("get", &kind_of::<K>()) {
            return Err(e);
        }
        state
            .objects
            .get(&(kind_of::<K>(), namespace.to_string(), name.to_string()))
            .map(|v| serde_json::from_value(v.clone()).map_err(StoreError::from))
            .transpose()
    }

    async fn create<K: StoredResource>(&self, namespace: &str, obj: &K) -> Result<K, StoreError> {
        let kind = kind_of::<K>();
        let name = obj.meta().name.clone().unwrap_or_default();
        let mut state = self.lock();
        state.ops.push(Op {
            verb: "create",
            kind: kind.clone(),
            name: name.clone(),
        });
        if let Some(e) = state.take_failure("create", &kind) {
            return Err(e);
        }
        let key = (kind.clone(), namespace.to_string(), name.clone());
        if state.objects.contains_key(&key) {
            return Err(StoreError::AlreadyExists { kind, name });
        }
        let mut value = serde_json::to_value(obj)?;
        state.next_uid += 1;
        value["metadata"]["uid"] = json!(format!("uid-{}", state.next_uid));
        value["metadata"]["namespace"] = json!(namespace);
        value["metadata"]["generation"] = json!(1);
        if let Some(map) = value.as_object_mut() {
            map.remove("status");
        }
        state.bump_version(&mut value);
        state.objects.insert(key, value.clone());
        Ok(serde_json::from_value(value)?)
    }

    async fn replace<K: StoredResource>(
        &self,
        namespace: &str,
        name: &str,
        obj: &K,
    ) -> Result<K, StoreError> {
        let kind = kind_of::<K>();
        let mut state = self.lock();
        state.ops.push(Op {
            verb: "replace",
            kind: kind.clone(),
            name: name.to_string(),
        });
        if let Some(e) = state.take_failure("replace", &kind) {
            return Err(e);
        }
        let key = (kind.clone(), namespace.to_string(), name.to_string());
        let stored = state.objects.get(&key).cloned().ok_or(StoreError::NotFound {
            kind: kind.clone(),
            name: name.to_string(),
        })?;
        let mut value = serde_json::to_value(obj)?;
        state.check_precondition(&kind, name, resource_version(&value), &stored)?;
        value["metadata"]["uid"] = stored["metadata"]["uid"].clone();
        if let Some(status) = stored.get("status") {
            value["status"] = status.clone();
        }
        state.bump_version(&mut value);
        state.objects.insert(key, value.clone());
        Ok(serde_json::from_value(value)?)
    }

    async fn patch<K: StoredResource>(
        &self,
        namespace: &str,
        name: &str,
        patch: &Value,
    ) -> Result<K, StoreError> {
        let kind = kind_of::<K>();
        let mut state = self.lock();
        state.ops.push(Op {
            verb: "patch",
            kind: kind.clone(),
            name: name.to_string(),
        });
        if let Some(e) = state.take_failure("patch", &kind) {
            return Err(e);
        }
        let key = (kind.clone(), namespace.to_string(), name.to_string());
        let mut value = state.objects.get(&key).cloned().ok_or(StoreError::NotFound {
            kind: kind.clone(),
            name: name.to_string(),
        })?;
        state.check_precondition(&kind, name, resource_version(patch), &value)?;
        let mut patch = patch.clone();
        if let Some(map) = patch.as_object_mut() {
            map.remove("status");
        }
        json_patch::merge(&mut value, &patch);
        state.bump_version(&mut value);
        state.objects.insert(key, value.clone());
        Ok(serde_json::from_value(value)?)
    }

    async fn patch_status<K: StoredResource>(
        &self,
        namespace: &str,
        name: &str,
        patch: &Value,
    ) -> Result<K, StoreError> {
        let kind = kind_of::<K>();
        let mut state = self.lock();
        state.ops.push(Op {
            verb: "patch_status",
            kind: kind.clone(),
            name: name.to_string(),
        });
        if let Some(e) = state.take_failure("patch_status", &kind) {
            return Err(e);
        }
        let key = (kind.clone(), namespace.to_string(), name.to_string());
        let mut value = state.objects.get(&key).cloned().ok_or(StoreError::NotFound {
            kind: kind.clone(),
            name: name.to_string(),
        })?;
        state.check_precondition(&kind, name, resource_version(patch), &value)?;
        if let Some(status) = patch.get("status") {
            json_patch::merge(&mut value, &json!({ "status": status }));
        }
        state.bump_version(&mut value);
        state.objects.insert(key, value.clone());
        Ok(serde_json::from_value(value)?)
    }

    async fn delete<K: StoredResource>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(), StoreError> {
        let kind = kind_of::<K>();
        let mut state = self.lock();
        state.ops.push(Op {
            verb: "delete",
            kind: kind.clone(),
            name: name.to_string(),
        });
        if let Some(e) = state.take_failure("delete", &kind) {
            return Err(e);
        }
        state
            .objects
            .remove(&(kind.clone(), namespace.to_string(), name.to_string()))
            .map(|_| ())
            .ok_or(StoreError::NotFound {
                kind,
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::ConfigMap;
    use kube::api::ObjectMeta;

    fn config_map(name: &str) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_twice_is_already_exists() {
        let store = MemoryStore::new();
        store.create("ns", &config_map("a")).await.unwrap();
        let err = store.create("ns", &config_map("a")).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_stale_resource_version_conflicts() {
        let store = MemoryStore::new();
        let created = store.create("ns", &config_map("a")).await.unwrap();
        let stale = created.metadata.resource_version.clone().unwrap();
        store
            .patch::<ConfigMap>("ns", "a", &json!({"data": {"k": "v"}}))
            .await
            .unwrap();

        let err = store
            .patch::<ConfigMap>("ns", "a", &json!({"metadata": {"resourceVersion": stale}}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_injected_failure_fires_once() {
        let store = MemoryStore::new();
        store.fail_next("create", "ConfigMap", StoreError::Transport("reset".into()));
        assert!(store.create("ns", &config_map("a")).await.is_err());
        assert!(store.create("ns", &config_map("a")).await.is_ok());
    }
}
