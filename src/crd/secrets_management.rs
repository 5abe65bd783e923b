//! # SecretsManagement
//!
//! Per-Component request for a secrets backend. At most one exists per
//! Component and it shares the Component's name.

use crate::crd::exposed_api::ImplementationStatus;
use crate::crd::schema::preserve_unknown_object;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    group = "oda.tmforum.org",
    version = "v1",
    kind = "SecretsManagement",
    plural = "secretsmanagements",
    namespaced,
    status = "SecretsManagementStatus",
    printcolumn = r#"{"name":"Ready", "type":"boolean", "jsonPath":".status.implementation.ready"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SecretsManagementSpec {
    pub component_name: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub backend_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_object")]
    pub sidecar: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_object")]
    pub pod_selector: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub struct SecretsManagementStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<ImplementationStatus>,
}

impl SecretsManagementStatus {
    #[must_use]
    pub fn ready(&self) -> bool {
        self.implementation.as_ref().is_some_and(|i| i.ready)
    }
}
