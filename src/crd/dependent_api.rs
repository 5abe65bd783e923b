//! # DependentAPI
//!
//! One concrete API a Component consumes. The dependency-discovery adapter
//! resolves it and reports `status.implementation.ready` plus the resolved `url`.

use crate::crd::exposed_api::ImplementationStatus;
use crate::crd::schema::preserve_unknown_list;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    group = "oda.tmforum.org",
    version = "v1",
    kind = "DependentAPI",
    root = "DependentApi",
    plural = "dependentapis",
    namespaced,
    status = "DependentApiStatus",
    printcolumn = r#"{"name":"API", "type":"string", "jsonPath":".spec.name"}"#,
    printcolumn = r#"{"name":"Ready", "type":"boolean", "jsonPath":".status.implementation.ready"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DependentApiSpec {
    pub name: String,
    pub api_type: String,
    pub segment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub specification: Vec<String>,
    #[serde(default, rename = "apiSDO", skip_serializing_if = "Option::is_none")]
    pub api_sdo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_list")]
    pub resources: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DependentApiStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<ImplementationStatus>,
    /// Resolved endpoint of the dependency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl DependentApiStatus {
    #[must_use]
    pub fn ready(&self) -> bool {
        self.implementation.as_ref().is_some_and(|i| i.ready)
    }
}
