//! # ExposedAPI
//!
//! One concrete, single-version API offered by a Component. Created and owned by
//! the segment reconciler; implemented by an external gateway adapter that
//! writes `status.apiStatus` and `status.implementation`.

use crate::crd::schema::{preserve_unknown_list, preserve_unknown_object};
use kube::CustomResource;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    group = "oda.tmforum.org",
    version = "v1",
    kind = "ExposedAPI",
    root = "ExposedApi",
    plural = "exposedapis",
    namespaced,
    status = "ExposedApiStatus",
    printcolumn = r#"{"name":"API", "type":"string", "jsonPath":".spec.name"}"#,
    printcolumn = r#"{"name":"URL", "type":"string", "jsonPath":".status.apiStatus.url"}"#,
    printcolumn = r#"{"name":"Ready", "type":"boolean", "jsonPath":".status.implementation.ready"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ExposedApiSpec {
    /// Logical API name from the declaration
    pub name: String,
    pub api_type: String,
    /// Function segment this API was declared in
    pub segment: String,
    /// Resolved version; absent on folded legacy children
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub specification: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,
    #[serde(default, rename = "developerUI", skip_serializing_if = "Option::is_none")]
    pub developer_ui: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_object")]
    pub gateway_configuration: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_list")]
    pub resources: Option<Vec<serde_json::Value>>,
    #[serde(default, rename = "apiSDO", skip_serializing_if = "Option::is_none")]
    pub api_sdo: Option<String>,
}

/// Written by the gateway adapter
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExposedApiStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_status: Option<ApiEndpointStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<ImplementationStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiEndpointStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, rename = "developerUI", skip_serializing_if = "Option::is_none")]
    pub developer_ui: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

/// Readiness reported by whichever adapter implements a child
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub struct ImplementationStatus {
    #[serde(default)]
    pub ready: bool,
}

impl ExposedApiStatus {
    #[must_use]
    pub fn ready(&self) -> bool {
        self.implementation.as_ref().is_some_and(|i| i.ready)
    }
}
