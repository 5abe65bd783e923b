//! # API Declarations
//!
//! The exposed/dependent API entries an author lists inside each function
//! segment of a Component. These are inputs to the normalizer; the engine
//! never writes them.

use crate::crd::schema::{preserve_unknown_list, preserve_unknown_object};
use serde::{Deserialize, Serialize};

/// An API the Component offers
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExposedApiDeclaration {
    /// Logical API name, unique within the segment
    pub name: String,
    /// API type (defaults to `openapi`)
    #[serde(default)]
    pub api_type: Option<String>,
    /// Legacy single specification URL
    #[serde(default)]
    pub url: Option<String>,
    /// Version-specific specification entries; one child API per entry in the core segment
    #[serde(default)]
    pub specification: Vec<SpecificationEntry>,
    /// Service implementing the API
    #[serde(default)]
    pub implementation: Option<String>,
    /// Base path served by the implementation
    #[serde(default)]
    pub path: Option<String>,
    /// Port of the implementing service
    #[serde(default)]
    pub port: Option<i32>,
    /// Path of a developer UI served alongside the API
    #[serde(default, rename = "developerUI")]
    pub developer_ui: Option<String>,
    /// Gateway policy (rate limit, quota, CORS, API key, OpenAPI validation); passed through untouched
    #[serde(default)]
    #[schemars(schema_with = "preserve_unknown_object")]
    pub gateway_configuration: Option<serde_json::Value>,
    #[serde(default)]
    #[schemars(schema_with = "preserve_unknown_list")]
    pub resources: Option<Vec<serde_json::Value>>,
    #[serde(default, rename = "apiSDO")]
    pub api_sdo: Option<String>,
}

/// An API the Component consumes
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DependentApiDeclaration {
    pub name: String,
    #[serde(default)]
    pub api_type: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub specification: Vec<SpecificationEntry>,
    #[serde(default, rename = "apiSDO")]
    pub api_sdo: Option<String>,
    #[serde(default)]
    #[schemars(schema_with = "preserve_unknown_list")]
    pub resources: Option<Vec<serde_json::Value>>,
    /// Whether the Component cannot function without this dependency
    #[serde(default)]
    pub required: bool,
}

/// One version-specific specification of a declared API
///
/// Any field left unset inherits the declaration's root-level value, subject to
/// the per-kind whitelist applied by the normalizer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpecificationEntry {
    #[serde(default)]
    pub url: Option<String>,
    /// Explicit version; wins over anything inferred from URLs
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub api_type: Option<String>,
    #[serde(default)]
    #[schemars(schema_with = "preserve_unknown_list")]
    pub resources: Option<Vec<serde_json::Value>>,
    #[serde(default, rename = "apiSDO")]
    pub api_sdo: Option<String>,
    #[serde(default)]
    pub implementation: Option<String>,
    #[serde(default)]
    #[schemars(schema_with = "preserve_unknown_object")]
    pub gateway_configuration: Option<serde_json::Value>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default, rename = "developerUI")]
    pub developer_ui: Option<String>,
    #[serde(default)]
    pub port: Option<i32>,
}

/// Secrets backend requested by the security segment
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretsManagementDeclaration {
    /// Backend type understood by the secrets adapter (e.g. `sideCar`)
    #[serde(default, rename = "type")]
    pub backend_type: Option<String>,
    #[serde(default)]
    #[schemars(schema_with = "preserve_unknown_object")]
    pub sidecar: Option<serde_json::Value>,
    #[serde(default)]
    #[schemars(schema_with = "preserve_unknown_object")]
    pub pod_selector: Option<serde_json::Value>,
}
