//! # Component Status
//!
//! Status types for the Component resource.
//!
//! Field ownership is single-writer:
//! - `name`/`uid` of every API entry: segment reconciler
//! - `ready`/`url`/`developerUI` of every API entry: child status propagator
//! - `securitySecretsManagement.ready`, `identityConfig`: child status propagator
//!   (the segment reconciler only initialises or clears the block)
//! - `summary`: status aggregator

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStatus {
    #[serde(default, rename = "coreAPIs", skip_serializing_if = "Vec::is_empty")]
    pub core_apis: Vec<ApiStatusEntry>,
    #[serde(default, rename = "managementAPIs", skip_serializing_if = "Vec::is_empty")]
    pub management_apis: Vec<ApiStatusEntry>,
    #[serde(default, rename = "securityAPIs", skip_serializing_if = "Vec::is_empty")]
    pub security_apis: Vec<ApiStatusEntry>,
    #[serde(default, rename = "coreDependentAPIs", skip_serializing_if = "Vec::is_empty")]
    pub core_dependent_apis: Vec<ApiStatusEntry>,
    #[serde(
        default,
        rename = "managementDependentAPIs",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub management_dependent_apis: Vec<ApiStatusEntry>,
    #[serde(
        default,
        rename = "securityDependentAPIs",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub security_dependent_apis: Vec<ApiStatusEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_secrets_management: Option<SecretsManagementSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_config: Option<IdentityConfigSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<ComponentSummary>,
    /// Generation whose spec was fully converged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

/// Last-known summary of one child API
///
/// Entries are matched to children by `uid`; names may be reused after a
/// child is deleted and recreated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiStatusEntry {
    pub name: String,
    pub uid: String,
    #[serde(default)]
    pub ready: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, rename = "developerUI", skip_serializing_if = "Option::is_none")]
    pub developer_ui: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub struct SecretsManagementSummary {
    #[serde(default)]
    pub ready: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdentityConfigSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listener_registered: Option<bool>,
}

/// Aggregated deployment progress plus per-segment endpoint listings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub struct ComponentSummary {
    #[serde(default, rename = "deployment_status")]
    pub deployment_status: DeploymentStatus,
    #[serde(default, rename = "coreAPIsummary")]
    pub core_api_summary: String,
    #[serde(default, rename = "managementAPIsummary")]
    pub management_api_summary: String,
    #[serde(default, rename = "securityAPIsummary")]
    pub security_api_summary: String,
    #[serde(default, rename = "developerUIsummary")]
    pub developer_ui_summary: String,
}

/// Deployment progress, in strict forward order
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Deserialize,
    Serialize,
    schemars::JsonSchema,
)]
pub enum DeploymentStatus {
    /// Waiting for every exposed API to become ready
    #[default]
    #[serde(rename = "In-Progress-CompCon")]
    InProgressCompCon,
    /// Waiting for the identity provider to be resolved
    #[serde(rename = "In-Progress-IDConfOp")]
    InProgressIdConfOp,
    /// Waiting for the secrets backend (if declared)
    #[serde(rename = "In-Progress-SecretMan")]
    InProgressSecretMan,
    /// Waiting for every dependent API to become ready
    #[serde(rename = "In-Progress-DepApi")]
    InProgressDepApi,
    #[serde(rename = "Complete")]
    Complete,
}

impl DeploymentStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::InProgressCompCon => "In-Progress-CompCon",
            DeploymentStatus::InProgressIdConfOp => "In-Progress-IDConfOp",
            DeploymentStatus::InProgressSecretMan => "In-Progress-SecretMan",
            DeploymentStatus::InProgressDepApi => "In-Progress-DepApi",
            DeploymentStatus::Complete => "Complete",
        }
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
