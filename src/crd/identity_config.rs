//! # IdentityConfig
//!
//! Per-Component request for identity-provider registration. The identity
//! adapter writes the full status payload; `identityProvider` gates the
//! deployment state machine.

use kube::CustomResource;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    group = "oda.tmforum.org",
    version = "v1",
    kind = "IdentityConfig",
    plural = "identityconfigs",
    namespaced,
    status = "IdentityConfigStatus",
    printcolumn = r#"{"name":"Provider", "type":"string", "jsonPath":".status.identityProvider"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct IdentityConfigSpec {
    pub component_name: String,
    pub canvas_system_role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_role: Option<String>,
    /// The security segment exposes a `partyrole` API
    #[serde(default)]
    pub party_role: bool,
    /// The security segment exposes a `permissionspecificationset` API
    #[serde(default)]
    pub permission_specification_set: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdentityConfigStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listener_registered: Option<bool>,
}
