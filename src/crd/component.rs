//! # Component Specification
//!
//! The root declarative resource. A Component groups the APIs it exposes and
//! consumes into three function segments; the operator expands each segment
//! into child resources.

use crate::crd::declarations::{
    DependentApiDeclaration, ExposedApiDeclaration, SecretsManagementDeclaration,
};
use crate::crd::status::ComponentStatus;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// Component Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: oda.tmforum.org/v1
/// kind: Component
/// metadata:
///   name: productcatalog
///   namespace: components
/// spec:
///   coreFunction:
///     exposedAPIs:
///       - name: catalog
///         implementation: productcatalog-svc
///         port: 8080
///         specification:
///           - url: https://specs.example.com/catalog_v4.0.0.json
///   securityFunction:
///     canvasSystemRole: Admin
///     secretsManagement:
///       type: sideCar
/// ```
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    group = "oda.tmforum.org",
    version = "v1",
    kind = "Component",
    namespaced,
    status = "ComponentStatus",
    shortname = "comp",
    printcolumn = r#"{"name":"Deployment", "type":"string", "jsonPath":".status.summary.deployment_status"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    #[serde(default)]
    pub core_function: FunctionSpec,
    #[serde(default)]
    pub management_function: FunctionSpec,
    #[serde(default)]
    pub security_function: SecurityFunctionSpec,
}

/// APIs declared by the core or management segment
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
pub struct FunctionSpec {
    #[serde(default, rename = "exposedAPIs")]
    pub exposed_apis: Vec<ExposedApiDeclaration>,
    #[serde(default, rename = "dependentAPIs")]
    pub dependent_apis: Vec<DependentApiDeclaration>,
}

/// APIs and security settings declared by the security segment
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecurityFunctionSpec {
    #[serde(default, rename = "exposedAPIs")]
    pub exposed_apis: Vec<ExposedApiDeclaration>,
    #[serde(default, rename = "dependentAPIs")]
    pub dependent_apis: Vec<DependentApiDeclaration>,
    /// Role granted to the canvas in the identity provider.
    /// Presence requests an IdentityConfig child.
    #[serde(default)]
    pub canvas_system_role: Option<String>,
    /// Role the Component itself runs under
    #[serde(default)]
    pub component_role: Option<String>,
    /// Presence requests a SecretsManagement child
    #[serde(default)]
    pub secrets_management: Option<SecretsManagementDeclaration>,
}
