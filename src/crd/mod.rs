//! # Custom Resource Definitions
//!
//! CRD types for the Component operator.
//!
//! ## Module Structure
//!
//! - `component.rs` - The Component root resource and its function segments
//! - `declarations.rs` - Exposed/dependent API declarations inside a segment
//! - `status.rs` - Component status tree and deployment state
//! - `exposed_api.rs`, `dependent_api.rs` - Per-API child resources
//! - `secrets_management.rs`, `identity_config.rs` - Per-Component singleton children
//! - `schema.rs` - Schema overrides for passthrough fields

mod component;
mod declarations;
mod dependent_api;
mod exposed_api;
mod identity_config;
mod schema;
mod secrets_management;
mod status;

pub use component::{Component, ComponentSpec, FunctionSpec, SecurityFunctionSpec};
pub use declarations::{
    DependentApiDeclaration, ExposedApiDeclaration, SecretsManagementDeclaration,
    SpecificationEntry,
};
pub use dependent_api::{DependentApi, DependentApiSpec, DependentApiStatus};
pub use exposed_api::{
    ApiEndpointStatus, ExposedApi, ExposedApiSpec, ExposedApiStatus, ImplementationStatus,
};
pub use identity_config::{IdentityConfig, IdentityConfigSpec, IdentityConfigStatus};
pub use secrets_management::{
    SecretsManagement, SecretsManagementSpec, SecretsManagementStatus,
};
pub use status::{
    ApiStatusEntry, ComponentStatus, ComponentSummary, DeploymentStatus, IdentityConfigSummary,
    SecretsManagementSummary,
};

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::CustomResourceExt;

/// Every CRD served by the operator, Component first
#[must_use]
pub fn crds() -> Vec<CustomResourceDefinition> {
    vec![
        Component::crd(),
        ExposedApi::crd(),
        DependentApi::crd(),
        SecretsManagement::crd(),
        IdentityConfig::crd(),
    ]
}

/// Render every CRD as a multi-document YAML stream
///
/// # Errors
///
/// Returns an error if a CRD cannot be serialized.
pub fn crds_yaml() -> Result<String, serde_yaml::Error> {
    let mut out = String::new();
    for crd in crds() {
        out.push_str("---\n");
        out.push_str(&serde_yaml::to_string(&crd)?);
    }
    Ok(out)
}
