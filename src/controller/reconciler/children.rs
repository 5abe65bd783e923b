//! # API Children
//!
//! How a desired child record becomes an ExposedAPI or DependentAPI object.

use crate::controller::naming::DesiredChild;
use crate::controller::segment::ApiKind;
use crate::controller::store::StoredResource;
use crate::crd::{DependentApi, DependentApiSpec, ExposedApi, ExposedApiSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use serde::Serialize;
use std::collections::BTreeMap;

/// A child resource type produced by the segment reconciler
pub trait ApiChild: StoredResource {
    type Spec: PartialEq + Clone + Serialize + Send + Sync;

    const KIND: ApiKind;

    /// Fall back to patching when a create finds the name already taken
    const PATCH_ON_CONFLICT: bool;

    fn desired_spec(desired: &DesiredChild) -> Self::Spec;

    fn spec(&self) -> &Self::Spec;

    fn with_spec(name: &str, spec: Self::Spec) -> Self;

    /// Build a complete child object carrying labels and the controller owner reference
    fn build(
        desired: &DesiredChild,
        labels: BTreeMap<String, String>,
        owner: OwnerReference,
    ) -> Self {
        let mut child = Self::with_spec(&desired.name, Self::desired_spec(desired));
        let meta = child.meta_mut();
        meta.labels = Some(labels);
        meta.owner_references = Some(vec![owner]);
        child
    }
}

impl ApiChild for ExposedApi {
    type Spec = ExposedApiSpec;

    const KIND: ApiKind = ApiKind::Exposed;
    const PATCH_ON_CONFLICT: bool = false;

    fn desired_spec(desired: &DesiredChild) -> ExposedApiSpec {
        let api = &desired.api;
        ExposedApiSpec {
            name: api.name.clone(),
            api_type: api.api_type.clone(),
            segment: api.segment.spec_key().to_string(),
            version: desired.version.clone(),
            specification: desired.specification.clone(),
            implementation: api.implementation.clone(),
            path: api.path.clone(),
            port: api.port,
            developer_ui: api.developer_ui.clone(),
            gateway_configuration: api.gateway_configuration.clone(),
            resources: api.resources.clone(),
            api_sdo: api.api_sdo.clone(),
        }
    }

    fn spec(&self) -> &ExposedApiSpec {
        &self.spec
    }

    fn with_spec(name: &str, spec: ExposedApiSpec) -> Self {
        ExposedApi::new(name, spec)
    }
}

impl ApiChild for DependentApi {
    type Spec = DependentApiSpec;

    const KIND: ApiKind = ApiKind::Dependent;
    const PATCH_ON_CONFLICT: bool = true;

    fn desired_spec(desired: &DesiredChild) -> DependentApiSpec {
        let api = &desired.api;
        DependentApiSpec {
            name: api.name.clone(),
            api_type: api.api_type.clone(),
            segment: api.segment.spec_key().to_string(),
            version: desired.version.clone(),
            specification: desired.specification.clone(),
            api_sdo: api.api_sdo.clone(),
            resources: api.resources.clone(),
            required: api.required,
        }
    }

    fn spec(&self) -> &DependentApiSpec {
        &self.spec
    }

    fn with_spec(name: &str, spec: DependentApiSpec) -> Self {
        DependentApi::new(name, spec)
    }
}
