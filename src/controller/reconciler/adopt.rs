//! # Ownership Adopter
//!
//! Links labelled workload resources to their Component with an owner
//! reference so garbage collection cascades on Component deletion.

use crate::constants::COMPONENT_KIND;
use crate::controller::reconciler::types::ReconcilerError;
use crate::controller::store::{Store, StoredResource};
use crate::crd::Component;
use crate::observability::metrics;
use kube::Resource;
use std::fmt;
use tracing::{debug, info};

/// Resource kinds the adopter may write an owner reference to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdoptableKind {
    Service,
    Deployment,
    PersistentVolumeClaim,
    Job,
    CronJob,
    StatefulSet,
    ConfigMap,
    Secret,
    ServiceAccount,
    Role,
    RoleBinding,
}

impl AdoptableKind {
    pub const ALL: [AdoptableKind; 11] = [
        AdoptableKind::Service,
        AdoptableKind::Deployment,
        AdoptableKind::PersistentVolumeClaim,
        AdoptableKind::Job,
        AdoptableKind::CronJob,
        AdoptableKind::StatefulSet,
        AdoptableKind::ConfigMap,
        AdoptableKind::Secret,
        AdoptableKind::ServiceAccount,
        AdoptableKind::Role,
        AdoptableKind::RoleBinding,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AdoptableKind::Service => "Service",
            AdoptableKind::Deployment => "Deployment",
            AdoptableKind::PersistentVolumeClaim => "PersistentVolumeClaim",
            AdoptableKind::Job => "Job",
            AdoptableKind::CronJob => "CronJob",
            AdoptableKind::StatefulSet => "StatefulSet",
            AdoptableKind::ConfigMap => "ConfigMap",
            AdoptableKind::Secret => "Secret",
            AdoptableKind::ServiceAccount => "ServiceAccount",
            AdoptableKind::Role => "Role",
            AdoptableKind::RoleBinding => "RoleBinding",
        }
    }

    /// Look up a kind by name
    ///
    /// # Errors
    ///
    /// Returns [`ReconcilerError::UnsupportedKind`], which is permanent.
    pub fn from_kind(kind: &str) -> Result<Self, ReconcilerError> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == kind)
            .ok_or_else(|| ReconcilerError::UnsupportedKind(kind.to_string()))
    }
}

impl fmt::Display for AdoptableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdoptionOutcome {
    /// An owner reference to this Component was written
    Adopted { component: String },
    /// Some Component already owns the resource
    AlreadyOwned,
    /// The resource carries no usable component-name label
    Unlabelled,
}

/// Ensure `obj` carries an owner reference to the Component named by its `label_key` label
///
/// # Errors
///
/// - [`ReconcilerError::UnsupportedKind`] (permanent) for kinds outside [`AdoptableKind`]
/// - [`ReconcilerError::ComponentNotFound`] (retryable) when the Component does not exist yet
/// - store errors from the update; a stale `resourceVersion` surfaces as a retryable conflict
pub async fn adopt<S: Store, K: StoredResource>(
    store: &S,
    label_key: &str,
    obj: &K,
) -> Result<AdoptionOutcome, ReconcilerError> {
    let kind = AdoptableKind::from_kind(&K::kind(&()))?;
    let meta = obj.meta();
    let name = meta.name.clone().unwrap_or_default();

    let owners = meta.owner_references.clone().unwrap_or_default();
    if owners.iter().any(|o| o.kind == COMPONENT_KIND) {
        debug!(resource.kind = %kind, resource.name = name.as_str(), "Already owned by a Component");
        return Ok(AdoptionOutcome::AlreadyOwned);
    }

    let Some(component_name) = meta
        .labels
        .as_ref()
        .and_then(|l| l.get(label_key))
        .filter(|v| !v.trim().is_empty())
    else {
        return Ok(AdoptionOutcome::Unlabelled);
    };

    let namespace = meta.namespace.clone().ok_or(ReconcilerError::MissingMetadata {
        kind: kind.to_string(),
        field: "namespace",
    })?;

    let component = store
        .get_opt::<Component>(&namespace, component_name)
        .await?
        .ok_or_else(|| ReconcilerError::ComponentNotFound {
            namespace: namespace.clone(),
            name: component_name.clone(),
        })?;

    let mut owner = component
        .controller_owner_ref(&())
        .ok_or(ReconcilerError::MissingMetadata {
            kind: COMPONENT_KIND.to_string(),
            field: "uid",
        })?;
    // a resource can have only one controller owner
    if owners.iter().any(|o| o.controller == Some(true)) {
        owner.controller = Some(false);
    }

    let mut adopted = obj.clone();
    adopted
        .meta_mut()
        .owner_references
        .get_or_insert_with(Vec::new)
        .push(owner);
    store.replace(&namespace, &name, &adopted).await?;

    metrics::increment_adoptions(kind.as_str());
    info!(
        resource.kind = %kind,
        resource.name = name.as_str(),
        component = component_name.as_str(),
        "Adopted resource"
    );
    Ok(AdoptionOutcome::Adopted {
        component: component_name.clone(),
    })
}
