//! # Reconciler
//!
//! Handlers for the Component tree:
//!
//! - `component` - segment reconcilers and status aggregation for a Component
//! - `handlers` - child status propagation and ownership adoption entry points
//! - `segments`, `singletons` - converge child resources to the desired set
//! - `propagate` - child to parent status propagation
//! - `summary` - deployment state machine
//! - `adopt` - ownership adopter
//! - `status`, `patch` - diff-based Component status writes

pub mod adopt;
mod children;
pub mod component;
pub mod handlers;
mod patch;
pub mod propagate;
pub mod segments;
pub mod singletons;
pub mod status;
pub mod summary;
pub mod types;

pub use adopt::{AdoptableKind, AdoptionOutcome};
pub use component::reconcile_component;
pub use handlers::{
    reconcile_adoptable, reconcile_dependent_api, reconcile_exposed_api,
    reconcile_identity_config_child, reconcile_secrets_management_child,
};
pub use types::{resource_key, BackoffState, Reconciler, ReconcilerError};
