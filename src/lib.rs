//! Component Operator Library
//!
//! Expands ODA `Component` resources into ExposedAPI, DependentAPI,
//! SecretsManagement and IdentityConfig children, adopts labelled workload
//! resources, and rolls child readiness up into a single deployment state.
//! Tests are included in the module files.
//!
//! ## Quick Start
//!
//! ```rust
//! use component_operator::prelude::*;
//! ```
//!
//! This brings commonly used types into scope. For more specific imports,
//! use the individual modules.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod runtime;
