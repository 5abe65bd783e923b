//! # Controller
//!
//! Core controller modules for the Component operator.
//!
//! - `backoff`: Fibonacci backoff mechanism for retries
//! - `dispatch`: Watch-dispatch table and field cache
//! - `naming`: API normalization and deterministic child naming
//! - `reconciler`: Handlers for Components, their children and adoptable resources
//! - `segment`: The three function segments of a Component
//! - `server`: HTTP server for metrics and health checks
//! - `store`: Resource-store seam over the Kubernetes API

pub mod backoff;
pub mod dispatch;
pub mod naming;
pub mod reconciler;
pub mod segment;
pub mod server;
pub mod store;
