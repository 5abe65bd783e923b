//! # Runtime
//!
//! Process-level wiring: startup, the per-kind watch loops, and the error
//! policy that turns handler failures into requeues.

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;
