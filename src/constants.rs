//! # Constants
//!
//! Shared constants used throughout the operator.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// API group shared by the Component CRD and every child CRD
pub const API_GROUP: &str = "oda.tmforum.org";

/// API version shared by the Component CRD and every child CRD
pub const API_VERSION: &str = "v1";

/// Kind of the root resource; owner references of this kind mark adoption
pub const COMPONENT_KIND: &str = "Component";

/// Label carrying the owning Component's name on children and adoptable resources
pub const DEFAULT_COMPONENT_NAME_LABEL: &str = "oda.tmforum.org/componentName";

/// Label carrying the function segment on exposed/dependent API children
pub const SEGMENT_LABEL: &str = "oda.tmforum.org/segment";

/// Field manager recorded on every write
pub const DEFAULT_FIELD_MANAGER: &str = "component-operator";

/// Version assumed when neither the specification entry nor any URL carries one
pub const DEFAULT_API_VERSION: &str = "v4";

/// API type assumed when a declaration does not set `apiType`
pub const DEFAULT_API_TYPE: &str = "openapi";

/// Identity provider values that mean "not resolved yet"
pub const PLACEHOLDER_IDENTITY_PROVIDERS: &[&str] = &["", "unknown", "none", "pending"];

/// Exposed API names in the security segment that the identity adapter listens for
pub const PARTY_ROLE_API: &str = "partyrole";
pub const PERMISSION_SPECIFICATION_SET_API: &str = "permissionspecificationset";

/// Maximum length of a Kubernetes object name (RFC 1123 subdomain)
pub const MAX_OBJECT_NAME_LENGTH: usize = 253;

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default Fibonacci backoff floor for retryable errors (seconds)
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 1;

/// Default Fibonacci backoff ceiling for retryable errors (seconds)
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Default number of consecutive retryable failures tolerated per object and handler
pub const DEFAULT_RETRY_BUDGET: u32 = 10;

/// Default delay before restarting watch stream after unknown errors (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Default delay before restarting watch stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS: u64 = 1;

/// Default cap on concurrent reconciliations per watched kind
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 10;

/// Namespace the operator runs in when `POD_NAMESPACE` is unset
pub const DEFAULT_CONTROLLER_NAMESPACE: &str = "canvas";

/// How often field-cache entries of deleted objects are dropped
pub const FIELD_CACHE_PRUNE_INTERVAL_SECS: u64 = 60;
