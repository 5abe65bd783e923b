//! # Controller Configuration
//!
//! Operator-level settings loaded from environment variables.

use crate::constants::{
    DEFAULT_BACKOFF_MAX_SECS, DEFAULT_BACKOFF_MIN_SECS, DEFAULT_COMPONENT_NAME_LABEL,
    DEFAULT_CONTROLLER_NAMESPACE, DEFAULT_FIELD_MANAGER, DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
    DEFAULT_RETRY_BUDGET, DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS,
    DEFAULT_WATCH_RESTART_DELAY_SECS,
};
use std::time::Duration;

/// Operator-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment;
/// the same keys can be hot-reloaded from a watched ConfigMap (see `config::watch`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Namespace to watch. `None` watches every namespace.
    pub watch_namespace: Option<String>,
    /// Namespace the operator itself runs in
    pub controller_namespace: String,
    /// Label that links adoptable resources and children to their Component
    pub component_name_label: String,
    /// Field manager recorded on every write
    pub field_manager: String,
    /// Fibonacci backoff floor for retryable errors (seconds)
    pub backoff_min_secs: u64,
    /// Fibonacci backoff ceiling for retryable errors (seconds)
    pub backoff_max_secs: u64,
    /// Consecutive retryable failures tolerated per object before waiting for a change
    pub retry_budget: u32,
    /// Watch stream restart delay after unknown errors (seconds)
    pub watch_restart_delay_secs: u64,
    /// Watch stream restart delay after stream ends (seconds)
    pub watch_restart_delay_after_end_secs: u64,
    /// Maximum concurrent reconciliations per watched kind
    pub max_concurrent_reconciliations: u16,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE), used when `RUST_LOG` is unset
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
    /// ConfigMap watched for hot reload, if any
    pub config_map_name: Option<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            watch_namespace: None,
            controller_namespace: DEFAULT_CONTROLLER_NAMESPACE.to_string(),
            component_name_label: DEFAULT_COMPONENT_NAME_LABEL.to_string(),
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
            backoff_min_secs: DEFAULT_BACKOFF_MIN_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            retry_budget: DEFAULT_RETRY_BUDGET,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
            watch_restart_delay_after_end_secs: DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS,
            max_concurrent_reconciliations: DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            log_level: "INFO".to_string(),
            log_format: "json".to_string(),
            config_map_name: None,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup with defaults
    ///
    /// Keys are the upper-case environment variable names.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            watch_namespace: lookup("WATCH_NAMESPACE").filter(|ns| !ns.trim().is_empty()),
            controller_namespace: lookup("POD_NAMESPACE").unwrap_or(defaults.controller_namespace),
            component_name_label: lookup("COMPONENT_NAME_LABEL")
                .filter(|label| !label.is_empty())
                .unwrap_or(defaults.component_name_label),
            field_manager: lookup("FIELD_MANAGER")
                .filter(|manager| !manager.is_empty())
                .unwrap_or(defaults.field_manager),
            backoff_min_secs: parsed_or(&lookup, "BACKOFF_MIN_SECS", defaults.backoff_min_secs),
            backoff_max_secs: parsed_or(&lookup, "BACKOFF_MAX_SECS", defaults.backoff_max_secs),
            retry_budget: parsed_or(&lookup, "RETRY_BUDGET", defaults.retry_budget),
            watch_restart_delay_secs: parsed_or(
                &lookup,
                "WATCH_RESTART_DELAY_SECS",
                defaults.watch_restart_delay_secs,
            ),
            watch_restart_delay_after_end_secs: parsed_or(
                &lookup,
                "WATCH_RESTART_DELAY_AFTER_END_SECS",
                defaults.watch_restart_delay_after_end_secs,
            ),
            max_concurrent_reconciliations: parsed_or(
                &lookup,
                "MAX_CONCURRENT_RECONCILIATIONS",
                defaults.max_concurrent_reconciliations,
            ),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT").unwrap_or(defaults.log_format),
            config_map_name: lookup("CONFIG_MAP_NAME").filter(|name| !name.is_empty()),
        }
    }

    /// Get watch restart delay after end duration
    #[must_use]
    pub fn watch_restart_delay_after_end_duration(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_after_end_secs)
    }
}

/// Read a key and parse it, or return the default when absent or unparseable
pub(crate) fn parsed_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = ControllerConfig::from_lookup(|_| None);
        assert_eq!(config, ControllerConfig::default());
        assert_eq!(config.component_name_label, "oda.tmforum.org/componentName");
        assert!(config.watch_namespace.is_none());
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = ControllerConfig::from_lookup(lookup_from(&[
            ("WATCH_NAMESPACE", "components"),
            ("RETRY_BUDGET", "3"),
            ("BACKOFF_MAX_SECS", "60"),
            ("LOG_FORMAT", "text"),
        ]));
        assert_eq!(config.watch_namespace.as_deref(), Some("components"));
        assert_eq!(config.retry_budget, 3);
        assert_eq!(config.backoff_max_secs, 60);
        assert_eq!(config.log_format, "text");
    }

    #[test]
    fn test_unparseable_values_fall_back_to_defaults() {
        let config = ControllerConfig::from_lookup(lookup_from(&[
            ("RETRY_BUDGET", "lots"),
            ("WATCH_NAMESPACE", "  "),
        ]));
        assert_eq!(config.retry_budget, DEFAULT_RETRY_BUDGET);
        assert!(config.watch_namespace.is_none());
    }
}
