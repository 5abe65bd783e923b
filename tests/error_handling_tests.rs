//! # Error Handling Tests
//!
//! Error classification, Fibonacci backoff and configuration parsing.

use component_operator::config::ControllerConfig;
use component_operator::controller::backoff::FibonacciBackoff;
use component_operator::controller::naming::NormalizeError;
use component_operator::controller::reconciler::{BackoffState, ReconcilerError};
use component_operator::controller::store::StoreError;
use std::collections::HashMap;

#[test]
fn test_backoff_calculation_fibonacci_sequence() {
    let mut backoff = FibonacciBackoff::new(1, 300);
    let sequence: Vec<u64> = (0..12).map(|_| backoff.next_backoff_seconds()).collect();
    assert_eq!(sequence, vec![1, 1, 2, 3, 5, 8, 13, 21, 34, 55, 89, 144]);
}

#[test]
fn test_backoff_caps_at_max() {
    let mut backoff = FibonacciBackoff::new(1, 10);
    let last = (0..20).map(|_| backoff.next_backoff_seconds()).last();
    assert_eq!(last, Some(10));
}

#[test]
fn test_backoff_state_reset_restarts_sequence() {
    let mut state = BackoffState::new(2, 60);
    state.increment_error();
    state.increment_error();
    assert_eq!(state.backoff.next_backoff_seconds(), 2);
    assert_eq!(state.backoff.next_backoff_seconds(), 2);
    assert_eq!(state.error_count, 2);

    state.reset();
    assert_eq!(state.error_count, 0);
    assert_eq!(state.backoff.next_backoff_seconds(), 2);
}

#[test]
fn test_error_classification() {
    let permanent = [
        ReconcilerError::InvalidDeclaration(NormalizeError::InvalidChildName {
            name: "Bad_Name".into(),
        }),
        ReconcilerError::UnsupportedKind("Pod".into()),
        ReconcilerError::MissingMetadata {
            kind: "Component".into(),
            field: "namespace",
        },
        ReconcilerError::Store(StoreError::Serialization("bad".into())),
    ];
    for error in &permanent {
        assert!(!error.is_retryable(), "{error} should be permanent");
    }

    let retryable = [
        ReconcilerError::ComponentNotFound {
            namespace: "ns".into(),
            name: "pc".into(),
        },
        ReconcilerError::PartialFailure {
            failed: 2,
            first: "create pc-catalog-v4".into(),
        },
        ReconcilerError::Store(StoreError::Conflict {
            kind: "Component".into(),
            name: "pc".into(),
            message: "stale resourceVersion".into(),
        }),
        ReconcilerError::Store(StoreError::Transport("connection reset".into())),
    ];
    for error in &retryable {
        assert!(error.is_retryable(), "{error} should be retried");
    }
}

#[test]
fn test_error_class_labels() {
    assert_eq!(ReconcilerError::UnsupportedKind("Pod".into()).class(), "unsupported_kind");
    assert_eq!(
        ReconcilerError::Store(StoreError::NotFound {
            kind: "ExposedAPI".into(),
            name: "x".into(),
        })
        .class(),
        "not_found"
    );
}

#[test]
fn test_config_from_lookup_parses_and_falls_back() {
    let env: HashMap<&str, &str> = HashMap::from([
        ("WATCH_NAMESPACE", "components"),
        ("BACKOFF_MAX_SECS", "120"),
        ("RETRY_BUDGET", "not-a-number"),
        ("COMPONENT_NAME_LABEL", ""),
    ]);
    let config = ControllerConfig::from_lookup(|key| env.get(key).map(|v| (*v).to_string()));
    let defaults = ControllerConfig::default();

    assert_eq!(config.watch_namespace.as_deref(), Some("components"));
    assert_eq!(config.backoff_max_secs, 120);
    assert_eq!(config.retry_budget, defaults.retry_budget);
    assert_eq!(config.component_name_label, "oda.tmforum.org/componentName");
    assert_eq!(config.config_map_name, None);
}
