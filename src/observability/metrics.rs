//! # Metrics
//!
//! Prometheus metrics for monitoring the operator.
//!
//! ## Metrics Exposed
//!
//! - `component_operator_reconciliations_total{handler}` - Handler invocations
//! - `component_operator_reconciliation_errors_total{handler,class}` - Handler failures by error class
//! - `component_operator_reconciliation_duration_seconds{handler}` - Handler duration
//! - `component_operator_child_operations_total{kind,verb}` - Create/patch/delete calls against children
//! - `component_operator_adoptions_total{kind}` - Owner references attached to adopted resources
//! - `component_operator_status_propagations_total{source,outcome}` - Child-to-parent status propagations
//! - `component_operator_requeues_total{reason}` - Requeues scheduled by the error policy

use anyhow::Result;
use prometheus::{HistogramVec, IntCounterVec, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "component_operator_reconciliations_total",
            "Total number of handler invocations",
        ),
        &["handler"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "component_operator_reconciliation_errors_total",
            "Total number of handler failures by error class",
        ),
        &["handler", "class"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "component_operator_reconciliation_duration_seconds",
            "Duration of handler invocations in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
        &["handler"],
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static CHILD_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "component_operator_child_operations_total",
            "Total number of write operations against child resources",
        ),
        &["kind", "verb"],
    )
    .expect("Failed to create CHILD_OPERATIONS_TOTAL metric - this should never happen")
});

static ADOPTIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "component_operator_adoptions_total",
            "Total number of resources adopted by a Component",
        ),
        &["kind"],
    )
    .expect("Failed to create ADOPTIONS_TOTAL metric - this should never happen")
});

static STATUS_PROPAGATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "component_operator_status_propagations_total",
            "Total number of child status propagations by outcome",
        ),
        &["source", "outcome"],
    )
    .expect("Failed to create STATUS_PROPAGATIONS_TOTAL metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "component_operator_requeues_total",
            "Total number of requeues scheduled by the error policy",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(CHILD_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ADOPTIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STATUS_PROPAGATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;

    Ok(())
}

pub fn increment_reconciliations(handler: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[handler]).inc();
}

pub fn increment_reconciliation_errors(handler: &str, class: &str) {
    RECONCILIATION_ERRORS_TOTAL
        .with_label_values(&[handler, class])
        .inc();
}

pub fn observe_reconciliation_duration(handler: &str, duration: f64) {
    RECONCILIATION_DURATION
        .with_label_values(&[handler])
        .observe(duration);
}

pub fn increment_child_operations(kind: &str, verb: &str) {
    CHILD_OPERATIONS_TOTAL.with_label_values(&[kind, verb]).inc();
}

pub fn increment_adoptions(kind: &str) {
    ADOPTIONS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_status_propagations(source: &str, outcome: &str) {
    STATUS_PROPAGATIONS_TOTAL
        .with_label_values(&[source, outcome])
        .inc();
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_child_operations() {
        let before = CHILD_OPERATIONS_TOTAL
            .with_label_values(&["ExposedAPI", "create"])
            .get();
        increment_child_operations("ExposedAPI", "create");
        let after = CHILD_OPERATIONS_TOTAL
            .with_label_values(&["ExposedAPI", "create"])
            .get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_increment_status_propagations() {
        let before = STATUS_PROPAGATIONS_TOTAL
            .with_label_values(&["DependentAPI", "unchanged"])
            .get();
        increment_status_propagations("DependentAPI", "unchanged");
        let after = STATUS_PROPAGATIONS_TOTAL
            .with_label_values(&["DependentAPI", "unchanged"])
            .get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_observe_reconciliation_duration() {
        observe_reconciliation_duration("adopter", 0.02);
        // Just verify it doesn't panic
    }
}
