//! # Error Policy
//!
//! Error handling and backoff logic for the controller watch loops.
//!
//! Retryable handler errors are requeued with a per-object Fibonacci backoff
//! until the retry budget is spent. Permanent errors are never requeued; the
//! object waits for its next change.

use crate::config::ControllerConfig;
use crate::controller::reconciler::{resource_key, BackoffState, Reconciler, ReconcilerError};
use crate::controller::store::Store;
use crate::observability::metrics;
use kube::Resource;
use kube_runtime::controller::{self, Action};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Backoff used when the per-object state cannot be reached
const FALLBACK_BACKOFF_SECS: u64 = 60;

/// Decide what happens to an object after its handler failed
pub fn handle_reconciliation_error<K, S>(
    obj: Arc<K>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler<S>>,
) -> Action
where
    K: Resource<DynamicType = ()>,
    S: Store,
{
    let kind = K::kind(&());
    let name = obj.meta().name.as_deref().unwrap_or("unknown");
    let namespace = obj.meta().namespace.as_deref().unwrap_or("default");

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.kind = &*kind,
        resource.name = name,
        resource.namespace = namespace,
        error.class = error.class(),
        error = %error
    );
    let _error_guard = error_span.enter();

    metrics::increment_reconciliation_errors(&kind, error.class());

    if !error.is_retryable() {
        error!("Permanent error for {} {}/{}: {}", kind, namespace, name, error);
        info!("Not retrying; waiting for the object to change");
        return Action::await_change();
    }
    warn!("Reconciliation error for {} {}/{}: {}", kind, namespace, name, error);

    // Config may be mid-reload; the defaults are good enough for one decision
    let (min_secs, max_secs, budget) = match ctx.config.try_read() {
        Ok(config) => (config.backoff_min_secs, config.backoff_max_secs, config.retry_budget),
        Err(_) => {
            let defaults = ControllerConfig::default();
            (defaults.backoff_min_secs, defaults.backoff_max_secs, defaults.retry_budget)
        }
    };

    let key = resource_key(&kind, namespace, name);
    let decision = match ctx.backoff_states.lock() {
        Ok(mut states) => {
            let state = states
                .entry(key)
                .or_insert_with(|| BackoffState::new(min_secs, max_secs));
            state.increment_error();
            if state.error_count > budget {
                // the next change starts with a full budget
                state.reset();
                None
            } else {
                Some((state.backoff.next_backoff_seconds(), state.error_count))
            }
        }
        Err(e) => {
            warn!("Failed to lock backoff_states: {}, using default backoff", e);
            Some((FALLBACK_BACKOFF_SECS, 0))
        }
    };

    let Some((backoff_seconds, error_count)) = decision else {
        error!(
            "Retry budget of {} exhausted for {} {}/{}, waiting for the object to change",
            budget, kind, namespace, name
        );
        metrics::increment_requeues_total("budget-exhausted");
        return Action::await_change();
    };

    let next_trigger_time = chrono::Utc::now()
        + chrono::Duration::seconds(i64::try_from(backoff_seconds).unwrap_or(i64::MAX));
    info!(
        "Retrying with Fibonacci backoff: {}s (error count: {}/{}, next attempt {})",
        backoff_seconds,
        error_count,
        budget,
        next_trigger_time.to_rfc3339()
    );

    metrics::increment_requeues_total(error.class());
    Action::requeue(Duration::from_secs(backoff_seconds))
}

/// A controller stream error raised by a handler rather than by the watch
///
/// These were already requeued by [`handle_reconciliation_error`]; only the
/// remaining errors belong to [`handle_watch_stream_error`].
#[must_use]
pub fn is_reconciler_failure<R, Q>(error: &controller::Error<R, Q>) -> bool {
    matches!(error, controller::Error::ReconcilerFailed(..))
}

/// Handle watch stream errors with appropriate classification and backoff
///
/// Returns `None` to filter the error out and let the watch restart, or
/// `Some(())` to keep consuming the stream.
pub async fn handle_watch_stream_error(
    kind: &str,
    error_string: &str,
    backoff: &Arc<AtomicU64>,
    max_backoff_ms: u64,
    watch_restart_delay_secs: u64,
) -> Option<()> {
    let error_span = tracing::span!(
        tracing::Level::WARN,
        "controller.watch.error",
        resource.kind = kind,
        error = %error_string
    );
    let _error_guard = error_span.enter();

    // 404 first: a plain-text 404 body surfaces as a serde error mentioning WatchFailed
    let is_not_found = error_string.contains("ObjectNotFound")
        || error_string.contains("404")
        || error_string.contains("not found");
    let is_401 =
        (error_string.contains("401") || error_string.contains("Unauthorized")) && !is_not_found;
    let is_410 = error_string.contains("410")
        || error_string.contains("too old resource version")
        || error_string.contains("Expired")
        || error_string.contains("Gone");
    let is_429 = error_string.contains("429")
        || error_string.contains("storage is (re)initializing")
        || error_string.contains("TooManyRequests");

    if is_401 {
        error!("Watch on {} failed with 401 Unauthorized; RBAC may have been revoked or the token expired", kind);
        error!("Diagnostics:");
        error!("   1. kubectl get clusterrole component-operator");
        error!("   2. kubectl get clusterrolebinding component-operator -o yaml");
        error!(
            "   3. kubectl auth can-i watch {} --as=system:serviceaccount:<namespace>:component-operator --all-namespaces",
            kind.to_lowercase()
        );
        error!("   4. If RBAC was recently changed, restart the operator pod");
        warn!(
            "Waiting {}s before retrying watch (RBAC may need time to propagate)...",
            watch_restart_delay_secs
        );
        tokio::time::sleep(Duration::from_secs(watch_restart_delay_secs)).await;
        None
    } else if is_410 {
        warn!("Watch resource version for {} expired (410), watch will restart", kind);
        warn!(error_type = "410", "watch.error.resource_version_expired");
        None
    } else if is_429 {
        let current_backoff = backoff.load(Ordering::Relaxed);
        warn!(
            "API server storage reinitializing (429), backing off for {}ms before restart...",
            current_backoff
        );
        tokio::time::sleep(Duration::from_millis(current_backoff)).await;
        backoff.store(
            current_backoff.saturating_mul(2).min(max_backoff_ms),
            Ordering::Relaxed,
        );
        None
    } else if is_not_found {
        let resource_info = if error_string.contains("integer `404`") {
            "CRD may be missing (404 returned as plain text)"
        } else {
            "Resource"
        };
        warn!(
            "{} not found (404) while watching {}; normal for deleted objects, otherwise check the CRD is installed. Error: {}",
            resource_info, kind, error_string
        );
        Some(())
    } else {
        error!("Controller stream error for {}: {}", kind, error_string);
        tokio::time::sleep(Duration::from_secs(watch_restart_delay_secs)).await;
        None
    }
}
