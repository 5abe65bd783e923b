//! # Watch Dispatch
//!
//! Static table of `(kind, optional field path) -> handler` routes, plus the
//! field cache that decides which handlers an incoming object actually needs.
//!
//! A handler runs when any of its routed fields differs from the value it last
//! handled successfully, or unconditionally when it has a route without a field
//! path. Values are recorded only after the handler succeeds, so a failed
//! handler runs again on retry.

use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

/// Watched resource kind a route applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteTarget {
    Component,
    ExposedApi,
    DependentApi,
    SecretsManagement,
    IdentityConfig,
    /// Any labelled resource of an adoptable kind
    Adoptable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handler {
    SegmentReconciler,
    StatusAggregator,
    ExposedPropagator,
    DependentPropagator,
    SecretsPropagator,
    IdentityPropagator,
    Adopter,
}

impl Handler {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Handler::SegmentReconciler => "segment_reconciler",
            Handler::StatusAggregator => "status_aggregator",
            Handler::ExposedPropagator => "exposed_propagator",
            Handler::DependentPropagator => "dependent_propagator",
            Handler::SecretsPropagator => "secrets_propagator",
            Handler::IdentityPropagator => "identity_propagator",
            Handler::Adopter => "adopter",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WatchRoute {
    pub target: RouteTarget,
    /// JSON pointer into the object; `None` runs on every event
    pub field: Option<&'static str>,
    pub handler: Handler,
}

pub static ROUTES: &[WatchRoute] = &[
    WatchRoute {
        target: RouteTarget::Component,
        field: Some("/spec"),
        handler: Handler::SegmentReconciler,
    },
    WatchRoute {
        target: RouteTarget::Component,
        field: Some("/status"),
        handler: Handler::StatusAggregator,
    },
    WatchRoute {
        target: RouteTarget::ExposedApi,
        field: Some("/status/apiStatus"),
        handler: Handler::ExposedPropagator,
    },
    WatchRoute {
        target: RouteTarget::ExposedApi,
        field: Some("/status/implementation/ready"),
        handler: Handler::ExposedPropagator,
    },
    WatchRoute {
        target: RouteTarget::DependentApi,
        field: Some("/status/implementation/ready"),
        handler: Handler::DependentPropagator,
    },
    WatchRoute {
        target: RouteTarget::DependentApi,
        field: Some("/status/url"),
        handler: Handler::DependentPropagator,
    },
    WatchRoute {
        target: RouteTarget::SecretsManagement,
        field: Some("/status/implementation/ready"),
        handler: Handler::SecretsPropagator,
    },
    WatchRoute {
        target: RouteTarget::IdentityConfig,
        field: Some("/status"),
        handler: Handler::IdentityPropagator,
    },
    WatchRoute {
        target: RouteTarget::Adoptable,
        field: None,
        handler: Handler::Adopter,
    },
];

fn fingerprint(value: Option<&Value>) -> u64 {
    let mut hasher = DefaultHasher::new();
    match value {
        Some(v) => v.to_string().hash(&mut hasher),
        None => "<absent>".hash(&mut hasher),
    }
    hasher.finish()
}

/// Last successfully handled field values, per object
///
/// Process-local: after a restart every handler runs once. Objects deleted
/// without a finalizer never reach `forget`; the watch loops call
/// [`FieldCache::retain_live`] with their reflector contents instead.
#[derive(Debug, Default)]
pub struct FieldCache {
    entries: Mutex<HashMap<(String, &'static str), u64>>,
}

impl FieldCache {
    /// Work out which handlers must run for `object`
    #[must_use]
    pub fn plan(&self, target: RouteTarget, object_key: &str, object: &Value) -> DispatchPlan {
        let entries = self.entries.lock().ok();
        let mut plan = DispatchPlan {
            object_key: object_key.to_string(),
            handlers: Vec::new(),
            pending: Vec::new(),
        };

        for route in ROUTES.iter().filter(|r| r.target == target) {
            let changed = match route.field {
                None => true,
                Some(field) => {
                    let current = fingerprint(object.pointer(field));
                    plan.pending.push((route.handler, field, current));
                    entries
                        .as_ref()
                        .and_then(|e| e.get(&(object_key.to_string(), field)))
                        != Some(&current)
                }
            };
            if changed && !plan.handlers.contains(&route.handler) {
                plan.handlers.push(route.handler);
            }
        }
        plan
    }

    /// Drop everything recorded for an object
    pub fn forget(&self, object_key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|(key, _), _| key != object_key);
        }
    }

    /// Drop entries of `kind` objects whose key is not in `live`
    ///
    /// Returns the number of fields dropped.
    pub fn retain_live(&self, kind: &str, live: &HashSet<String>) -> usize {
        let prefix = format!("{kind}/");
        let Ok(mut entries) = self.entries.lock() else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|(key, _), _| !key.starts_with(&prefix) || live.contains(key));
        before - entries.len()
    }
}

/// Handlers selected for one object event, plus the field values they saw
#[derive(Debug, Clone)]
pub struct DispatchPlan {
    object_key: String,
    handlers: Vec<Handler>,
    pending: Vec<(Handler, &'static str, u64)>,
}

impl DispatchPlan {
    #[must_use]
    pub fn runs(&self, handler: Handler) -> bool {
        self.handlers.contains(&handler)
    }

    #[must_use]
    pub fn handlers(&self) -> &[Handler] {
        &self.handlers
    }

    /// Record the field values `handler` just handled successfully
    pub fn commit(&self, cache: &FieldCache, handler: Handler) {
        if let Ok(mut entries) = cache.entries.lock() {
            for (h, field, value) in &self.pending {
                if *h == handler {
                    entries.insert((self.object_key.clone(), field), *value);
                }
            }
        }
    }
}
