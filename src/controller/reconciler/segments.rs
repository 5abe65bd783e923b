//! # Segment Reconciler
//!
//! Converges the live ExposedAPI/DependentAPI children of one segment to the
//! desired set, reusing unchanged children.
//!
//! Order within one pass:
//! 1. every previous status entry: delete if no longer desired, otherwise
//!    re-verify the live child and patch its spec only if it differs
//! 2. every desired child not matched above: create
//!
//! A failing call is recorded and the remaining entries are still processed.

use crate::controller::naming::DesiredChild;
use crate::controller::reconciler::children::ApiChild;
use crate::controller::reconciler::patch::merge_diff;
use crate::controller::segment::Segment;
use crate::controller::store::{Store, StoreError};
use crate::crd::ApiStatusEntry;
use crate::observability::metrics;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

/// One child call that failed during a pass
#[derive(Debug, Clone, PartialEq)]
pub struct ChildFailure {
    pub name: String,
    pub verb: &'static str,
    pub error: StoreError,
}

/// Result of reconciling one segment and API kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentOutcome {
    /// New value of the segment's status list
    pub entries: Vec<ApiStatusEntry>,
    pub failures: Vec<ChildFailure>,
}

/// Everything a segment pass needs to know about the parent Component
#[derive(Debug, Clone)]
pub struct SegmentParent<'a> {
    pub namespace: &'a str,
    pub component: &'a str,
    pub owner: OwnerReference,
    pub component_name_label: &'a str,
}

impl SegmentParent<'_> {
    pub(crate) fn owns<K: kube::Resource>(&self, obj: &K) -> bool {
        obj.meta()
            .owner_references
            .iter()
            .flatten()
            .any(|o| o.uid == self.owner.uid)
    }

    fn labels(&self, segment: Segment) -> BTreeMap<String, String> {
        BTreeMap::from([
            (
                self.component_name_label.to_string(),
                self.component.to_string(),
            ),
            (
                crate::constants::SEGMENT_LABEL.to_string(),
                segment.spec_key().to_string(),
            ),
        ])
    }
}

fn new_entry<C: ApiChild>(name: &str, child: &C) -> ApiStatusEntry {
    ApiStatusEntry {
        name: name.to_string(),
        uid: child.meta().uid.clone().unwrap_or_default(),
        ready: false,
        url: None,
        developer_ui: None,
    }
}

async fn patch_spec<S: Store, C: ApiChild>(
    store: &S,
    namespace: &str,
    live: &C,
    desired: &C::Spec,
) -> Result<Option<C>, StoreError> {
    if live.spec() == desired {
        return Ok(None);
    }
    let name = live.meta().name.clone().unwrap_or_default();
    let have = serde_json::to_value(live.spec())?;
    let want = serde_json::to_value(desired)?;
    let Some(diff) = merge_diff(&have, &want) else {
        return Ok(None);
    };
    let patched = store
        .patch::<C>(namespace, &name, &json!({ "spec": diff }))
        .await?;
    metrics::increment_child_operations(&C::kind(&()), "patch");
    Ok(Some(patched))
}

/// Reconcile one segment's children of kind `C`
pub async fn reconcile_segment<S: Store, C: ApiChild>(
    store: &S,
    parent: &SegmentParent<'_>,
    segment: Segment,
    desired: &[DesiredChild],
    previous: &[ApiStatusEntry],
) -> SegmentOutcome {
    let kind = C::kind(&()).to_string();
    let status_key = segment.status_key(C::KIND);
    let mut outcome = SegmentOutcome::default();
    let mut matched: HashSet<&str> = HashSet::new();

    for entry in previous {
        let Some(want) = desired.iter().find(|d| d.name == entry.name) else {
            match store.delete::<C>(parent.namespace, &entry.name).await {
                Ok(()) => {
                    metrics::increment_child_operations(&kind, "delete");
                    info!(child = entry.name.as_str(), segment = status_key, "Deleted {}", kind);
                }
                Err(e) if e.is_not_found() => {
                    debug!(child = entry.name.as_str(), "Child already gone");
                }
                Err(e) => {
                    warn!(child = entry.name.as_str(), error = %e, "Failed to delete {}", kind);
                    outcome.entries.push(entry.clone());
                    outcome.failures.push(ChildFailure {
                        name: entry.name.clone(),
                        verb: "delete",
                        error: e,
                    });
                }
            }
            continue;
        };

        if !matched.insert(want.name.as_str()) {
            // duplicate status entry for the same child
            continue;
        }

        let spec = C::desired_spec(want);
        match store.get_opt::<C>(parent.namespace, &want.name).await {
            Ok(Some(live)) => {
                let mut kept = entry.clone();
                let live_uid = live.meta().uid.clone().unwrap_or_default();
                if kept.uid != live_uid {
                    // recreated out of band: readiness belongs to the old object
                    kept = new_entry(&want.name, &live);
                }
                if let Err(e) = patch_spec::<S, C>(store, parent.namespace, &live, &spec).await {
                    warn!(child = want.name.as_str(), error = %e, "Failed to patch {}", kind);
                    outcome.failures.push(ChildFailure {
                        name: want.name.clone(),
                        verb: "patch",
                        error: e,
                    });
                }
                outcome.entries.push(kept);
            }
            Ok(None) => {
                let child = C::build(want, parent.labels(segment), parent.owner.clone());
                match store.create::<C>(parent.namespace, &child).await {
                    Ok(created) => {
                        metrics::increment_child_operations(&kind, "create");
                        info!(child = want.name.as_str(), "Recreated missing {}", kind);
                        outcome.entries.push(new_entry(&want.name, &created));
                    }
                    Err(e) => {
                        warn!(child = want.name.as_str(), error = %e, "Failed to recreate {}", kind);
                        outcome.failures.push(ChildFailure {
                            name: want.name.clone(),
                            verb: "create",
                            error: e,
                        });
                    }
                }
            }
            Err(e) => {
                outcome.entries.push(entry.clone());
                outcome.failures.push(ChildFailure {
                    name: want.name.clone(),
                    verb: "get",
                    error: e,
                });
            }
        }
    }

    for want in desired {
        if matched.contains(want.name.as_str()) {
            continue;
        }
        matched.insert(want.name.as_str());

        let child = C::build(want, parent.labels(segment), parent.owner.clone());
        match store.create::<C>(parent.namespace, &child).await {
            Ok(created) => {
                metrics::increment_child_operations(&kind, "create");
                info!(child = want.name.as_str(), segment = status_key, "Created {}", kind);
                outcome.entries.push(new_entry(&want.name, &created));
            }
            Err(StoreError::AlreadyExists { kind: k, name: n }) => {
                let claimed = match store.get_opt::<C>(parent.namespace, &want.name).await {
                    // ours from a pass whose status write was lost, or any dependent
                    Ok(Some(live)) if C::PATCH_ON_CONFLICT || parent.owns(&live) => {
                        if parent.owns(&live) {
                            debug!(child = want.name.as_str(), "{} exists, patching instead", kind);
                        } else {
                            warn!(
                                child = want.name.as_str(),
                                component = parent.component,
                                "{} is owned by another Component, patching anyway",
                                kind
                            );
                        }
                        let spec = C::desired_spec(want);
                        patch_spec::<S, C>(store, parent.namespace, &live, &spec)
                            .await
                            .map(|patched| patched.unwrap_or(live))
                    }
                    Ok(_) => Err(StoreError::AlreadyExists { kind: k, name: n }),
                    Err(e) => Err(e),
                };
                match claimed {
                    Ok(live) => outcome.entries.push(new_entry(&want.name, &live)),
                    Err(e) => {
                        warn!(child = want.name.as_str(), error = %e, "Failed to create {}", kind);
                        outcome.failures.push(ChildFailure {
                            name: want.name.clone(),
                            verb: "create",
                            error: e,
                        });
                    }
                }
            }
            Err(e) => {
                warn!(child = want.name.as_str(), error = %e, "Failed to create {}", kind);
                outcome.failures.push(ChildFailure {
                    name: want.name.clone(),
                    verb: "create",
                    error: e,
                });
            }
        }
    }

    outcome
}
