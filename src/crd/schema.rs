//! # Schema Helpers
//!
//! Structural-schema overrides for free-form passthrough fields.
//!
//! kube-rs cannot express "any JSON" in a structural schema, so these fields are
//! emitted with `x-kubernetes-preserve-unknown-fields` and interpreted (if at
//! all) by the external adapters.

use schemars::{json_schema, Schema, SchemaGenerator};

/// Optional free-form object (e.g. `gatewayConfiguration`, `sidecar`)
pub fn preserve_unknown_object(_gen: &mut SchemaGenerator) -> Schema {
    json_schema!({
        "type": "object",
        "nullable": true,
        "x-kubernetes-preserve-unknown-fields": true
    })
}

/// Optional list of free-form items (e.g. `resources`)
pub fn preserve_unknown_list(_gen: &mut SchemaGenerator) -> Schema {
    json_schema!({
        "type": "array",
        "nullable": true,
        "items": {
            "x-kubernetes-preserve-unknown-fields": true
        }
    })
}
