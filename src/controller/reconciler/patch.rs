//! # Merge Patch Diff
//!
//! Builds the smallest JSON merge patch (RFC 7386) that turns one document into
//! another. Keys missing from the desired document become `null` so removals
//! reach the server.

use serde_json::{Map, Value};

/// Merge patch turning `live` into `desired`, or `None` when they are equal
#[must_use]
pub fn merge_diff(live: &Value, desired: &Value) -> Option<Value> {
    if live == desired {
        return None;
    }
    match (live, desired) {
        (Value::Object(live), Value::Object(desired)) => {
            let mut patch = Map::new();
            for (key, want) in desired {
                match live.get(key) {
                    Some(have) => {
                        if let Some(child) = merge_diff(have, want) {
                            patch.insert(key.clone(), child);
                        }
                    }
                    None => {
                        patch.insert(key.clone(), want.clone());
                    }
                }
            }
            for key in live.keys() {
                if !desired.contains_key(key) {
                    patch.insert(key.clone(), Value::Null);
                }
            }
            Some(Value::Object(patch))
        }
        _ => Some(desired.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_equal_documents_produce_no_patch() {
        let doc = json!({"a": [1, 2], "b": {"c": true}});
        assert_eq!(merge_diff(&doc, &doc), None);
    }

    #[test]
    fn test_nested_change_and_removal() {
        let live = json!({"a": 1, "b": {"c": true, "d": "x"}, "e": [1]});
        let desired = json!({"a": 1, "b": {"c": false}, "f": "new"});
        let patch = merge_diff(&live, &desired).unwrap();
        assert_eq!(
            patch,
            json!({"b": {"c": false, "d": null}, "e": null, "f": "new"})
        );

        let mut applied = live.clone();
        json_patch::merge(&mut applied, &patch);
        assert_eq!(applied, desired);
    }

    #[test]
    fn test_arrays_are_replaced_whole() {
        let live = json!({"list": [{"name": "a"}, {"name": "b"}]});
        let desired = json!({"list": [{"name": "a"}]});
        assert_eq!(
            merge_diff(&live, &desired),
            Some(json!({"list": [{"name": "a"}]}))
        );
    }
}
