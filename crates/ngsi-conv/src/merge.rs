//! Merge-patch support
//!
//! Merging happens on the gateway-dialect representation: the current
//! entity is fetched and converted, the (normalized) patch is merged over
//! it, and `urn:ngsi-ld:null` markers delete whole attributes or single
//! sub-attributes.

use serde_json::Value;

use ngsi_core::constants::NULL_URN;

/// Recursively merges `patch` into `target`.
///
/// Objects merge key-wise, arrays element-wise with extra elements
/// appended, everything else replaces.
pub fn deep_merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target_map), Value::Object(patch_map)) => {
            for (key, patch_value) in patch_map {
                match target_map.get_mut(key) {
                    Some(slot) => deep_merge(slot, patch_value),
                    None => {
                        target_map.insert(key.clone(), patch_value.clone());
                    }
                }
            }
        }
        (Value::Array(target_items), Value::Array(patch_items)) => {
            for (i, patch_value) in patch_items.iter().enumerate() {
                if i < target_items.len() {
                    deep_merge(&mut target_items[i], patch_value);
                } else {
                    target_items.push(patch_value.clone());
                }
            }
        }
        (slot, patch_value) => *slot = patch_value.clone(),
    }
}

/// Strips the null-URN markers out of a patch before it is normalized and
/// merged, so the markers never land in the merged entity. Attribute
/// objects left empty by the stripping are dropped entirely.
pub fn strip_null_markers(patch: &Value) -> Value {
    let Some(patch_map) = patch.as_object() else {
        return patch.clone();
    };
    let mut stripped = serde_json::Map::new();
    for (key, value) in patch_map {
        if value.as_str() == Some(NULL_URN) {
            continue;
        }
        if let Some(sub) = value.as_object() {
            let kept: serde_json::Map<String, Value> = sub
                .iter()
                .filter(|(_, v)| v.as_str() != Some(NULL_URN))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            if kept.is_empty() && !sub.is_empty() {
                continue;
            }
            stripped.insert(key.clone(), Value::Object(kept));
        } else {
            stripped.insert(key.clone(), value.clone());
        }
    }
    Value::Object(stripped)
}

/// Removes every field the original patch marked with the null URN.
///
/// The markers apply at the attribute level and one level below it
/// (sub-attribute deletion); the patch passed here is the raw client body,
/// not the normalized one.
pub fn apply_null_deletions(merged: &mut Value, patch: &Value) {
    let (Some(merged_map), Some(patch_map)) = (merged.as_object_mut(), patch.as_object()) else {
        return;
    };
    for (key, patch_value) in patch_map {
        if patch_value.as_str() == Some(NULL_URN) {
            merged_map.remove(key);
        } else if let Some(sub_patch) = patch_value.as_object() {
            if let Some(slot) = merged_map.get_mut(key).and_then(Value::as_object_mut) {
                for (sub_key, sub_value) in sub_patch {
                    if sub_value.as_str() == Some(NULL_URN) {
                        slot.remove(sub_key);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn merge_overlays_and_preserves() {
        let mut entity = json!({
            "id": "urn:ngsi-ld:T:1",
            "type": "T",
            "temperature": { "type": "Property", "value": 21.5, "unitCode": "CEL" },
            "status": { "type": "Property", "value": "ok" }
        });
        let patch = json!({
            "temperature": { "type": "Property", "value": 25.0 }
        });
        deep_merge(&mut entity, &patch);
        assert_eq!(entity["temperature"]["value"], json!(25.0));
        assert_eq!(entity["temperature"]["unitCode"], json!("CEL"));
        assert_eq!(entity["status"]["value"], json!("ok"));
    }

    #[test]
    fn null_urn_deletes_a_whole_attribute() {
        let mut merged = json!({
            "id": "urn:ngsi-ld:T:1",
            "type": "T",
            "status": { "type": "Property", "value": "ok" }
        });
        let patch = json!({ "status": "urn:ngsi-ld:null" });
        apply_null_deletions(&mut merged, &patch);
        assert!(merged.get("status").is_none());
    }

    #[test]
    fn markers_are_stripped_from_the_patch() {
        let patch = json!({
            "status": "urn:ngsi-ld:null",
            "temperature": { "value": 25.0, "unitCode": "urn:ngsi-ld:null" },
            "humidity": { "unitCode": "urn:ngsi-ld:null" }
        });
        let stripped = strip_null_markers(&patch);
        assert!(stripped.get("status").is_none());
        assert_eq!(stripped["temperature"], json!({ "value": 25.0 }));
        assert!(stripped.get("humidity").is_none(), "empty after stripping");
    }

    #[test]
    fn null_urn_deletes_a_sub_attribute() {
        let mut merged = json!({
            "temperature": { "type": "Property", "value": 21.5, "unitCode": "CEL" }
        });
        let patch = json!({ "temperature": { "unitCode": "urn:ngsi-ld:null" } });
        apply_null_deletions(&mut merged, &patch);
        assert_eq!(merged["temperature"], json!({ "type": "Property", "value": 21.5 }));
    }
}
