//! Entity transcoding
//!
//! An entity is `id` + `type` + a map of attributes; everything except the
//! identity keys goes through the attribute transcoder, with the pick/omit
//! projection applied first.

use serde_json::{json, Map, Value};

use ngsi_core::constants::{DATETIME_DEFAULT, URN_PREFIX};
use ngsi_core::{TransformFlags, VersionContext};

use crate::attribute;

/// Converts a backend entity to the gateway dialect.
pub fn v2_to_ld(
    entity: &Value,
    jsonld: bool,
    flags: &TransformFlags,
    vctx: &VersionContext,
    user_context: &str,
) -> Value {
    let src = match entity.as_object() {
        Some(src) => src,
        None => return entity.clone(),
    };
    let entity_type = src.get("type").and_then(Value::as_str).unwrap_or_default();

    let mut obj = Map::new();
    if jsonld {
        obj.insert("@context".to_string(), json!(user_context));
    }

    let mut modified_candidates = Vec::new();
    let mut created_candidates = Vec::new();

    for (key, value) in src {
        match key.as_str() {
            "id" => {
                let id = value.as_str().unwrap_or_default();
                let id = if id.starts_with(URN_PREFIX) {
                    id.to_string()
                } else {
                    let urn = format!("{URN_PREFIX}{entity_type}:{id}");
                    tracing::debug!(id = %urn, "Amending id to a valid URN");
                    urn
                };
                obj.insert("id".to_string(), json!(id));
            }
            "type" => {
                obj.insert("type".to_string(), value.clone());
            }
            // Internal timestamp carrier, not a real attribute
            "TimeInstant" => {}
            _ => {
                if !flags.keeps(key) {
                    continue;
                }
                if let Some(attr) = attribute::from_v2(value) {
                    if flags.sys_attrs {
                        if let Some(ts) = &attr.modified_at {
                            modified_candidates.push(ts.clone());
                        }
                        if let Some(ts) = &attr.created_at {
                            created_candidates.push(ts.clone());
                        }
                    }
                    obj.insert(key.clone(), attribute::render_ld(&attr, flags, vctx));
                }
            }
        }
    }

    if flags.sys_attrs {
        let modified = modified_candidates
            .into_iter()
            .max()
            .unwrap_or_else(|| DATETIME_DEFAULT.to_string());
        let created = created_candidates
            .into_iter()
            .min()
            .unwrap_or_else(|| DATETIME_DEFAULT.to_string());
        obj.insert("modifiedAt".to_string(), json!(modified));
        obj.insert("createdAt".to_string(), json!(created));
    }

    Value::Object(obj)
}

/// Converts a gateway entity to the backend dialect.
pub fn ld_to_v2(entity: &Value, flags: &TransformFlags, include_value_type: bool) -> Value {
    let src = match entity.as_object() {
        Some(src) => src,
        None => return entity.clone(),
    };

    let mut obj = Map::new();
    for (key, value) in src {
        if !flags.keeps(key) {
            continue;
        }
        match key.as_str() {
            "id" | "type" => {
                obj.insert(key.clone(), value.clone());
            }
            // Context is never a root element on the backend side
            "@context" => {}
            "expiresAt" => {
                obj.insert(
                    "dateExpires".to_string(),
                    json!({ "type": "DateTime", "value": value, "metadata": {} }),
                );
            }
            _ => {
                obj.insert(key.clone(), attribute::ld_to_v2(value, include_value_type));
            }
        }
    }
    Value::Object(obj)
}

/// Re-expands a possibly concise gateway entity into its normalized form.
///
/// Used to align a merge patch with the normalized representation of the
/// current entity before the two are merged.
pub fn normalize(entity: &Value, vctx: &VersionContext) -> Value {
    let src = match entity.as_object() {
        Some(src) => src,
        None => return entity.clone(),
    };
    let flags = TransformFlags::default();

    let mut obj = Map::new();
    for (key, value) in src {
        match key.as_str() {
            "id" | "type" | "scope" | "@context" => {
                obj.insert(key.clone(), value.clone());
            }
            _ => {
                let attr = attribute::from_ld(value);
                obj.insert(key.clone(), attribute::render_ld(&attr, &flags, vctx));
            }
        }
    }
    Value::Object(obj)
}
