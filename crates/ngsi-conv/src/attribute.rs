//! Attribute transcoding
//!
//! Backend attributes are flat `{type, value, metadata}` triples; gateway
//! attributes are typed nodes (`Property`, `Relationship`, `GeoProperty`,
//! list/language/vocabulary kinds). Both directions parse into the
//! [`Attribute`] intermediate and render out of it, so the representation
//! flags and version gates apply in exactly one place per direction.

use serde_json::{json, Map, Value};

use ngsi_core::constants::{is_geo_tag, DATETIME_DEFAULT, GEOJSON_TYPES};
use ngsi_core::{
    Attribute, AttributePayload, MetadataAttribute, SpecVersion, TemporalKind, TransformFlags,
    VersionContext,
};

use crate::time;

/// Payload keys that never become reified metadata.
const PAYLOAD_KEYS: [&str; 8] = [
    "type",
    "value",
    "object",
    "objectList",
    "valueList",
    "json",
    "languageMap",
    "vocab",
];

// ---------------------------------------------------------------------------
// Backend dialect -> intermediate
// ---------------------------------------------------------------------------

/// Parses a backend attribute.
///
/// Returns `None` when the raw value is null or not representable; the
/// caller must omit the attribute entirely rather than emit a null.
pub fn from_v2(raw: &Value) -> Option<Attribute> {
    let obj = match raw.as_object() {
        Some(obj) => obj,
        None => {
            if raw.is_null() {
                return None;
            }
            return Some(Attribute::property(raw.clone()));
        }
    };

    let value = obj.get("value").cloned().unwrap_or(Value::Null);
    if value.is_null() {
        return None;
    }

    let tag = obj.get("type").and_then(Value::as_str).unwrap_or("Property");
    let lower = tag.to_lowercase();
    let mut value_type = None;

    let payload = match lower.as_str() {
        "property" => AttributePayload::Property { value },
        // Other native JSON types are coerced and cast as property values
        "boolean" => AttributePayload::Property {
            value: Value::Bool(js_truthy(&value)),
        },
        "float" => AttributePayload::Property {
            value: lenient_number(&value, true)?,
        },
        "integer" => AttributePayload::Property {
            value: lenient_number(&value, false)?,
        },
        "number" => {
            let fractional = match &value {
                Value::Number(n) => n.as_f64().map(|f| f.fract() != 0.0).unwrap_or(false),
                Value::String(s) => s.contains('.'),
                _ => false,
            };
            AttributePayload::Property {
                value: lenient_number(&value, fractional)?,
            }
        }
        "date" => temporal_payload(TemporalKind::Date, &value),
        "time" => temporal_payload(TemporalKind::Time, &value),
        "datetime" => temporal_payload(TemporalKind::DateTime, &value),
        geo if is_geo_tag(geo) => AttributePayload::GeoProperty { value },
        "listproperty" => AttributePayload::ListProperty { value_list: value },
        "jsonproperty" => AttributePayload::JsonProperty { json: value },
        "relationship" => AttributePayload::Relationship { object: value },
        "listrelationship" => AttributePayload::ListRelationship { object_list: value },
        "languageproperty" => AttributePayload::LanguageProperty {
            language_map: value,
        },
        "vocabularyproperty" => AttributePayload::VocabularyProperty { vocab: value },
        // Unrecognized tags fall back to Property; the tag itself is kept
        // so the information can be restored on the way back.
        _ => {
            value_type = Some(tag.to_string());
            AttributePayload::Property { value }
        }
    };

    let mut attr = Attribute::new(payload);
    attr.value_type = value_type;

    if let Some(metadata) = obj.get("metadata").and_then(Value::as_object) {
        for (key, md) in metadata {
            match key.as_str() {
                "TimeInstant" => {
                    attr.observed_at = Some(
                        md.get("value")
                            .and_then(Value::as_str)
                            .and_then(time::to_utc_iso)
                            .unwrap_or_else(|| DATETIME_DEFAULT.to_string()),
                    );
                }
                "unitCode" => {
                    attr.unit_code = md.get("value").and_then(Value::as_str).map(String::from);
                }
                "objectType" => {
                    attr.object_type = md.get("value").and_then(Value::as_str).map(String::from);
                }
                "dateCreated" => attr.created_at = lifted_timestamp(md),
                "dateModified" => attr.modified_at = lifted_timestamp(md),
                _ => {
                    if let Some(meta) = meta_from_v2(md) {
                        attr.metadata.insert(key.clone(), meta);
                    }
                }
            }
        }
    }

    Some(attr)
}

/// Converts a backend attribute straight to its gateway rendering.
pub fn v2_to_ld(raw: &Value, flags: &TransformFlags, vctx: &VersionContext) -> Option<Value> {
    from_v2(raw).map(|attr| render_ld(&attr, flags, vctx))
}

fn temporal_payload(kind: TemporalKind, value: &Value) -> AttributePayload {
    let raw = match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    };
    AttributePayload::TemporalProperty {
        kind,
        value: time::normalize(kind, &raw),
    }
}

fn lifted_timestamp(md: &Value) -> Option<String> {
    md.get("value")
        .and_then(Value::as_str)
        .map(|s| time::to_utc_iso(s).unwrap_or_else(|| s.to_string()))
}

fn meta_from_v2(raw: &Value) -> Option<MetadataAttribute> {
    let attr = from_v2(raw)?;
    Some(MetadataAttribute {
        payload: attr.payload,
        unit_code: attr.unit_code,
        observed_at: attr.observed_at,
        value_type: attr.value_type,
    })
}

fn js_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn lenient_number(value: &Value, fractional: bool) -> Option<Value> {
    let num = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if fractional {
        serde_json::Number::from_f64(num).map(Value::Number)
    } else {
        Some(Value::Number((num.trunc() as i64).into()))
    }
}

// ---------------------------------------------------------------------------
// Intermediate -> gateway dialect
// ---------------------------------------------------------------------------

/// Renders the attribute in the gateway dialect, honouring the
/// representation flags and the negotiated version.
pub fn render_ld(attr: &Attribute, flags: &TransformFlags, vctx: &VersionContext) -> Value {
    let mut obj = Map::new();
    render_payload_ld(&attr.payload, attr.value_type.as_deref(), vctx, &mut obj);

    if let Some(unit) = &attr.unit_code {
        obj.insert("unitCode".to_string(), json!(unit));
    }
    if let Some(object_type) = &attr.object_type {
        obj.insert("objectType".to_string(), json!(object_type));
    }
    if let Some(ts) = &attr.observed_at {
        obj.insert("observedAt".to_string(), json!(ts));
    }
    if let Some(ts) = &attr.expires_at {
        obj.insert("expiresAt".to_string(), json!(ts));
    }
    if let Some(ts) = &attr.created_at {
        obj.insert("createdAt".to_string(), json!(ts));
    }
    if let Some(ts) = &attr.modified_at {
        obj.insert("modifiedAt".to_string(), json!(ts));
    }
    for (key, meta) in &attr.metadata {
        obj.insert(key.clone(), render_meta_ld(meta, vctx));
    }

    if flags.sys_attrs {
        // Never left undefined when system attributes were requested
        obj.entry("createdAt").or_insert_with(|| json!(DATETIME_DEFAULT));
        obj.entry("modifiedAt").or_insert_with(|| json!(DATETIME_DEFAULT));
    }

    if flags.concise {
        obj.remove("type");
        if obj.len() == 1 {
            if let Some(value) = obj.get("value") {
                return value.clone();
            }
        }
    }

    Value::Object(obj)
}

fn render_payload_ld(
    payload: &AttributePayload,
    value_type: Option<&str>,
    vctx: &VersionContext,
    obj: &mut Map<String, Value>,
) {
    match payload {
        AttributePayload::Property { value } => {
            obj.insert("type".to_string(), json!("Property"));
            obj.insert("value".to_string(), value.clone());
            if vctx.emits_value_type() {
                if let Some(vt) = value_type {
                    obj.insert("valueType".to_string(), json!(vt));
                }
            }
        }
        AttributePayload::TemporalProperty { kind, value } => {
            obj.insert("type".to_string(), json!("Property"));
            if vctx.plain_temporals() {
                obj.insert("value".to_string(), json!(value));
                obj.insert("valueType".to_string(), json!(kind.tag()));
            } else {
                obj.insert(
                    "value".to_string(),
                    json!({ "@type": kind.tag(), "@value": value }),
                );
            }
        }
        AttributePayload::GeoProperty { value } => {
            obj.insert("type".to_string(), json!("GeoProperty"));
            obj.insert("value".to_string(), value.clone());
        }
        AttributePayload::Relationship { object } => {
            obj.insert("type".to_string(), json!("Relationship"));
            obj.insert("object".to_string(), object.clone());
        }
        AttributePayload::ListProperty { value_list } => {
            if vctx.at_least(&SpecVersion::V1_8) {
                obj.insert("type".to_string(), json!("ListProperty"));
                obj.insert("valueList".to_string(), value_list.clone());
            } else {
                degrade(obj, value_list);
            }
        }
        AttributePayload::ListRelationship { object_list } => {
            if vctx.at_least(&SpecVersion::V1_8) {
                obj.insert("type".to_string(), json!("ListRelationship"));
                obj.insert("objectList".to_string(), object_list.clone());
            } else {
                degrade(obj, object_list);
            }
        }
        AttributePayload::LanguageProperty { language_map } => {
            if vctx.at_least(&SpecVersion::V1_4) {
                obj.insert("type".to_string(), json!("LanguageProperty"));
                obj.insert("languageMap".to_string(), language_map.clone());
            } else {
                degrade(obj, language_map);
            }
        }
        AttributePayload::VocabularyProperty { vocab } => {
            if vctx.at_least(&SpecVersion::V1_6) {
                obj.insert("type".to_string(), json!("VocabularyProperty"));
                obj.insert("vocab".to_string(), vocab.clone());
            } else {
                degrade(obj, vocab);
            }
        }
        AttributePayload::JsonProperty { json: blob } => {
            if vctx.at_least(&SpecVersion::V1_8) {
                obj.insert("type".to_string(), json!("JsonProperty"));
                obj.insert("json".to_string(), blob.clone());
            } else {
                degrade(obj, blob);
            }
        }
    }
}

/// A kind the negotiated version does not know is served as a plain
/// property carrying the raw payload.
fn degrade(obj: &mut Map<String, Value>, value: &Value) {
    obj.insert("type".to_string(), json!("Property"));
    obj.insert("value".to_string(), value.clone());
}

fn render_meta_ld(meta: &MetadataAttribute, vctx: &VersionContext) -> Value {
    let attr = Attribute {
        unit_code: meta.unit_code.clone(),
        observed_at: meta.observed_at.clone(),
        value_type: meta.value_type.clone(),
        ..Attribute::new(meta.payload.clone())
    };
    render_ld(&attr, &TransformFlags::default(), vctx)
}

// ---------------------------------------------------------------------------
// Gateway dialect -> intermediate
// ---------------------------------------------------------------------------

/// Parses a gateway attribute, normalized or concise.
///
/// Total: any shape of input produces some attribute, down to "the whole
/// node is the scalar value of a property".
pub fn from_ld(node: &Value) -> Attribute {
    let obj = match node.as_object() {
        Some(obj) => obj,
        None => return Attribute::property(node.clone()),
    };

    // A bare geometry used directly as an attribute
    let tag = obj.get("type").and_then(Value::as_str);
    if let (Some(t), Some(coordinates)) = (tag, obj.get("coordinates")) {
        if GEOJSON_TYPES.contains(&t) {
            let mut attr = Attribute::new(AttributePayload::GeoProperty {
                value: json!({ "type": t, "coordinates": coordinates }),
            });
            extract_ld_fields(obj, &mut attr, &["type", "coordinates"]);
            return attr;
        }
    }

    let payload = match tag.map(str::to_lowercase) {
        Some(t) => match t.as_str() {
            "geoproperty" => AttributePayload::GeoProperty {
                value: payload_value(obj, "value"),
            },
            "relationship" => AttributePayload::Relationship {
                object: payload_value(obj, "object"),
            },
            "listproperty" => AttributePayload::ListProperty {
                value_list: payload_value(obj, "valueList"),
            },
            "listrelationship" => AttributePayload::ListRelationship {
                object_list: payload_value(obj, "objectList"),
            },
            "languageproperty" => AttributePayload::LanguageProperty {
                language_map: payload_value(obj, "languageMap"),
            },
            "vocabularyproperty" => AttributePayload::VocabularyProperty {
                vocab: payload_value(obj, "vocab"),
            },
            "jsonproperty" => AttributePayload::JsonProperty {
                json: payload_value(obj, "json"),
            },
            _ => property_payload(obj),
        },
        None => match infer_payload(obj) {
            Some(payload) => payload,
            // No payload field at all: the node itself is the value
            None => return Attribute::property(node.clone()),
        },
    };

    let mut attr = Attribute::new(payload);
    extract_ld_fields(obj, &mut attr, &PAYLOAD_KEYS);
    attr
}

/// Converts a gateway attribute straight to its backend rendering.
pub fn ld_to_v2(node: &Value, include_value_type: bool) -> Value {
    render_v2(&from_ld(node), include_value_type, false)
}

fn payload_value(obj: &Map<String, Value>, key: &str) -> Value {
    obj.get(key).cloned().unwrap_or(Value::Null)
}

/// Property payloads may carry a temporal value, either as a typed
/// sub-object or as a plain string tagged by `valueType`.
fn property_payload(obj: &Map<String, Value>) -> AttributePayload {
    let value = payload_value(obj, "value");
    if let Some(sub) = value.as_object() {
        if let (Some(kind), Some(at_value)) = (
            sub.get("@type")
                .and_then(Value::as_str)
                .and_then(|t| TemporalKind::from_tag(&t.to_lowercase())),
            sub.get("@value"),
        ) {
            let raw = match at_value.as_str() {
                Some(s) => s.to_string(),
                None => at_value.to_string(),
            };
            return AttributePayload::TemporalProperty { kind, value: raw };
        }
    }
    if let (Some(raw), Some(kind)) = (
        value.as_str(),
        obj.get("valueType")
            .and_then(Value::as_str)
            .and_then(|t| TemporalKind::from_tag(&t.to_lowercase())),
    ) {
        return AttributePayload::TemporalProperty {
            kind,
            value: raw.to_string(),
        };
    }
    AttributePayload::Property { value }
}

/// Kind inference for concise payloads, in priority order.
fn infer_payload(obj: &Map<String, Value>) -> Option<AttributePayload> {
    if let Some(object) = obj.get("object") {
        return Some(AttributePayload::Relationship {
            object: object.clone(),
        });
    }
    if let Some(vocab) = obj.get("vocab") {
        return Some(AttributePayload::VocabularyProperty {
            vocab: vocab.clone(),
        });
    }
    if let Some(language_map) = obj.get("languageMap") {
        return Some(AttributePayload::LanguageProperty {
            language_map: language_map.clone(),
        });
    }
    if let Some(json) = obj.get("json") {
        return Some(AttributePayload::JsonProperty { json: json.clone() });
    }
    if let Some(value_list) = obj.get("valueList") {
        return Some(AttributePayload::ListProperty {
            value_list: value_list.clone(),
        });
    }
    if let Some(object_list) = obj.get("objectList") {
        return Some(AttributePayload::ListRelationship {
            object_list: object_list.clone(),
        });
    }
    if let Some(value) = obj.get("value") {
        if value.get("coordinates").is_some() {
            return Some(AttributePayload::GeoProperty {
                value: value.clone(),
            });
        }
        return Some(property_payload(obj));
    }
    None
}

fn extract_ld_fields(obj: &Map<String, Value>, attr: &mut Attribute, consumed: &[&str]) {
    for (key, value) in obj {
        if consumed.contains(&key.as_str()) {
            continue;
        }
        match key.as_str() {
            "observedAt" => attr.observed_at = value.as_str().map(String::from),
            "unitCode" => attr.unit_code = value.as_str().map(String::from),
            "objectType" => attr.object_type = value.as_str().map(String::from),
            "expiresAt" => attr.expires_at = value.as_str().map(String::from),
            "valueType" => attr.value_type = value.as_str().map(String::from),
            // Backend-shaped metadata travelling with the attribute
            "metadata" => {
                if let Some(map) = value.as_object() {
                    for (name, md) in map {
                        if let Some(meta) = meta_from_v2(md) {
                            attr.metadata.insert(name.clone(), meta);
                        }
                    }
                }
            }
            _ => {
                attr.metadata.insert(key.clone(), meta_from_ld(value));
            }
        }
    }
}

/// Nested metadata cannot itself carry metadata; anything deeper is
/// dropped here.
fn meta_from_ld(value: &Value) -> MetadataAttribute {
    let attr = from_ld(value);
    MetadataAttribute {
        payload: attr.payload,
        unit_code: attr.unit_code,
        observed_at: attr.observed_at,
        value_type: attr.value_type,
    }
}

// ---------------------------------------------------------------------------
// Intermediate -> backend dialect
// ---------------------------------------------------------------------------

/// Renders the attribute in the backend dialect.
///
/// `nested` renderings are reified metadata and carry no metadata block of
/// their own.
pub fn render_v2(attr: &Attribute, include_value_type: bool, nested: bool) -> Value {
    let mut obj = Map::new();
    match &attr.payload {
        AttributePayload::Property { value } => {
            let tag = match (&attr.value_type, include_value_type) {
                (Some(vt), true) => vt.clone(),
                _ => "Property".to_string(),
            };
            obj.insert("type".to_string(), json!(tag));
            obj.insert("value".to_string(), value.clone());
        }
        AttributePayload::TemporalProperty { kind, value } => {
            obj.insert("type".to_string(), json!(kind.tag()));
            obj.insert("value".to_string(), json!(value));
        }
        AttributePayload::GeoProperty { value } => {
            obj.insert("type".to_string(), json!("geo:json"));
            obj.insert("value".to_string(), value.clone());
        }
        AttributePayload::Relationship { object } => {
            obj.insert("type".to_string(), json!("Relationship"));
            obj.insert("value".to_string(), object.clone());
        }
        AttributePayload::ListProperty { value_list } => {
            obj.insert("type".to_string(), json!("ListProperty"));
            obj.insert("value".to_string(), value_list.clone());
        }
        AttributePayload::ListRelationship { object_list } => {
            obj.insert("type".to_string(), json!("ListRelationship"));
            obj.insert("value".to_string(), object_list.clone());
        }
        AttributePayload::LanguageProperty { language_map } => {
            obj.insert("type".to_string(), json!("LanguageProperty"));
            obj.insert("value".to_string(), language_map.clone());
        }
        AttributePayload::VocabularyProperty { vocab } => {
            obj.insert("type".to_string(), json!("VocabularyProperty"));
            obj.insert("value".to_string(), vocab.clone());
        }
        AttributePayload::JsonProperty { json: blob } => {
            obj.insert("type".to_string(), json!("JsonProperty"));
            obj.insert("value".to_string(), blob.clone());
        }
    }

    if !nested {
        let mut metadata = Map::new();
        if let Some(ts) = &attr.observed_at {
            metadata.insert(
                "TimeInstant".to_string(),
                json!({ "type": "ISO8601", "value": ts }),
            );
        }
        if let Some(unit) = &attr.unit_code {
            metadata.insert(
                "unitCode".to_string(),
                json!({ "type": "Property", "value": unit }),
            );
        }
        if let Some(object_type) = &attr.object_type {
            metadata.insert(
                "objectType".to_string(),
                json!({ "type": "Property", "value": object_type }),
            );
        }
        if let Some(ts) = &attr.expires_at {
            metadata.insert(
                "dateExpires".to_string(),
                json!({ "type": "DateTime", "value": ts }),
            );
        }
        for (key, meta) in &attr.metadata {
            metadata.insert(key.clone(), render_meta_v2(meta, include_value_type));
        }
        obj.insert("metadata".to_string(), Value::Object(metadata));
    }

    Value::Object(obj)
}

fn render_meta_v2(meta: &MetadataAttribute, include_value_type: bool) -> Value {
    let attr = Attribute {
        unit_code: meta.unit_code.clone(),
        observed_at: meta.observed_at.clone(),
        value_type: meta.value_type.clone(),
        ..Attribute::new(meta.payload.clone())
    };
    render_v2(&attr, include_value_type, true)
}
