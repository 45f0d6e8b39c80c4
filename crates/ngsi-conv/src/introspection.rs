//! Derived response envelopes
//!
//! Type and attribute introspection, entity maps, source identity, and the
//! notification wrapper are synthesized resources: each response gets a
//! fresh URN-identified envelope around data aggregated from the backend.

use serde_json::{json, Map, Value};
use uuid::Uuid;

use ngsi_core::constants::URN_PREFIX;

/// Inlines the `@context` for JSON-LD responses. Arrays are annotated
/// element-wise.
pub fn append_context(payload: Value, jsonld: bool, user_context: &str) -> Value {
    if !jsonld {
        return payload;
    }
    match payload {
        Value::Object(mut obj) => {
            obj.insert("@context".to_string(), json!(user_context));
            Value::Object(obj)
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| append_context(item, jsonld, user_context))
                .collect(),
        ),
        other => other,
    }
}

/// Maps a backend attribute type tag to the gateway attribute kind name.
fn format_type(tag: &str) -> &'static str {
    match tag.to_lowercase().as_str() {
        "geoproperty" | "geo:json" | "point" | "geo:point" | "linestring" | "geo:linestring"
        | "polygon" | "geo:polygon" | "multipoint" | "geo:multipoint" | "multilinestring"
        | "geo:multilinestring" | "multipolygon" | "geo:multipolygon" => "GeoProperty",
        "listproperty" => "ListProperty",
        "relationship" => "Relationship",
        "listrelationship" => "ListRelationship",
        "languageproperty" => "LanguageProperty",
        "vocabularyproperty" => "VocabularyProperty",
        _ => "Property",
    }
}

/// Builds the `EntityTypeList` envelope from the backend type registry.
pub fn entity_type_list(body: &Value, jsonld: bool, user_context: &str) -> Value {
    let type_list: Vec<Value> = body
        .as_array()
        .map(|types| {
            types
                .iter()
                .filter_map(|t| t.get("type").cloned())
                .collect()
        })
        .unwrap_or_default();

    append_context(
        json!({
            "id": format!("{URN_PREFIX}EntityTypeList:{}", Uuid::new_v4()),
            "type": "EntityTypeList",
            "typeList": type_list
        }),
        jsonld,
        user_context,
    )
}

/// Builds the `EntityTypeInformation` envelope for a single type.
pub fn entity_type_information(
    body: &Value,
    jsonld: bool,
    user_context: &str,
    type_name: &str,
) -> Value {
    let mut attribute_details = Vec::new();
    if let Some(attrs) = body.get("attrs").and_then(Value::as_object) {
        for (name, detail) in attrs {
            let attribute_types: Vec<Value> = detail
                .get("types")
                .and_then(Value::as_array)
                .map(|types| {
                    types
                        .iter()
                        .filter_map(Value::as_str)
                        .map(|t| json!(format_type(t)))
                        .collect()
                })
                .unwrap_or_default();
            attribute_details.push(json!({
                "id": name,
                "type": "Attribute",
                "attributeName": name,
                "attributeTypes": attribute_types
            }));
        }
    }

    append_context(
        json!({
            "id": format!("{URN_PREFIX}EntityTypeInformation:{}", Uuid::new_v4()),
            "type": "EntityTypeInformation",
            "typeName": type_name,
            "entityCount": body.get("count").cloned().unwrap_or(json!(0)),
            "attributeDetails": attribute_details
        }),
        jsonld,
        user_context,
    )
}

/// Builds the `EntityAttributeList` envelope: the deduplicated union of
/// attribute names across every registered type.
pub fn entity_attribute_list(body: &Value, jsonld: bool, user_context: &str) -> Value {
    let mut attribute_list: Vec<String> = Vec::new();
    if let Some(types) = body.as_array() {
        for entity_type in types {
            if let Some(attrs) = entity_type.get("attrs").and_then(Value::as_object) {
                for name in attrs.keys() {
                    if !attribute_list.contains(name) {
                        attribute_list.push(name.clone());
                    }
                }
            }
        }
    }

    append_context(
        json!({
            "id": format!("{URN_PREFIX}EntityAttributeList:{}", Uuid::new_v4()),
            "type": "EntityAttributeList",
            "attributeList": attribute_list
        }),
        jsonld,
        user_context,
    )
}

/// Builds the `Attribute` envelope for a single attribute name, aggregated
/// over every type that carries it. `attributeCount` of zero means the
/// attribute is unknown and the caller responds with not-found.
pub fn entity_attribute(body: &Value, jsonld: bool, user_context: &str, attribute_name: &str) -> Value {
    let mut attribute_count: u64 = 0;
    let mut type_names: Vec<Value> = Vec::new();
    let mut attribute_types: Vec<String> = Vec::new();

    if let Some(types) = body.as_array() {
        for entity_type in types {
            let Some(detail) = entity_type
                .get("attrs")
                .and_then(|attrs| attrs.get(attribute_name))
            else {
                continue;
            };
            attribute_count += entity_type.get("count").and_then(Value::as_u64).unwrap_or(0);
            if let Some(name) = entity_type.get("type") {
                type_names.push(name.clone());
            }
            if let Some(tags) = detail.get("types").and_then(Value::as_array) {
                for tag in tags.iter().filter_map(Value::as_str) {
                    let kind = format_type(tag).to_string();
                    if !attribute_types.contains(&kind) {
                        attribute_types.push(kind);
                    }
                }
            }
        }
    }

    append_context(
        json!({
            "id": attribute_name,
            "type": "Attribute",
            "attributeCount": attribute_count,
            "attributeTypes": attribute_types,
            "typeNames": type_names,
            "attributeName": attribute_name
        }),
        jsonld,
        user_context,
    )
}

/// Builds the `EntityMap` envelope from the swept entity ids.
pub fn entity_map(ids: &[String], jsonld: bool, user_context: &str) -> Value {
    let mut map = Map::new();
    for id in ids {
        map.insert(id.clone(), json!(["@none"]));
    }

    append_context(
        json!({
            "id": format!("{URN_PREFIX}EntityMap:{}", Uuid::new_v4()),
            "type": "EntityMap",
            "entityMap": map
        }),
        jsonld,
        user_context,
    )
}

/// Builds the `ContextSourceIdentity` envelope around the backend version
/// report.
pub fn source_identity(body: &Value, jsonld: bool, user_context: &str) -> Value {
    append_context(
        json!({
            "id": format!("{URN_PREFIX}ContextSourceIdentity:{}", Uuid::new_v4()),
            "type": "ContextSourceIdentity",
            "contextSourceExtras": body
        }),
        jsonld,
        user_context,
    )
}

/// Wraps converted entities into a gateway-dialect notification.
///
/// `notified_at` is supplied by the caller so this stays a pure function.
pub fn ld_notification(subscription_id: &str, notified_at: &str, data: Vec<Value>) -> Value {
    let subscription_id = if subscription_id.starts_with(URN_PREFIX) {
        subscription_id.to_string()
    } else {
        format!("{URN_PREFIX}Subscription:{subscription_id}")
    };
    json!({
        "id": format!("{URN_PREFIX}Notification:{}", Uuid::new_v4()),
        "type": "Notification",
        "notifiedAt": notified_at,
        "subscriptionId": subscription_id,
        "data": data
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CTX: &str = "https://context/ngsi-ld.jsonld";

    fn type_registry() -> Value {
        json!([
            {
                "type": "TemperatureSensor",
                "count": 3,
                "attrs": {
                    "temperature": { "types": ["Number"] },
                    "location": { "types": ["geo:json"] }
                }
            },
            {
                "type": "Building",
                "count": 2,
                "attrs": {
                    "location": { "types": ["geo:json"] },
                    "owner": { "types": ["Relationship"] }
                }
            }
        ])
    }

    #[test]
    fn type_list_collects_type_names() {
        let envelope = entity_type_list(&type_registry(), false, CTX);
        assert_eq!(envelope["type"], json!("EntityTypeList"));
        assert_eq!(envelope["typeList"], json!(["TemperatureSensor", "Building"]));
        assert!(envelope["id"]
            .as_str()
            .unwrap()
            .starts_with("urn:ngsi-ld:EntityTypeList:"));
    }

    #[test]
    fn type_information_maps_attribute_kinds() {
        let body = json!({
            "count": 3,
            "attrs": {
                "temperature": { "types": ["Number"] },
                "location": { "types": ["geo:json"] }
            }
        });
        let envelope = entity_type_information(&body, false, CTX, "TemperatureSensor");
        assert_eq!(envelope["typeName"], json!("TemperatureSensor"));
        assert_eq!(envelope["entityCount"], json!(3));
        let details = envelope["attributeDetails"].as_array().unwrap();
        let location = details.iter().find(|d| d["id"] == json!("location")).unwrap();
        assert_eq!(location["attributeTypes"], json!(["GeoProperty"]));
    }

    #[test]
    fn attribute_list_deduplicates_names() {
        let envelope = entity_attribute_list(&type_registry(), false, CTX);
        assert_eq!(
            envelope["attributeList"],
            json!(["location", "temperature", "owner"])
        );
    }

    #[test]
    fn attribute_envelope_aggregates_across_types() {
        let envelope = entity_attribute(&type_registry(), false, CTX, "location");
        assert_eq!(envelope["attributeCount"], json!(5));
        assert_eq!(envelope["typeNames"], json!(["TemperatureSensor", "Building"]));
        assert_eq!(envelope["attributeTypes"], json!(["GeoProperty"]));

        let missing = entity_attribute(&type_registry(), false, CTX, "nonexistent");
        assert_eq!(missing["attributeCount"], json!(0));
    }

    #[test]
    fn entity_map_lists_every_id() {
        let ids = vec![
            "urn:ngsi-ld:T:1".to_string(),
            "urn:ngsi-ld:T:2".to_string(),
        ];
        let envelope = entity_map(&ids, false, CTX);
        assert_eq!(envelope["entityMap"]["urn:ngsi-ld:T:1"], json!(["@none"]));
        assert_eq!(envelope["entityMap"]["urn:ngsi-ld:T:2"], json!(["@none"]));
    }

    #[test]
    fn notification_prefixes_bare_subscription_ids() {
        let envelope = ld_notification("5f1e9", "2023-05-01T08:20:30.000Z", vec![]);
        assert_eq!(envelope["subscriptionId"], json!("urn:ngsi-ld:Subscription:5f1e9"));

        let envelope = ld_notification("urn:ngsi-ld:Subscription:5f1e9", "2023-05-01T08:20:30.000Z", vec![]);
        assert_eq!(envelope["subscriptionId"], json!("urn:ngsi-ld:Subscription:5f1e9"));
    }

    #[test]
    fn context_is_appended_per_element_on_arrays() {
        let annotated = append_context(json!([{ "id": "a" }, { "id": "b" }]), true, CTX);
        assert_eq!(annotated[0]["@context"], json!(CTX));
        assert_eq!(annotated[1]["@context"], json!(CTX));
    }
}
