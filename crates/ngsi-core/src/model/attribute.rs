//! The dialect-neutral attribute
//!
//! Both transcoding directions pivot through [`Attribute`]: the backend
//! dialect parses into it and the gateway dialect renders out of it, and
//! vice versa. The payload is a closed enum, so "exactly one payload field
//! per kind" holds by construction rather than by runtime convention.

use std::collections::BTreeMap;

use serde_json::Value;

/// Temporal flavour of a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalKind {
    Date,
    Time,
    DateTime,
}

impl TemporalKind {
    /// Tag used by both dialects (`@type` on the gateway side, the
    /// attribute `type` on the backend side).
    pub fn tag(&self) -> &'static str {
        match self {
            TemporalKind::Date => "Date",
            TemporalKind::Time => "Time",
            TemporalKind::DateTime => "DateTime",
        }
    }

    /// Parses a lower-cased backend type tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "date" => Some(TemporalKind::Date),
            "time" => Some(TemporalKind::Time),
            "datetime" => Some(TemporalKind::DateTime),
            _ => None,
        }
    }
}

/// Payload of an attribute, one variant per attribute kind.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributePayload {
    /// Plain property carrying any JSON value
    Property { value: Value },
    /// Property whose value is a date, time, or datetime
    TemporalProperty { kind: TemporalKind, value: String },
    /// GeoJSON geometry
    GeoProperty { value: Value },
    /// Reference to another entity
    Relationship { object: Value },
    /// Ordered list of values
    ListProperty { value_list: Value },
    /// Ordered list of entity references
    ListRelationship { object_list: Value },
    /// Map of language tag to string
    LanguageProperty { language_map: Value },
    /// Vocabulary term(s)
    VocabularyProperty { vocab: Value },
    /// Opaque JSON blob
    JsonProperty { json: Value },
}

/// A single attribute, detached from its name.
///
/// `metadata` holds reified sub-attributes; those are
/// [`MetadataAttribute`]s, which cannot carry metadata themselves, so the
/// one-level nesting bound is part of the type.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub payload: AttributePayload,
    pub unit_code: Option<String>,
    pub object_type: Option<String>,
    pub observed_at: Option<String>,
    pub created_at: Option<String>,
    pub modified_at: Option<String>,
    pub expires_at: Option<String>,
    /// Backend type tag preserved across the conversion when the gateway
    /// is configured to do so
    pub value_type: Option<String>,
    pub metadata: BTreeMap<String, MetadataAttribute>,
}

impl Attribute {
    /// Creates an attribute with the given payload and nothing else.
    pub fn new(payload: AttributePayload) -> Self {
        Self {
            payload,
            unit_code: None,
            object_type: None,
            observed_at: None,
            created_at: None,
            modified_at: None,
            expires_at: None,
            value_type: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Shorthand for a plain property.
    pub fn property(value: Value) -> Self {
        Self::new(AttributePayload::Property { value })
    }
}

/// A reified sub-attribute. Structurally an [`Attribute`] without the
/// metadata map.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataAttribute {
    pub payload: AttributePayload,
    pub unit_code: Option<String>,
    pub observed_at: Option<String>,
    pub value_type: Option<String>,
}

impl MetadataAttribute {
    /// Creates a metadata attribute with the given payload and nothing else.
    pub fn new(payload: AttributePayload) -> Self {
        Self {
            payload,
            unit_code: None,
            observed_at: None,
            value_type: None,
        }
    }
}
