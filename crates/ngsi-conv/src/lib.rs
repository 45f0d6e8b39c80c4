//! ngsi-conv - Transcoding between the NGSI-LD and NGSI-v2 dialects
//!
//! The two dialects describe overlapping but non-isomorphic schemas: the
//! gateway side is URN-identified and richly typed (Property, Relationship,
//! GeoProperty, list/language/vocabulary kinds, JSON-LD `@context`), the
//! backend side is flat `{type, value, metadata}` triples. Every conversion
//! pivots through the typed [`ngsi_core::Attribute`] intermediate.
//!
//! All functions in this crate are total and free of I/O: malformed input
//! degrades to a representable state (an absent attribute, a raw value
//! passed through) rather than an error.

pub mod attribute;
pub mod entity;
pub mod introspection;
pub mod merge;
pub mod query;
pub mod subscription;
pub mod time;

pub use attribute::{from_ld, from_v2, ld_to_v2, render_ld, render_v2, v2_to_ld};
pub use introspection::append_context;
