//! Wire-format constants shared by both dialects

/// Sentinel timestamp used when no real timestamp is available.
///
/// Note that this doubles as a literal valid value: a genuine epoch
/// timestamp cannot be distinguished from "missing" after a round trip.
pub const DATETIME_DEFAULT: &str = "1970-01-01T00:00:00.000Z";

/// Prefix every NGSI-LD identifier must carry.
pub const URN_PREFIX: &str = "urn:ngsi-ld:";

/// Marker value that deletes an attribute during a merge-patch.
pub const NULL_URN: &str = "urn:ngsi-ld:null";

/// GeoJSON geometry type tags recognised at the top level of an attribute.
pub const GEOJSON_TYPES: [&str; 5] = ["Point", "Polygon", "LineString", "MultiPoint", "MultiPolygon"];

/// Base URI of the NGSI-LD problem-detail type registry.
pub const ERROR_TYPE_PREFIX: &str = "https://uri.etsi.org/ngsi-ld/errors/";

/// Returns true when `tag` (already lower-cased) names a GeoJSON geometry
/// or one of its `geo:`-prefixed synonyms.
pub fn is_geo_tag(tag: &str) -> bool {
    matches!(
        tag,
        "geoproperty"
            | "geo:json"
            | "point"
            | "geo:point"
            | "linestring"
            | "geo:linestring"
            | "polygon"
            | "geo:polygon"
            | "multipoint"
            | "geo:multipoint"
            | "multilinestring"
            | "geo:multilinestring"
            | "multipolygon"
            | "geo:multipolygon"
    )
}
