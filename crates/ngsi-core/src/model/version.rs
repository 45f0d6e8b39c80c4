//! Spec-version negotiation
//!
//! The server is configured with a ceiling version (derived from the core
//! context URL); clients may declare a lower preference through the
//! `Prefer: ngsi-ld=<version>` header. The effective version is the
//! minimum of the two and gates which attribute kinds and value encodings
//! apply.

use std::fmt;

use semver::Version;

/// An NGSI-LD specification version such as `1.8`.
///
/// Versions are usually spelled with two components on the wire; a missing
/// patch (or minor) component is padded with zeroes before comparison.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SpecVersion(Version);

impl SpecVersion {
    /// 1.4 - language properties
    pub const V1_4: SpecVersion = SpecVersion(Version::new(1, 4, 0));
    /// 1.6 - vocabulary properties
    pub const V1_6: SpecVersion = SpecVersion(Version::new(1, 6, 0));
    /// 1.8 - JSON and list kinds; the last version using typed temporal
    /// sub-objects
    pub const V1_8: SpecVersion = SpecVersion(Version::new(1, 8, 0));

    /// Parses `1`, `1.8`, or `1.8.1` spellings. Returns `None` for
    /// anything else.
    pub fn parse(s: &str) -> Option<Self> {
        let padded = match s.split('.').count() {
            1 => format!("{s}.0.0"),
            2 => format!("{s}.0"),
            _ => s.to_string(),
        };
        Version::parse(&padded).ok().map(SpecVersion)
    }

    /// Extracts the version from a core-context URL of the form
    /// `.../ngsi-ld-core-context-v<major.minor>.jsonld`.
    pub fn from_core_context(url: &str) -> Option<Self> {
        let rest = url.split("ngsi-ld-core-context-v").nth(1)?;
        let digits: String = rest
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        let digits = digits.trim_end_matches('.');
        Self::parse(digits)
    }

    /// Two-component rendering used in response headers.
    pub fn as_wire(&self) -> String {
        format!("{}.{}", self.0.major, self.0.minor)
    }
}

impl Default for SpecVersion {
    fn default() -> Self {
        SpecVersion::V1_8
    }
}

impl fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_wire())
    }
}

/// Version context for a single request/response pair.
#[derive(Debug, Clone)]
pub struct VersionContext {
    /// Ceiling configured on the server
    pub configured: SpecVersion,
    /// Version the client asked for, if any
    pub declared: Option<SpecVersion>,
    /// Whether the gateway preserves backend type tags as `valueType`
    pub value_type: bool,
}

impl VersionContext {
    /// Builds the context from the configured ceiling and the raw value of
    /// the client preference header.
    pub fn new(configured: SpecVersion, value_type: bool, declared: Option<&str>) -> Self {
        Self {
            configured,
            declared: declared.and_then(SpecVersion::parse),
            value_type,
        }
    }

    /// The version actually applied: the declared preference capped by the
    /// configured ceiling.
    pub fn effective(&self) -> SpecVersion {
        match &self.declared {
            Some(declared) if declared < &self.configured => declared.clone(),
            _ => self.configured.clone(),
        }
    }

    /// Whether plain properties may carry a `valueType` annotation.
    pub fn emits_value_type(&self) -> bool {
        self.value_type && self.effective() > SpecVersion::V1_8
    }

    /// Whether temporal values are rendered as plain strings with a
    /// sibling `valueType` (newer encoding) instead of typed sub-objects.
    pub fn plain_temporals(&self) -> bool {
        self.emits_value_type()
    }

    /// Whether the given minimum-version gate is open.
    pub fn at_least(&self, min: &SpecVersion) -> bool {
        &self.effective() >= min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_component_versions() {
        assert_eq!(SpecVersion::parse("1.8"), Some(SpecVersion::V1_8));
        assert!(SpecVersion::parse("1.8.1").unwrap() > SpecVersion::V1_8);
        assert_eq!(SpecVersion::parse("nonsense"), None);
    }

    #[test]
    fn extracts_version_from_core_context_url() {
        let v = SpecVersion::from_core_context(
            "https://uri.etsi.org/ngsi-ld/v1/ngsi-ld-core-context-v1.6.jsonld",
        );
        assert_eq!(v, Some(SpecVersion::V1_6));
        assert_eq!(SpecVersion::from_core_context("https://context/other.jsonld"), None);
    }

    #[test]
    fn effective_version_is_capped_by_the_ceiling() {
        let ctx = VersionContext::new(SpecVersion::V1_8, false, Some("1.6"));
        assert_eq!(ctx.effective(), SpecVersion::V1_6);

        let ctx = VersionContext::new(SpecVersion::V1_6, false, Some("1.8"));
        assert_eq!(ctx.effective(), SpecVersion::V1_6);

        let ctx = VersionContext::new(SpecVersion::V1_8, false, None);
        assert_eq!(ctx.effective(), SpecVersion::V1_8);
    }

    #[test]
    fn value_type_requires_flag_and_version() {
        let ctx = VersionContext::new(SpecVersion::parse("1.9").unwrap(), true, None);
        assert!(ctx.emits_value_type());

        let ctx = VersionContext::new(SpecVersion::V1_8, true, None);
        assert!(!ctx.emits_value_type());

        let ctx = VersionContext::new(SpecVersion::parse("1.9").unwrap(), true, Some("1.8"));
        assert!(!ctx.emits_value_type());
    }
}
