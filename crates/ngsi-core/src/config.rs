//! Gateway configuration
//!
//! Resolved once at startup and passed by shared reference into request
//! handling; nothing here is mutated after the server starts.

use serde::Deserialize;

use crate::model::version::SpecVersion;

/// Immutable process-wide configuration.
///
/// Loaded from an optional TOML file and overridden by environment
/// variables (the environment wins).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Port the gateway listens on
    pub port: u16,
    /// Externally reachable base URL of the gateway itself
    pub url: String,
    /// Timeout for forwarding notifications to subscribers, in milliseconds
    pub relay_timeout_ms: u64,
    /// Base URL of the NGSI-v2 context broker (without the `/v2` segment)
    pub v2_broker: String,
    /// Timeout for backend calls, in milliseconds
    pub v2_timeout_ms: u64,
    /// The fixed JSON-LD `@context` document supplied to clients
    pub user_context: String,
    /// The NGSI-LD core `@context` document; its version suffix determines
    /// the highest spec version the gateway will apply
    pub core_context: String,
    /// Page size used when sweeping the backend for entity-map generation
    pub page_limit: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            url: "http://localhost:3000".to_string(),
            relay_timeout_ms: 1000,
            v2_broker: "http://localhost:1026".to_string(),
            v2_timeout_ms: 1000,
            user_context: "https://fiware.github.io/tutorials.Step-by-Step/tutorials-context.jsonld"
                .to_string(),
            core_context: "https://uri.etsi.org/ngsi-ld/v1/ngsi-ld-core-context-v1.8.jsonld"
                .to_string(),
            page_limit: 100,
        }
    }
}

impl GatewayConfig {
    /// Overrides fields from environment variables where set.
    ///
    /// Unparsable numeric values are logged and ignored rather than
    /// aborting startup.
    pub fn apply_env(&mut self) {
        if let Some(v) = env_var("NGSID_PORT") {
            match v.parse() {
                Ok(port) => self.port = port,
                Err(_) => tracing::warn!(value = %v, "Ignoring unparsable NGSID_PORT"),
            }
        }
        if let Some(v) = env_var("NGSID_URL") {
            self.url = v;
        }
        if let Some(v) = env_var("NGSID_RELAY_TIMEOUT") {
            match v.parse() {
                Ok(ms) => self.relay_timeout_ms = ms,
                Err(_) => tracing::warn!(value = %v, "Ignoring unparsable NGSID_RELAY_TIMEOUT"),
            }
        }
        if let Some(v) = env_var("NGSI_V2_CONTEXT_BROKER") {
            self.v2_broker = v;
        }
        if let Some(v) = env_var("NGSI_V2_TIMEOUT") {
            match v.parse() {
                Ok(ms) => self.v2_timeout_ms = ms,
                Err(_) => tracing::warn!(value = %v, "Ignoring unparsable NGSI_V2_TIMEOUT"),
            }
        }
        if let Some(v) = env_var("USER_CONTEXT_URL") {
            self.user_context = v;
        }
        if let Some(v) = env_var("CORE_CONTEXT_URL") {
            self.core_context = v;
        }
        if let Some(v) = env_var("NGSID_PAGE_LIMIT") {
            match v.parse() {
                Ok(limit) => self.page_limit = limit,
                Err(_) => tracing::warn!(value = %v, "Ignoring unparsable NGSID_PAGE_LIMIT"),
            }
        }
    }

    /// Highest spec version the gateway applies, parsed from the version
    /// suffix of the core context URL (`ngsi-ld-core-context-v<major.minor>`).
    pub fn spec_version(&self) -> SpecVersion {
        SpecVersion::from_core_context(&self.core_context).unwrap_or_default()
    }

    /// Whether the backend attribute `type` tag is preserved through the
    /// `valueType` annotation. Enabled for core contexts above 1.8.
    pub fn value_type(&self) -> bool {
        self.spec_version() > SpecVersion::V1_8
    }

    /// URL substituted for subscriber endpoints so notifications pass back
    /// through the gateway.
    pub fn notification_relay(&self) -> String {
        format!("{}/notify", self.url.trim_end_matches('/'))
    }

    /// URL of the served `@context` document.
    pub fn context_url(&self) -> String {
        format!("{}/context.jsonld", self.url.trim_end_matches('/'))
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_version_comes_from_core_context() {
        let mut config = GatewayConfig::default();
        assert_eq!(config.spec_version(), SpecVersion::V1_8);
        assert!(!config.value_type());

        config.core_context =
            "https://uri.etsi.org/ngsi-ld/v1/ngsi-ld-core-context-v1.9.jsonld".to_string();
        assert!(config.value_type());
    }

    #[test]
    fn derived_urls_do_not_double_slashes() {
        let config = GatewayConfig {
            url: "http://gateway:3000/".to_string(),
            ..GatewayConfig::default()
        };
        assert_eq!(config.notification_relay(), "http://gateway:3000/notify");
        assert_eq!(config.context_url(), "http://gateway:3000/context.jsonld");
    }
}
