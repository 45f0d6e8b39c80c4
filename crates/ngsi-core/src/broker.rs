//! Abstractions over the downstream NGSI-v2 context broker
//!
//! The API layer talks to the broker exclusively through [`ContextBroker`]
//! so that handlers can be exercised against a mock transport. The reqwest
//! implementation lives in the `ngsi-client` crate.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportError;

/// HTTP verb of a backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    /// Canonical method name
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
        }
    }
}

/// A single call against the backend broker, relative to its `/v2` root.
#[derive(Debug, Clone)]
pub struct BrokerRequest {
    /// HTTP verb
    pub verb: Verb,
    /// Path below `/v2`, with a leading slash (e.g. `/entities/urn:...`)
    pub path: String,
    /// Query parameters, already translated to the backend dialect
    pub query: Vec<(String, String)>,
    /// Tenant forwarded as the backend service header
    pub tenant: Option<String>,
    /// Scope forwarded as the backend service-path header
    pub service_path: Option<String>,
    /// JSON body, if the verb carries one
    pub body: Option<Value>,
    /// When set, `path` is resolved against the broker root instead of
    /// `/v2` (the version probe lives there)
    pub from_root: bool,
}

impl BrokerRequest {
    /// Creates a request with no query, scope, or body.
    pub fn new(verb: Verb, path: impl Into<String>) -> Self {
        Self {
            verb,
            path: path.into(),
            query: Vec::new(),
            tenant: None,
            service_path: None,
            body: None,
            from_root: false,
        }
    }

    /// Resolves the path against the broker root instead of `/v2`.
    pub fn at_root(mut self) -> Self {
        self.from_root = true;
        self
    }

    /// Attaches translated query parameters.
    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    /// Attaches a JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attaches tenant and service-path scoping.
    pub fn with_scope(mut self, tenant: Option<String>, service_path: Option<String>) -> Self {
        self.tenant = tenant;
        self.service_path = service_path;
        self
    }
}

/// What came back from the backend, reduced to the parts the gateway uses.
#[derive(Debug, Clone, Default)]
pub struct BrokerResponse {
    /// Backend HTTP status
    pub status: u16,
    /// Value of the backend total-count header, when present
    pub total_count: Option<usize>,
    /// Backend `Location` header, when present
    pub location: Option<String>,
    /// Backend `Content-Type` header, when present
    pub content_type: Option<String>,
    /// Parsed JSON body; `None` for empty bodies
    pub body: Option<Value>,
}

impl BrokerResponse {
    /// True for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport to the NGSI-v2 broker.
///
/// Implementations apply the configured timeout and never retry; every
/// failure is classified into the closed [`TransportError`] set.
#[async_trait]
pub trait ContextBroker: Send + Sync {
    /// Executes one backend call.
    async fn send(&self, req: BrokerRequest) -> Result<BrokerResponse, TransportError>;
}

/// Outbound delivery of translated notifications to subscriber endpoints.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Posts `body` to the subscriber at `target`, optionally attaching a
    /// JSON-LD context `Link` header.
    async fn deliver(
        &self,
        target: &str,
        content_type: &str,
        link: Option<String>,
        body: Value,
    ) -> Result<BrokerResponse, TransportError>;
}
