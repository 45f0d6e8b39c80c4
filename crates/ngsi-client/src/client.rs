//! reqwest-backed broker and relay clients

use std::error::Error as _;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use ngsi_core::{
    BrokerRequest, BrokerResponse, ContextBroker, GatewayConfig, NotificationSink, TransportError,
    Verb,
};

/// Client for the downstream NGSI-v2 context broker.
///
/// One instance is built at startup and shared across requests; the
/// configured timeout is baked into the inner client and the retry count
/// is always zero, so every failure surfaces immediately.
pub struct V2Client {
    base: String,
    http: reqwest::Client,
}

impl V2Client {
    /// Builds the client from the gateway configuration.
    pub fn new(config: &GatewayConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.v2_timeout_ms))
            .build()?;
        Ok(Self {
            base: config.v2_broker.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url_for(&self, req: &BrokerRequest) -> String {
        if req.from_root {
            format!("{}{}", self.base, req.path)
        } else {
            format!("{}/v2{}", self.base, req.path)
        }
    }
}

#[async_trait]
impl ContextBroker for V2Client {
    async fn send(&self, req: BrokerRequest) -> Result<BrokerResponse, TransportError> {
        let url = self.url_for(&req);
        tracing::debug!(method = req.verb.as_str(), %url, "Forwarding to context broker");

        let method = match req.verb {
            Verb::Get => reqwest::Method::GET,
            Verb::Post => reqwest::Method::POST,
            Verb::Put => reqwest::Method::PUT,
            Verb::Patch => reqwest::Method::PATCH,
            Verb::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .http
            .request(method, &url)
            .header("Accept", "application/json")
            .header(
                "fiware-servicepath",
                req.service_path.as_deref().unwrap_or("/"),
            );
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(tenant) = &req.tenant {
            builder = builder.header("fiware-service", tenant);
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| classify(&e))?;
        reduce(response).await
    }
}

/// Forwards translated notifications to subscriber endpoints with the
/// relay timeout.
pub struct HttpRelay {
    http: reqwest::Client,
}

impl HttpRelay {
    /// Builds the relay client from the gateway configuration.
    pub fn new(config: &GatewayConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.relay_timeout_ms))
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl NotificationSink for HttpRelay {
    async fn deliver(
        &self,
        target: &str,
        content_type: &str,
        link: Option<String>,
        body: Value,
    ) -> Result<BrokerResponse, TransportError> {
        tracing::debug!(%target, "Relaying notification");
        let mut builder = self
            .http
            .post(target)
            .header("Content-Type", content_type)
            .json(&body);
        if let Some(link) = link {
            builder = builder.header("Link", link);
        }
        let response = builder.send().await.map_err(|e| classify(&e))?;
        reduce(response).await
    }
}

/// Reduces a raw response to the parts the gateway uses.
async fn reduce(response: reqwest::Response) -> Result<BrokerResponse, TransportError> {
    let status = response.status().as_u16();
    let header = |name: &str| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };
    let total_count = header("fiware-total-count").and_then(|v| v.parse().ok());
    let location = header("location");
    let content_type = header("content-type");

    let text = response.text().await.map_err(|e| classify(&e))?;
    let body = if text.is_empty() {
        None
    } else {
        serde_json::from_str(&text).ok()
    };

    Ok(BrokerResponse {
        status,
        total_count,
        location,
        content_type,
        body,
    })
}

/// Classifies a reqwest failure into the closed transport-error set.
fn classify(err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::TimedOut;
    }

    let mut source: Option<&(dyn std::error::Error + 'static)> = err.source();
    while let Some(inner) = source {
        if let Some(io) = inner.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::ConnectionRefused {
                return TransportError::ConnectionRefused(io.to_string());
            }
        }
        let text = inner.to_string();
        if text.contains("dns error") || text.contains("failed to lookup address") {
            return TransportError::NameResolutionFailed(text);
        }
        source = inner.source();
    }

    if err.is_connect() {
        return TransportError::ConnectionRefused(err.to_string());
    }
    TransportError::Other(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_rooted_under_v2() {
        let config = GatewayConfig {
            v2_broker: "http://orion:1026/".to_string(),
            ..GatewayConfig::default()
        };
        let client = V2Client::new(&config).unwrap();

        let req = BrokerRequest::new(Verb::Get, "/entities/urn:ngsi-ld:T:1");
        assert_eq!(client.url_for(&req), "http://orion:1026/v2/entities/urn:ngsi-ld:T:1");

        let probe = BrokerRequest::new(Verb::Get, "/version").at_root();
        assert_eq!(client.url_for(&probe), "http://orion:1026/version");
    }
}
