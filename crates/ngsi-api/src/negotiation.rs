//! Content negotiation and response decoration
//!
//! Accept selects between plain JSON (context delivered via `Link` header)
//! and JSON-LD (context inlined); `Prefer: ngsi-ld=<version>` declares a
//! protocol-version preference; tenant and scope headers are forwarded to
//! the backend and echoed on the response.

use std::collections::HashMap;

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;

use ngsi_core::{GatewayConfig, TransformFlags, VersionContext};

/// Everything negotiated from the request before any backend call.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The client asked for `application/ld+json`
    pub jsonld: bool,
    /// Inbound tenant, forwarded and echoed
    pub tenant: Option<String>,
    /// Inbound scope, normalized to a leading slash
    pub service_path: Option<String>,
    /// Representation flags
    pub flags: TransformFlags,
    /// Negotiated protocol version
    pub vctx: VersionContext,
}

impl RequestContext {
    /// Builds the context from the request headers and query map.
    pub fn new(
        config: &GatewayConfig,
        headers: &HeaderMap,
        query: &HashMap<String, String>,
        attrs_only: bool,
    ) -> Self {
        let accept = header_str(headers, header::ACCEPT);
        let jsonld = accept == Some("application/ld+json");

        let prefer = header_str_named(headers, "prefer")
            .and_then(|p| p.strip_prefix("ngsi-ld="))
            .map(String::from);

        let mut flags = TransformFlags::from_query(query, attrs_only);
        flags.version = prefer.clone();

        let tenant = header_str_named(headers, "ngsild-tenant").map(String::from);
        let service_path = query.get("scopeQ").map(|scope| {
            if scope.starts_with('/') {
                scope.clone()
            } else {
                format!("/{scope}")
            }
        });

        let vctx = VersionContext::new(
            config.spec_version(),
            config.value_type(),
            prefer.as_deref(),
        );

        Self {
            jsonld,
            tenant,
            service_path,
            flags,
            vctx,
        }
    }

    /// Content type of the translated response body.
    pub fn content_type(&self) -> &'static str {
        if self.jsonld {
            "application/ld+json"
        } else {
            "application/json"
        }
    }
}

/// Formats the JSON-LD context `Link` header value for `url`.
pub fn context_link(url: &str) -> String {
    format!("<{url}>; rel=\"http://www.w3.org/ns/json-ld#context\"; type=\"application/ld+json\"")
}

/// Applies the negotiated response headers: tenant/path echo, the context
/// `Link` on non-JSON-LD successes, and `Preference-Applied` when a
/// version preference was declared.
pub fn decorate(response: &mut Response, ctx: &RequestContext, config: &GatewayConfig) {
    let status = response.status();
    let headers = response.headers_mut();

    if let Some(tenant) = &ctx.tenant {
        if let Ok(value) = HeaderValue::from_str(tenant) {
            headers.insert("NGSILD-Tenant", value);
        }
    }
    if let Some(path) = &ctx.service_path {
        if let Ok(value) = HeaderValue::from_str(path) {
            headers.insert("NGSILD-Path", value);
        }
    }
    if !ctx.jsonld && status.is_success() {
        if let Ok(value) = HeaderValue::from_str(&context_link(&config.user_context)) {
            headers.append(header::LINK, value);
        }
    }
    if ctx.vctx.declared.is_some() {
        let applied = format!("ngsi-ld={}", ctx.vctx.effective().as_wire());
        if let Ok(value) = HeaderValue::from_str(&applied) {
            headers.insert("Preference-Applied", value);
        }
    }
}

/// Builds a decorated response with an optional translated payload.
pub fn ld_response(
    status: u16,
    payload: Option<Value>,
    ctx: &RequestContext,
    config: &GatewayConfig,
) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = match payload {
        Some(payload) => (
            status,
            [(header::CONTENT_TYPE, ctx.content_type())],
            Json(payload),
        )
            .into_response(),
        None => status.into_response(),
    };
    decorate(&mut response, ctx, config);
    response
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn header_str_named<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn accept_header_selects_json_ld() {
        let config = GatewayConfig::default();
        let ctx = RequestContext::new(
            &config,
            &headers(&[("accept", "application/ld+json")]),
            &HashMap::new(),
            false,
        );
        assert!(ctx.jsonld);
        assert_eq!(ctx.content_type(), "application/ld+json");

        let ctx = RequestContext::new(&config, &headers(&[]), &HashMap::new(), false);
        assert!(!ctx.jsonld);
    }

    #[test]
    fn prefer_header_declares_a_version() {
        let config = GatewayConfig::default();
        let ctx = RequestContext::new(
            &config,
            &headers(&[("prefer", "ngsi-ld=1.6")]),
            &HashMap::new(),
            false,
        );
        assert_eq!(ctx.vctx.effective().as_wire(), "1.6");
    }

    #[test]
    fn scope_is_normalized_to_a_leading_slash() {
        let config = GatewayConfig::default();
        let query: HashMap<String, String> =
            [("scopeQ".to_string(), "building1".to_string())].into_iter().collect();
        let ctx = RequestContext::new(&config, &headers(&[]), &query, false);
        assert_eq!(ctx.service_path.as_deref(), Some("/building1"));
    }

    #[test]
    fn responses_carry_the_context_link_and_echo_headers() {
        let config = GatewayConfig::default();
        let ctx = RequestContext::new(
            &config,
            &headers(&[("ngsild-tenant", "farm01"), ("prefer", "ngsi-ld=1.6")]),
            &HashMap::new(),
            false,
        );
        let response = ld_response(200, Some(serde_json::json!({})), &ctx, &config);
        let headers = response.headers();
        assert_eq!(headers.get("NGSILD-Tenant").unwrap(), "farm01");
        assert_eq!(headers.get("Preference-Applied").unwrap(), "ngsi-ld=1.6");
        assert!(headers
            .get(header::LINK)
            .unwrap()
            .to_str()
            .unwrap()
            .contains(&config.user_context));
    }
}
