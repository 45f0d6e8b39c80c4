//! Problem-detail responses and the backend error mapping

use axum::extract::Request;
use axum::http::{header, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use ngsi_core::constants::ERROR_TYPE_PREFIX;
use ngsi_core::TransportError;

/// A gateway-dialect problem response.
///
/// Everything a handler can fail with becomes one of these; nothing else
/// reaches the transport layer.
#[derive(Debug)]
pub struct Problem {
    pub status: StatusCode,
    pub body: Value,
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, body = %self.body, "Gateway error");
        } else {
            tracing::debug!(status = %self.status, body = %self.body, "Client-facing error");
        }
        (self.status, Json(self.body)).into_response()
    }
}

fn reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Error")
}

impl Problem {
    /// Maps a transport failure to its problem payload.
    pub fn transport(err: &TransportError, path: &str) -> Self {
        let (status, suffix, message) = match err {
            TransportError::NameResolutionFailed(_) => (
                StatusCode::NOT_FOUND,
                "ResourceNotFound",
                format!("{path} cannot be found"),
            ),
            TransportError::TimedOut => (
                StatusCode::GATEWAY_TIMEOUT,
                "GatewayTimeout",
                format!("{path} did not respond in time"),
            ),
            TransportError::ConnectionRefused(_) => (
                StatusCode::BAD_GATEWAY,
                "BadGateway",
                format!("{path} server is unavailable"),
            ),
            TransportError::Other(code) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalError",
                format!("{path} caused an error: {code}"),
            ),
        };
        Self {
            status,
            body: json!({
                "type": format!("{ERROR_TYPE_PREFIX}{suffix}"),
                "title": reason(status),
                "message": message
            }),
        }
    }

    /// Maps a non-2xx backend reply to its problem payload.
    ///
    /// A `description` field is renamed to `message`, a bare `error` field
    /// is dropped, and a problem `type` the backend already supplied is
    /// left untouched.
    pub fn backend(status: u16, body: Option<Value>) -> Self {
        let mut body = body.unwrap_or_else(|| json!({}));
        if let Some(obj) = body.as_object_mut() {
            if let Some(description) = obj.remove("description") {
                obj.insert("message".to_string(), description);
            }
            obj.remove("error");
            if obj.contains_key("type") {
                return Self {
                    status: to_status(status),
                    body,
                };
            }
        }

        let message = body.get("message").and_then(Value::as_str).unwrap_or_default();
        let (ld_status, suffix, title) = match status {
            400 => (400, "BadRequestData", None),
            403 => (403, "TooComplexQuery", None),
            404 => (404, "NotFound", None),
            422 if message == "Already Exists" => (409, "AlreadyExists", Some("Already Exists")),
            422 => (409, "Conflict", None),
            501 => (501, "NoMultiTenantSupport", None),
            503 => (503, "LdContextNotAvailable", None),
            other => (other, "InvalidRequest", None),
        };
        let status = to_status(ld_status);
        if let Some(obj) = body.as_object_mut() {
            obj.insert(
                "type".to_string(),
                json!(format!("{ERROR_TYPE_PREFIX}{suffix}")),
            );
            obj.insert(
                "title".to_string(),
                json!(title.unwrap_or_else(|| reason(status))),
            );
        }
        Self { status, body }
    }

    /// A gateway-generated 404.
    pub fn resource_not_found(detail: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: json!({
                "type": format!("{ERROR_TYPE_PREFIX}ResourceNotFound"),
                "title": reason(StatusCode::NOT_FOUND),
                "detail": detail
            }),
        }
    }

    /// A gateway-generated 400 (missing or malformed request input).
    pub fn bad_request(detail: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: json!({
                "type": format!("{ERROR_TYPE_PREFIX}BadRequestData"),
                "title": reason(StatusCode::BAD_REQUEST),
                "detail": detail
            }),
        }
    }
}

fn to_status(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn method_not_allowed_body(method: &Method, path: &str) -> Value {
    json!({
        "type": "urn:ngsi-ld:MethodNotAllowed",
        "title": reason(StatusCode::METHOD_NOT_ALLOWED),
        "message": format!("{method} not supported for {path}")
    })
}

/// Middleware that replaces the router's empty 405 replies with a problem
/// payload while keeping the `Allow` header the router computed.
pub async fn method_not_allowed_layer(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let response = next.run(req).await;
    if response.status() != StatusCode::METHOD_NOT_ALLOWED {
        return response;
    }
    let allow = response.headers().get(header::ALLOW).cloned();
    let mut replaced = (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(method_not_allowed_body(&method, &path)),
    )
        .into_response();
    if let Some(allow) = allow {
        replaced.headers_mut().insert(header::ALLOW, allow);
    }
    replaced
}

/// Fallback for paths the router does not know at all.
pub async fn unknown_route(method: Method, req: Request) -> Response {
    let path = req.uri().path().to_string();
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(method_not_allowed_body(&method, &path)),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn backend_conflict_is_sniffed_for_already_exists() {
        let problem = Problem::backend(422, Some(json!({ "description": "Already Exists" })));
        assert_eq!(problem.status, StatusCode::CONFLICT);
        assert_eq!(
            problem.body["type"],
            json!("https://uri.etsi.org/ngsi-ld/errors/AlreadyExists")
        );
        assert_eq!(problem.body["title"], json!("Already Exists"));
        assert_eq!(problem.body["message"], json!("Already Exists"));

        let problem = Problem::backend(422, Some(json!({ "description": "something else" })));
        assert_eq!(problem.status, StatusCode::CONFLICT);
        assert_eq!(
            problem.body["type"],
            json!("https://uri.etsi.org/ngsi-ld/errors/Conflict")
        );
    }

    #[test]
    fn backend_statuses_map_through_the_table() {
        for (backend, gateway, suffix) in [
            (400, 400, "BadRequestData"),
            (403, 403, "TooComplexQuery"),
            (404, 404, "NotFound"),
            (501, 501, "NoMultiTenantSupport"),
            (503, 503, "LdContextNotAvailable"),
            (418, 418, "InvalidRequest"),
        ] {
            let problem = Problem::backend(backend, None);
            assert_eq!(problem.status.as_u16(), gateway);
            assert_eq!(
                problem.body["type"],
                json!(format!("https://uri.etsi.org/ngsi-ld/errors/{suffix}"))
            );
        }
    }

    #[test]
    fn description_is_renamed_and_error_dropped() {
        let problem = Problem::backend(
            404,
            Some(json!({ "error": "NotFound", "description": "no such entity" })),
        );
        assert_eq!(problem.body["message"], json!("no such entity"));
        assert!(problem.body.get("error").is_none());
        assert!(problem.body.get("description").is_none());
    }

    #[test]
    fn pre_supplied_problem_types_are_preserved() {
        let problem = Problem::backend(
            404,
            Some(json!({ "type": "https://uri.etsi.org/ngsi-ld/errors/ResourceNotFound", "title": "Not Found" })),
        );
        assert_eq!(
            problem.body["type"],
            json!("https://uri.etsi.org/ngsi-ld/errors/ResourceNotFound")
        );
    }

    #[test]
    fn transport_failures_map_to_their_statuses() {
        let cases: [(TransportError, StatusCode, &str); 4] = [
            (
                TransportError::NameResolutionFailed("dns".to_string()),
                StatusCode::NOT_FOUND,
                "ResourceNotFound",
            ),
            (TransportError::TimedOut, StatusCode::GATEWAY_TIMEOUT, "GatewayTimeout"),
            (
                TransportError::ConnectionRefused("refused".to_string()),
                StatusCode::BAD_GATEWAY,
                "BadGateway",
            ),
            (
                TransportError::Other("EPROTO".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalError",
            ),
        ];
        for (err, status, suffix) in cases {
            let problem = Problem::transport(&err, "/entities");
            assert_eq!(problem.status, status);
            assert_eq!(
                problem.body["type"],
                json!(format!("https://uri.etsi.org/ngsi-ld/errors/{suffix}"))
            );
        }
    }
}
