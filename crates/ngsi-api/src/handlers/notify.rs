//! Notification relay
//!
//! The backend only ever notifies the gateway itself (the subscription
//! transcoder guarantees that); these handlers re-translate the payload
//! and re-dispatch it to the true subscriber named by the `Target` header.

use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};

use ngsi_conv::{entity, introspection};
use ngsi_core::constants::URN_PREFIX;
use ngsi_core::{TransformFlags, VersionContext};

use crate::error::Problem;
use crate::negotiation::context_link;
use crate::state::AppState;

/// POST /ngsi-ld/v1/notify - forward as a gateway-dialect notification
pub async fn notify_ld(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, Problem> {
    let Some(target) = header_value(&headers, "target") else {
        // No delivery target, nothing to relay
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    let accept = header_value(&headers, "accept").unwrap_or_else(|| "application/json".to_string());
    let jsonld = accept == "application/ld+json";

    let flags = TransformFlags::default();
    let vctx = VersionContext::new(
        state.config.spec_version(),
        state.config.value_type(),
        None,
    );
    let data: Vec<Value> = body
        .get("data")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| {
                    entity::v2_to_ld(item, jsonld, &flags, &vctx, &state.config.user_context)
                })
                .collect()
        })
        .unwrap_or_default();

    let subscription_id = body
        .get("subscriptionId")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let notified_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let envelope = introspection::ld_notification(subscription_id, &notified_at, data);

    let link = (!jsonld).then(|| context_link(&state.config.user_context));
    let reply = state
        .relay
        .deliver(&target, &accept, link, envelope)
        .await
        .map_err(|err| Problem::transport(&err, "/notify"))?;
    Ok(mirror(reply.status, reply.content_type, reply.body))
}

/// POST /ngsi/v2/notify - forward in the backend dialect
pub async fn notify_v2(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, Problem> {
    let Some(target) = header_value(&headers, "target") else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    let accept = header_value(&headers, "accept").unwrap_or_else(|| "application/json".to_string());

    let flags = TransformFlags::default();
    let data: Vec<Value> = body
        .get("data")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| entity::ld_to_v2(item, &flags, state.config.value_type()))
                .collect()
        })
        .unwrap_or_default();

    let subscription_id = body
        .get("subscriptionId")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let subscription_id = if subscription_id.starts_with(URN_PREFIX) {
        subscription_id.to_string()
    } else {
        format!("{URN_PREFIX}Subscription:{subscription_id}")
    };

    let payload = json!({ "id": subscription_id, "data": data });
    let reply = state
        .relay
        .deliver(&target, &accept, None, payload)
        .await
        .map_err(|err| Problem::transport(&err, "/notify"))?;
    Ok(mirror(reply.status, reply.content_type, reply.body))
}

/// Mirrors the subscriber's reply back to the backend.
fn mirror(status: u16, content_type: Option<String>, body: Option<Value>) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = match body {
        Some(body) => (status, Json(body)).into_response(),
        None => status.into_response(),
    };
    if let Some(content_type) = content_type {
        if let Ok(value) = HeaderValue::from_str(&content_type) {
            response.headers_mut().insert(header::CONTENT_TYPE, value);
        }
    }
    response
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}
