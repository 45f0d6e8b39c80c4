//! Subscription proxying
//!
//! Only relay-managed subscriptions (those whose delivery runs through the
//! gateway's custom HTTP block) are visible on the gateway side.

use std::collections::HashMap;

use axum::extract::{OriginalUri, Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::Response;
use axum::Json;
use serde_json::{json, Value};

use ngsi_conv::subscription;
use ngsi_core::{BrokerRequest, LdSubscription, V2Subscription, Verb};

use super::{call_broker, ensure_success};
use crate::error::Problem;
use crate::negotiation::{ld_response, RequestContext};
use crate::state::AppState;

const SUBSCRIPTION_URN_PREFIX: &str = "urn:ngsi-ld:Subscription:";

fn backend_id(id: &str) -> &str {
    id.strip_prefix(SUBSCRIPTION_URN_PREFIX).unwrap_or(id)
}

/// GET /subscriptions
pub async fn list_subscriptions(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, Problem> {
    let ctx = RequestContext::new(&state.config, &headers, &params, false);
    let req = BrokerRequest::new(Verb::Get, "/subscriptions")
        .with_scope(ctx.tenant.clone(), ctx.service_path.clone());
    let backend = call_broker(&state, req, uri.path()).await?;
    ensure_success(&backend)?;

    let payload = match backend.body {
        Some(Value::Array(items)) => {
            let subs: Vec<Value> = items
                .into_iter()
                .filter_map(|item| serde_json::from_value::<V2Subscription>(item).ok())
                .filter(|sub| {
                    sub.notification
                        .as_ref()
                        .is_some_and(|n| n.http_custom.is_some())
                })
                .filter_map(|sub| {
                    serde_json::to_value(subscription::v2_to_ld(
                        &sub,
                        ctx.jsonld,
                        &state.config.user_context,
                    ))
                    .ok()
                })
                .collect();
            Value::Array(subs)
        }
        _ => json!([]),
    };

    Ok(ld_response(backend.status, Some(payload), &ctx, &state.config))
}

/// GET /subscriptions/{id}
pub async fn read_subscription(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, Problem> {
    let ctx = RequestContext::new(&state.config, &headers, &params, false);
    let req = BrokerRequest::new(Verb::Get, format!("/subscriptions/{}", backend_id(&id)))
        .with_scope(ctx.tenant.clone(), ctx.service_path.clone());
    let backend = call_broker(&state, req, uri.path()).await?;
    ensure_success(&backend)?;

    let sub: V2Subscription = backend
        .body
        .clone()
        .and_then(|body| serde_json::from_value(body).ok())
        .unwrap_or_default();
    let payload = serde_json::to_value(subscription::v2_to_ld(
        &sub,
        ctx.jsonld,
        &state.config.user_context,
    ))
    .unwrap_or_else(|_| json!({}));

    Ok(ld_response(backend.status, Some(payload), &ctx, &state.config))
}

/// POST /subscriptions
pub async fn create_subscription(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Json(body): Json<LdSubscription>,
) -> Result<Response, Problem> {
    let empty = HashMap::new();
    let ctx = RequestContext::new(&state.config, &headers, &empty, false);
    let v2 = subscription::ld_to_v2(&body, &state.config.notification_relay());
    let req = BrokerRequest::new(Verb::Post, "/subscriptions")
        .with_scope(ctx.tenant.clone(), ctx.service_path.clone())
        .with_body(serde_json::to_value(&v2).unwrap_or_else(|_| json!({})));
    let backend = call_broker(&state, req, uri.path()).await?;
    ensure_success(&backend)?;

    let mut response = ld_response(backend.status, None, &ctx, &state.config);
    // Surface the new resource under its gateway identifier
    if let Some(location) = &backend.location {
        let rewritten = location.replace(
            "/v2/subscriptions/",
            &format!("/ngsi-ld/v1/subscriptions/{SUBSCRIPTION_URN_PREFIX}"),
        );
        if let Ok(value) = HeaderValue::from_str(&rewritten) {
            response.headers_mut().insert(header::LOCATION, value);
        }
    }
    Ok(response)
}

/// PATCH /subscriptions/{id}
pub async fn update_subscription(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<LdSubscription>,
) -> Result<Response, Problem> {
    let empty = HashMap::new();
    let ctx = RequestContext::new(&state.config, &headers, &empty, false);
    let v2 = subscription::ld_to_v2(&body, &state.config.notification_relay());
    let req = BrokerRequest::new(Verb::Patch, format!("/subscriptions/{}", backend_id(&id)))
        .with_scope(ctx.tenant.clone(), ctx.service_path.clone())
        .with_body(serde_json::to_value(&v2).unwrap_or_else(|_| json!({})));
    let backend = call_broker(&state, req, uri.path()).await?;
    ensure_success(&backend)?;
    Ok(ld_response(backend.status, None, &ctx, &state.config))
}

/// DELETE /subscriptions/{id}
pub async fn delete_subscription(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, Problem> {
    let empty = HashMap::new();
    let ctx = RequestContext::new(&state.config, &headers, &empty, false);
    let req = BrokerRequest::new(Verb::Delete, format!("/subscriptions/{}", backend_id(&id)))
        .with_scope(ctx.tenant.clone(), ctx.service_path.clone());
    let backend = call_broker(&state, req, uri.path()).await?;
    ensure_success(&backend)?;
    Ok(ld_response(backend.status, None, &ctx, &state.config))
}
