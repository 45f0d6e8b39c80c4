//! Attribute introspection
//!
//! Both endpoints aggregate over the backend type registry; the backend
//! has no attribute registry of its own.

use std::collections::HashMap;

use axum::extract::{OriginalUri, Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use serde_json::{json, Value};

use ngsi_conv::introspection;
use ngsi_core::{BrokerRequest, Verb};

use super::{call_broker, ensure_success};
use crate::error::Problem;
use crate::negotiation::{ld_response, RequestContext};
use crate::state::AppState;

/// GET /attributes
pub async fn list_attributes(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, Problem> {
    let ctx = RequestContext::new(&state.config, &headers, &params, false);
    let req = BrokerRequest::new(Verb::Get, "/types")
        .with_scope(ctx.tenant.clone(), ctx.service_path.clone());
    let backend = call_broker(&state, req, uri.path()).await?;
    ensure_success(&backend)?;

    let payload = introspection::entity_attribute_list(
        &backend.body.unwrap_or_else(|| json!([])),
        ctx.jsonld,
        &state.config.user_context,
    );
    if payload
        .get("attributeList")
        .and_then(Value::as_array)
        .is_none_or(|list| list.is_empty())
    {
        return Err(Problem::resource_not_found(uri.path()));
    }
    Ok(ld_response(backend.status, Some(payload), &ctx, &state.config))
}

/// GET /attributes/{attr}
pub async fn read_attribute(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(attr): Path<String>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, Problem> {
    let ctx = RequestContext::new(&state.config, &headers, &params, false);
    let req = BrokerRequest::new(Verb::Get, "/types")
        .with_scope(ctx.tenant.clone(), ctx.service_path.clone());
    let backend = call_broker(&state, req, uri.path()).await?;
    ensure_success(&backend)?;

    let payload = introspection::entity_attribute(
        &backend.body.unwrap_or_else(|| json!([])),
        ctx.jsonld,
        &state.config.user_context,
        &attr,
    );
    if payload.get("attributeCount").and_then(Value::as_u64) == Some(0) {
        return Err(Problem::resource_not_found(&attr));
    }
    Ok(ld_response(backend.status, Some(payload), &ctx, &state.config))
}
