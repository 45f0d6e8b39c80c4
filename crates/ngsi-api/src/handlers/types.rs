//! Entity-type introspection

use std::collections::HashMap;

use axum::extract::{OriginalUri, Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use serde_json::json;

use ngsi_conv::introspection;
use ngsi_core::{BrokerRequest, Verb};

use super::{call_broker, ensure_success};
use crate::error::Problem;
use crate::negotiation::{ld_response, RequestContext};
use crate::state::AppState;

/// GET /types
pub async fn list_types(
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

    let payload = introspection::entity_type_list(
        &backend.body.unwrap_or_else(|| json!([])),
        ctx.jsonld,
        &state.config.user_context,
    );
    Ok(ld_response(backend.status, Some(payload), &ctx, &state.config))
}

/// GET /types/{type}
pub async fn read_type(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(type_name): Path<String>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, Problem> {
    let ctx = RequestContext::new(&state.config, &headers, &params, false);
    let req = BrokerRequest::new(Verb::Get, format!("/types/{type_name}"))
        .with_scope(ctx.tenant.clone(), ctx.service_path.clone());
    let backend = call_broker(&state, req, uri.path()).await?;
    ensure_success(&backend)?;

    let payload = introspection::entity_type_information(
        &backend.body.unwrap_or_else(|| json!({})),
        ctx.jsonld,
        &state.config.user_context,
        &type_name,
    );
    Ok(ld_response(backend.status, Some(payload), &ctx, &state.config))
}
