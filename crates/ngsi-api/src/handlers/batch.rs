//! Batch entity operations
//!
//! All four operations funnel into the backend's single batch-update
//! endpoint, differing only in the action type and how the body is
//! converted.

use axum::extract::{OriginalUri, State};
use axum::http::{HeaderMap, Uri};
use axum::response::Response;
use axum::Json;
use serde_json::{json, Value};

use ngsi_conv::entity;
use ngsi_core::{BrokerRequest, TransformFlags, Verb};

use super::{call_broker, ensure_success};
use crate::error::Problem;
use crate::negotiation::{ld_response, RequestContext};
use crate::state::AppState;

/// POST /entityOperations/create
pub async fn create_entities(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, Problem> {
    batch_update(&state, &headers, "append_strict", converted_entities(&state, &body), &uri).await
}

/// POST /entityOperations/upsert
pub async fn upsert_entities(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, Problem> {
    batch_update(&state, &headers, "append", converted_entities(&state, &body), &uri).await
}

/// POST /entityOperations/update
pub async fn update_entities(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, Problem> {
    batch_update(&state, &headers, "replace", converted_entities(&state, &body), &uri).await
}

/// POST /entityOperations/delete - the body is a list of entity ids
pub async fn delete_entities(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, Problem> {
    let entities: Vec<Value> = body
        .as_array()
        .map(|ids| ids.iter().map(|id| json!({ "id": id })).collect())
        .unwrap_or_default();
    batch_update(&state, &headers, "delete", entities, &uri).await
}

fn converted_entities(state: &AppState, body: &Value) -> Vec<Value> {
    let flags = TransformFlags::default();
    body.as_array()
        .map(|items| {
            items
                .iter()
                .map(|item| entity::ld_to_v2(item, &flags, state.config.value_type()))
                .collect()
        })
        .unwrap_or_default()
}

async fn batch_update(
    state: &AppState,
    headers: &HeaderMap,
    action_type: &str,
    entities: Vec<Value>,
    uri: &Uri,
) -> Result<Response, Problem> {
    let empty = std::collections::HashMap::new();
    let ctx = RequestContext::new(&state.config, headers, &empty, false);
    let req = BrokerRequest::new(Verb::Post, "/op/update")
        .with_scope(ctx.tenant.clone(), ctx.service_path.clone())
        .with_body(json!({ "actionType": action_type, "entities": entities }));
    let backend = call_broker(state, req, uri.path()).await?;
    ensure_success(&backend)?;
    Ok(ld_response(backend.status, None, &ctx, &state.config))
}
