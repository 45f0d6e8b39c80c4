//! Entity CRUD proxying
//!
//! Reads translate the backend payload into the gateway dialect; writes
//! translate the request body into the backend dialect and pass the
//! backend status back with an empty body. Merge is the one
//! read-before-write flow.

use std::collections::HashMap;

use axum::extract::{OriginalUri, Path, Query, State};
use axum::http::{HeaderMap, Uri};
use axum::response::Response;
use axum::Json;
use serde_json::{json, Value};

use ngsi_conv::{attribute, entity, merge, query};
use ngsi_core::{BrokerRequest, TransformFlags, Verb};

use super::{call_broker, ensure_success};
use crate::error::Problem;
use crate::negotiation::{ld_response, RequestContext};
use crate::pagination;
use crate::state::AppState;

/// GET /entities
pub async fn list_entities(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, Problem> {
    let ctx = RequestContext::new(&state.config, &headers, &params, false);
    proxy_read(&state, &ctx, "/entities".to_string(), &params, &uri).await
}

/// GET /entities/{id}
pub async fn read_entity(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, Problem> {
    let ctx = RequestContext::new(&state.config, &headers, &params, false);
    proxy_read(&state, &ctx, format!("/entities/{id}"), &params, &uri).await
}

/// GET /entities/{id}/attrs/{attr}
pub async fn read_attribute(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path((id, attr)): Path<(String, String)>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, Problem> {
    let ctx = RequestContext::new(&state.config, &headers, &params, true);
    proxy_read(
        &state,
        &ctx,
        format!("/entities/{id}/attrs/{attr}"),
        &params,
        &uri,
    )
    .await
}

async fn proxy_read(
    state: &AppState,
    ctx: &RequestContext,
    backend_path: String,
    params: &HashMap<String, String>,
    uri: &Uri,
) -> Result<Response, Problem> {
    let display = uri.path();
    let req = BrokerRequest::new(Verb::Get, backend_path)
        .with_query(query::translate(params, &ctx.flags))
        .with_scope(ctx.tenant.clone(), ctx.service_path.clone());
    let backend = call_broker(state, req, display).await?;
    ensure_success(&backend)?;

    let body = backend.body.clone().unwrap_or_else(|| json!({}));

    // The backend cannot filter on more than one type; the fetch ran
    // unfiltered and a single-entity mismatch is a miss.
    let requested = query::requested_types(params);
    if requested.len() > 1 && body.is_object() {
        let actual = body.get("type").and_then(Value::as_str).unwrap_or_default();
        if !requested.iter().any(|t| t == actual) {
            return Err(Problem::resource_not_found(display));
        }
    }

    let payload = if ctx.flags.key_values {
        // The backend's values-only representation is already compatible
        ngsi_conv::append_context(body, ctx.jsonld, &state.config.user_context)
    } else if ctx.flags.attrs_only {
        attribute::v2_to_ld(&body, &ctx.flags, &ctx.vctx).unwrap_or(Value::Null)
    } else if let Value::Array(items) = &body {
        Value::Array(
            items
                .iter()
                .map(|item| {
                    entity::v2_to_ld(
                        item,
                        ctx.jsonld,
                        &ctx.flags,
                        &ctx.vctx,
                        &state.config.user_context,
                    )
                })
                .collect(),
        )
    } else {
        entity::v2_to_ld(
            &body,
            ctx.jsonld,
            &ctx.flags,
            &ctx.vctx,
            &state.config.user_context,
        )
    };

    let returned = payload.as_array().map(Vec::len);
    let mut response = ld_response(backend.status, Some(payload), ctx, &state.config);
    let full_path = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or(display);
    pagination::apply(response.headers_mut(), &backend, returned, &ctx.flags, full_path);
    Ok(response)
}

/// POST /entities
pub async fn create_entity(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, Problem> {
    let v2_body = entity::ld_to_v2(&body, &TransformFlags::default(), state.config.value_type());
    write_through(&state, &headers, Verb::Post, "/entities".to_string(), v2_body, &uri).await
}

/// POST /entities/{id}/attrs
pub async fn append_attributes(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, Problem> {
    let v2_body = entity::ld_to_v2(&body, &TransformFlags::default(), state.config.value_type());
    write_through(
        &state,
        &headers,
        Verb::Post,
        format!("/entities/{id}/attrs"),
        v2_body,
        &uri,
    )
    .await
}

/// PATCH /entities/{id}/attrs
pub async fn update_attributes(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, Problem> {
    let v2_body = entity::ld_to_v2(&body, &TransformFlags::default(), state.config.value_type());
    write_through(
        &state,
        &headers,
        Verb::Patch,
        format!("/entities/{id}/attrs"),
        v2_body,
        &uri,
    )
    .await
}

/// PUT /entities/{id} - overwrite, expressed as a PUT of the attribute map
pub async fn replace_entity(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, Problem> {
    let mut v2_body =
        entity::ld_to_v2(&body, &TransformFlags::default(), state.config.value_type());
    if let Some(obj) = v2_body.as_object_mut() {
        obj.remove("type");
    }
    write_through(
        &state,
        &headers,
        Verb::Put,
        format!("/entities/{id}/attrs"),
        v2_body,
        &uri,
    )
    .await
}

/// PATCH /entities/{id} - merge: fetch, merge in the gateway dialect,
/// apply null deletions, write the result back.
pub async fn merge_entity(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, Problem> {
    let empty = HashMap::new();
    let ctx = RequestContext::new(&state.config, &headers, &empty, false);
    let display = uri.path();
    let scope = (ctx.tenant.clone(), ctx.service_path.clone());

    let current = call_broker(
        &state,
        BrokerRequest::new(Verb::Get, format!("/entities/{id}"))
            .with_scope(scope.0.clone(), scope.1.clone()),
        display,
    )
    .await?;
    if current.status == 404 {
        return Err(Problem::resource_not_found(display));
    }
    ensure_success(&current)?;

    let flags = TransformFlags::default();
    let mut merged = entity::v2_to_ld(
        &current.body.unwrap_or_else(|| json!({})),
        false,
        &flags,
        &ctx.vctx,
        &state.config.user_context,
    );
    let patch = entity::normalize(&merge::strip_null_markers(&body), &ctx.vctx);
    merge::deep_merge(&mut merged, &patch);
    merge::apply_null_deletions(&mut merged, &body);

    let mut v2_body = entity::ld_to_v2(&merged, &flags, state.config.value_type());
    if let Some(obj) = v2_body.as_object_mut() {
        obj.remove("id");
        obj.remove("type");
    }

    let backend = call_broker(
        &state,
        BrokerRequest::new(Verb::Put, format!("/entities/{id}/attrs"))
            .with_scope(scope.0, scope.1)
            .with_body(v2_body),
        display,
    )
    .await?;
    ensure_success(&backend)?;
    Ok(ld_response(backend.status, None, &ctx, &state.config))
}

/// DELETE /entities/{id}
pub async fn delete_entity(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, Problem> {
    let empty = HashMap::new();
    let ctx = RequestContext::new(&state.config, &headers, &empty, false);
    let req = BrokerRequest::new(Verb::Delete, format!("/entities/{id}"))
        .with_scope(ctx.tenant.clone(), ctx.service_path.clone());
    let backend = call_broker(&state, req, uri.path()).await?;
    ensure_success(&backend)?;
    Ok(ld_response(backend.status, None, &ctx, &state.config))
}

/// PATCH /entities/{id}/attrs/{attr}
pub async fn update_attribute(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path((id, attr)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, Problem> {
    let mut payload = serde_json::Map::new();
    payload.insert(attr, attribute::ld_to_v2(&body, state.config.value_type()));
    let v2_body = Value::Object(payload);
    write_through(
        &state,
        &headers,
        Verb::Patch,
        format!("/entities/{id}/attrs"),
        v2_body,
        &uri,
    )
    .await
}

/// PUT /entities/{id}/attrs/{attr}
pub async fn replace_attribute(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path((id, attr)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, Problem> {
    let v2_body = attribute::ld_to_v2(&body, state.config.value_type());
    write_through(
        &state,
        &headers,
        Verb::Put,
        format!("/entities/{id}/attrs/{attr}"),
        v2_body,
        &uri,
    )
    .await
}

/// DELETE /entities/{id}/attrs/{attr}
pub async fn delete_attribute(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path((id, attr)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, Problem> {
    let empty = HashMap::new();
    let ctx = RequestContext::new(&state.config, &headers, &empty, false);
    let req = BrokerRequest::new(Verb::Delete, format!("/entities/{id}/attrs/{attr}"))
        .with_scope(ctx.tenant.clone(), ctx.service_path.clone());
    let backend = call_broker(&state, req, uri.path()).await?;
    ensure_success(&backend)?;
    Ok(ld_response(backend.status, None, &ctx, &state.config))
}

/// DELETE /entities - purge by filter
///
/// The projection parameters are interpreted inversely here: picked
/// attributes are removed (a batch replace of the projected remainder),
/// and with no projection at all the matching entities are batch deleted.
pub async fn purge_entities(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, Problem> {
    let mut ctx = RequestContext::new(&state.config, &headers, &params, false);
    ctx.flags.swap_projection();
    let display = uri.path();

    let req = BrokerRequest::new(Verb::Get, "/entities")
        .with_query(query::translate(&params, &ctx.flags))
        .with_scope(ctx.tenant.clone(), ctx.service_path.clone());
    let fetched = call_broker(&state, req, display).await?;
    ensure_success(&fetched)?;

    let body = fetched.body.unwrap_or_else(|| json!([]));
    let requested = query::requested_types(&params);
    if requested.len() > 1 && body.is_object() {
        let actual = body.get("type").and_then(Value::as_str).unwrap_or_default();
        if !requested.iter().any(|t| t == actual) {
            return Err(Problem::resource_not_found(display));
        }
    }

    let projected = ctx.flags.pick.is_some() || !ctx.flags.omit.is_empty();
    let items = body.as_array().cloned().unwrap_or_default();
    let (action_type, entities) = if projected {
        let entities: Vec<Value> = items
            .iter()
            .map(|item| {
                let mut projected =
                    entity::ld_to_v2(item, &ctx.flags, state.config.value_type());
                if let (Some(obj), Some(src)) = (projected.as_object_mut(), item.as_object()) {
                    if let Some(id) = src.get("id") {
                        obj.insert("id".to_string(), id.clone());
                    }
                    if let Some(entity_type) = src.get("type") {
                        obj.insert("type".to_string(), entity_type.clone());
                    }
                }
                projected
            })
            .collect();
        ("replace", entities)
    } else {
        let entities: Vec<Value> = items
            .iter()
            .map(|item| {
                json!({
                    "id": item.get("id").cloned().unwrap_or(Value::Null),
                    "type": item.get("type").cloned().unwrap_or(Value::Null)
                })
            })
            .collect();
        ("delete", entities)
    };

    let batch = BrokerRequest::new(Verb::Post, "/op/update")
        .with_scope(ctx.tenant.clone(), ctx.service_path.clone())
        .with_body(json!({ "actionType": action_type, "entities": entities }));
    let backend = call_broker(&state, batch, display).await?;
    ensure_success(&backend)?;
    Ok(ld_response(backend.status, None, &ctx, &state.config))
}

async fn write_through(
    state: &AppState,
    headers: &HeaderMap,
    verb: Verb,
    backend_path: String,
    body: Value,
    uri: &Uri,
) -> Result<Response, Problem> {
    let empty = HashMap::new();
    let ctx = RequestContext::new(&state.config, headers, &empty, false);
    let req = BrokerRequest::new(verb, backend_path)
        .with_scope(ctx.tenant.clone(), ctx.service_path.clone())
        .with_body(body);
    let backend = call_broker(state, req, uri.path()).await?;
    ensure_success(&backend)?;
    Ok(ld_response(backend.status, None, &ctx, &state.config))
}
