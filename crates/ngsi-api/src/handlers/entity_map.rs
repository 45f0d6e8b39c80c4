//! Entity-map generation
//!
//! An entity map is a derived, never-persisted list of entity ids matching
//! a filter. The gateway sweeps the backend page by page (ids only) until
//! an empty page comes back; reads of stored maps always miss.

use std::collections::HashMap;

use axum::extract::{OriginalUri, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use serde_json::Value;

use ngsi_conv::{introspection, query};
use ngsi_core::{BrokerRequest, Verb};

use super::{call_broker, ensure_success};
use crate::error::Problem;
use crate::negotiation::{ld_response, RequestContext};
use crate::state::AppState;

/// GET /entityMap
pub async fn generate(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, Problem> {
    if !params.contains_key("q") && !params.contains_key("type") {
        return Err(Problem::bad_request(uri.path()));
    }

    let ctx = RequestContext::new(&state.config, &headers, &params, false);
    let page_limit = state.config.page_limit;

    // Base query: the translated filter with the sweep parameters forced
    let mut base_query: Vec<(String, String)> = query::translate(&params, &ctx.flags)
        .into_iter()
        .filter(|(key, _)| key != "attrs" && key != "limit" && key != "offset")
        .collect();
    base_query.push(("attrs".to_string(), "id".to_string()));
    base_query.push(("limit".to_string(), page_limit.to_string()));

    let mut ids: Vec<String> = Vec::new();
    let mut offset = 0usize;
    loop {
        let mut page_query = base_query.clone();
        if offset > 0 {
            page_query.push(("offset".to_string(), offset.to_string()));
        }
        let req = BrokerRequest::new(Verb::Get, "/entities")
            .with_query(page_query)
            .with_scope(ctx.tenant.clone(), ctx.service_path.clone());
        let backend = call_broker(&state, req, uri.path()).await?;
        ensure_success(&backend)?;

        let page: Vec<String> = backend
            .body
            .as_ref()
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get("id").and_then(Value::as_str))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        if page.is_empty() {
            break;
        }
        ids.extend(page);
        offset += page_limit;
    }

    let payload = introspection::entity_map(&ids, ctx.jsonld, &state.config.user_context);
    Ok(ld_response(200, Some(payload), &ctx, &state.config))
}

/// GET /entityMap/{id} - maps are not persisted, so this always misses
pub async fn read(OriginalUri(uri): OriginalUri) -> Problem {
    Problem::resource_not_found(uri.path())
}

/// PATCH /entityMap/{id} - maps are not persisted, so this always misses
pub async fn merge(OriginalUri(uri): OriginalUri) -> Problem {
    Problem::resource_not_found(uri.path())
}
