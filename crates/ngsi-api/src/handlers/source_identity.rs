//! Context-source identity
//!
//! Reports who the gateway is translating for, wrapped around the
//! backend's version probe. This response links the core context rather
//! than the user context.

use std::collections::HashMap;

use axum::extract::{OriginalUri, Query, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::Response;
use serde_json::json;

use ngsi_conv::introspection;
use ngsi_core::{BrokerRequest, Verb};

use super::{call_broker, ensure_success};
use crate::error::Problem;
use crate::negotiation::{context_link, ld_response, RequestContext};
use crate::state::AppState;

/// GET /info/sourceIdentity
pub async fn get_identity(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, Problem> {
    let ctx = RequestContext::new(&state.config, &headers, &params, false);
    let req = BrokerRequest::new(Verb::Get, "/version")
        .at_root()
        .with_scope(ctx.tenant.clone(), ctx.service_path.clone());
    let backend = call_broker(&state, req, uri.path()).await?;
    ensure_success(&backend)?;

    let payload = introspection::source_identity(
        &backend.body.unwrap_or_else(|| json!({})),
        ctx.jsonld,
        &state.config.user_context,
    );
    let mut response = ld_response(backend.status, Some(payload), &ctx, &state.config);
    if !ctx.jsonld {
        if let Ok(value) = HeaderValue::from_str(&context_link(&state.config.core_context)) {
            response.headers_mut().insert(header::LINK, value);
        }
    }
    Ok(response)
}
