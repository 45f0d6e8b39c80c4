//! Served static artifacts

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::state::AppState;

/// GET /context.jsonld - the context document handed to clients
pub async fn serve_context(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, "application/ld+json")],
        Json(json!({
            "@context": [
                state.config.user_context.clone(),
                state.config.core_context.clone()
            ]
        })),
    )
        .into_response()
}

/// GET /health
pub async fn health() -> &'static str {
    "OK"
}
