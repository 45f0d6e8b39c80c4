//! ngsi-api - NGSI-LD REST layer over an NGSI-v2 context broker
//!
//! This crate wires the transcoders from `ngsi-conv` into an axum router.
//! Handlers orchestrate per request kind: translate the query, call the
//! broker through the injected transport, map failures into problem
//! details, convert success payloads, and attach pagination and
//! negotiation headers.
//!
//! # Usage
//!
//! ```ignore
//! use ngsi_api::{create_router, AppState};
//! use ngsi_client::{HttpRelay, V2Client};
//!
//! let broker = Arc::new(V2Client::new(&config)?);
//! let relay = Arc::new(HttpRelay::new(&config)?);
//! let router = create_router(AppState::new(config, broker, relay));
//! ```

pub mod error;
pub mod handlers;
pub mod negotiation;
pub mod pagination;
pub mod state;

pub use error::Problem;
pub use state::AppState;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Responds to a preflight with the verbs a route group supports.
async fn preflight(allow: &'static str, accept_patch: Option<&'static str>) -> Response {
    let mut response = StatusCode::OK.into_response();
    response
        .headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static(allow));
    if let Some(value) = accept_patch {
        response
            .headers_mut()
            .insert("Accept-Patch", HeaderValue::from_static(value));
    }
    response
}

const PATCH_TYPES: &str = "application/json, application/ld+json, application/merge-patch+json";
const DOCUMENT_TYPES: &str = "application/json, application/ld+json";

fn ld_router() -> Router<AppState> {
    Router::new()
        // Entities
        .route(
            "/entities",
            get(handlers::entities::list_entities)
                .post(handlers::entities::create_entity)
                .delete(handlers::entities::purge_entities)
                .options(|| preflight("GET,POST,DELETE,OPTIONS", None)),
        )
        .route(
            "/entities/{id}",
            get(handlers::entities::read_entity)
                .put(handlers::entities::replace_entity)
                .patch(handlers::entities::merge_entity)
                .delete(handlers::entities::delete_entity)
                .options(|| preflight("GET,PATCH,PUT,DELETE,OPTIONS", Some(PATCH_TYPES))),
        )
        // Entity attributes
        .route(
            "/entities/{id}/attrs",
            post(handlers::entities::append_attributes)
                .patch(handlers::entities::update_attributes)
                .options(|| preflight("GET,PATCH,POST,OPTIONS", Some(DOCUMENT_TYPES))),
        )
        .route(
            "/entities/{id}/attrs/{attr}",
            get(handlers::entities::read_attribute)
                .patch(handlers::entities::update_attribute)
                .put(handlers::entities::replace_attribute)
                .delete(handlers::entities::delete_attribute)
                .options(|| preflight("GET,PATCH,PUT,DELETE,OPTIONS", Some(DOCUMENT_TYPES))),
        )
        // Subscriptions
        .route(
            "/subscriptions",
            get(handlers::subscriptions::list_subscriptions)
                .post(handlers::subscriptions::create_subscription)
                .options(|| preflight("GET,POST,OPTIONS", None)),
        )
        .route(
            "/subscriptions/{id}",
            get(handlers::subscriptions::read_subscription)
                .patch(handlers::subscriptions::update_subscription)
                .delete(handlers::subscriptions::delete_subscription)
                .options(|| preflight("GET,PATCH,DELETE,OPTIONS", None)),
        )
        // Types
        .route(
            "/types",
            get(handlers::types::list_types).options(|| preflight("GET,OPTIONS", None)),
        )
        .route(
            "/types/{type}",
            get(handlers::types::read_type).options(|| preflight("GET,OPTIONS", None)),
        )
        // Attributes
        .route(
            "/attributes",
            get(handlers::attributes::list_attributes).options(|| preflight("GET,OPTIONS", None)),
        )
        .route(
            "/attributes/{attr}",
            get(handlers::attributes::read_attribute).options(|| preflight("GET,OPTIONS", None)),
        )
        // Notifications
        .route("/notify", post(handlers::notify::notify_ld))
        // Batch operations
        .route(
            "/entityOperations/create",
            post(handlers::batch::create_entities).options(|| preflight("POST,OPTIONS", None)),
        )
        .route(
            "/entityOperations/upsert",
            post(handlers::batch::upsert_entities).options(|| preflight("POST,OPTIONS", None)),
        )
        .route(
            "/entityOperations/update",
            post(handlers::batch::update_entities).options(|| preflight("POST,OPTIONS", None)),
        )
        .route(
            "/entityOperations/delete",
            post(handlers::batch::delete_entities).options(|| preflight("POST,OPTIONS", None)),
        )
        // Introspection
        .route(
            "/info/sourceIdentity",
            get(handlers::source_identity::get_identity).options(|| preflight("GET,OPTIONS", None)),
        )
        // Entity maps
        .route(
            "/entityMap",
            get(handlers::entity_map::generate).options(|| preflight("GET,OPTIONS", None)),
        )
        .route(
            "/entityMap/{id}",
            get(handlers::entity_map::read)
                .patch(handlers::entity_map::merge)
                .options(|| preflight("GET,PATCH,OPTIONS", Some(PATCH_TYPES))),
        )
}

/// Creates the gateway router with the given application state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::context::health))
        // The context document clients are pointed at
        .route("/context.jsonld", get(handlers::context::serve_context))
        .nest("/ngsi-ld/v1", ld_router())
        // Backend-dialect notification relay
        .nest(
            "/ngsi/v2",
            Router::new().route("/notify", post(handlers::notify::notify_v2)),
        )
        // Any route the gateway does not serve
        .fallback(error::unknown_route)
        // Middleware
        .layer(axum::middleware::from_fn(error::method_not_allowed_layer))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
