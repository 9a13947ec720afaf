//! Router assembly for the node HTTP API.
//!
//! [`build_router`] wires all handler functions to their routes with
//! CORS and tracing middleware layers.

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Builds the complete axum router with all API routes.
///
/// Routes use axum 0.8 `/{param}` path syntax.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/queries",
            get(handlers::queries::list_queries).post(handlers::queries::save_query),
        )
        .route(
            "/queries/{universal_id}",
            get(handlers::queries::get_query)
                .put(handlers::queries::mirror_query)
                .delete(handlers::queries::delete_query),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
