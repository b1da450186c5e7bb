use axum::{middleware as axum_mw, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers::{self, analytics, stream};
use crate::middleware::tracking;
use crate::AppState;

/// Builds the full Axum `Router`: reporting routes plus the tracking middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ── Reporting surface ───────────────────────────────────
        .route("/analytics/overview", get(analytics::overview))
        .route("/analytics/endpoints", get(analytics::list_endpoints))
        .route("/analytics/endpoints/*path", get(analytics::get_endpoint))
        .route("/analytics/clients", get(analytics::list_clients))
        .route("/analytics/clients/:id", get(analytics::get_client))
        .route("/analytics/resources", get(analytics::list_resources))
        .route("/analytics/timeseries", get(analytics::time_series))
        .route("/analytics/latency", get(analytics::latency))
        .route("/analytics/stream", get(stream::overview_stream))
        .route("/health", get(analytics::health))
        // ── Everything else answers a JSON 404, still recorded ──
        .fallback(handlers::not_found)
        // ── Provide shared state to all routes above ────────────
        .with_state(state.clone())
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn_with_state(state, tracking::track_requests))
        .layer(CorsLayer::permissive())
}
