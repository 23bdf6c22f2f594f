//! HTTP routes for the relay
//!
//! Relay routes accept every method so the handler itself can answer
//! preflights and reject anything that is not `POST`.

pub mod health;
pub mod relay;

use std::sync::Arc;

use axum::{
    routing::{any, get},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub use relay::{ANTHROPIC_PATH, OPENROUTER_PATH, OPENROUTER_STREAM_PATH};

/// Create the main application router
///
/// No `CorsLayer` here: CORS headers are computed per request by the relay,
/// because a forbidden origin must get a bare 403.
pub fn create_router(state: Arc<AppState>) -> Router {
    let relay_routes = Router::new()
        .route(ANTHROPIC_PATH, any(relay::anthropic))
        .route(OPENROUTER_PATH, any(relay::openrouter))
        .route(OPENROUTER_STREAM_PATH, any(relay::openrouter_stream));

    let public_routes = Router::new().route("/health/live", get(health::liveness_check));

    Router::new()
        .merge(public_routes)
        .merge(relay_routes)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
