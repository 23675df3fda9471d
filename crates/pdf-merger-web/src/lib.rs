//! PDF Merger Web - HTTP front end for merging uploads into one PDF.
//!
//! The router is exposed as a library so it can be driven in-process by tests.

pub mod helpers;
pub mod routes;
pub mod state;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use state::AppState;

/// Build the application router with all routes configured.
pub fn app(state: Arc<AppState>) -> Router {
    let body_limit = state.config.limits.max_request_bytes;

    Router::new()
        .route("/health", get(routes::health))
        .route("/merge", post(routes::merge_files))
        // Middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
