//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET /health` - Health check: store and cache
//! - anything else - Legacy redirect lookup, 404 on miss
//!
//! Paths are not normalized by the router; the resolver normalizes them
//! itself so that trailing slashes and query strings reach the lookup intact.

use axum::Router;
use axum::routing::get;

use crate::api::handlers::{health_handler, redirect_handler};
use crate::api::middleware::tracing;
use crate::state::AppState;

/// Constructs the application router with all routes and middleware.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .fallback(redirect_handler)
        .with_state(state)
        .layer(tracing::layer())
}
