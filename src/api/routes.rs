//! API route configuration.

use crate::api::handlers::{get_link_handler, health_handler, redirect_handler, shorten_handler};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

/// Routes subject to per-client rate limiting.
///
/// # Endpoints
///
/// - `POST /shorten`      - Create a short link
/// - `GET  /short/{id}`   - Redirect to the original URL
pub fn limited_routes() -> Router<AppState> {
    Router::new()
        .route("/shorten", post(shorten_handler))
        .route("/short/{id}", get(redirect_handler))
}

/// Routes served without rate limiting.
///
/// # Endpoints
///
/// - `GET /api/links/{id}` - Link details and click count
/// - `GET /health`         - Storage and limiter status
pub fn open_routes() -> Router<AppState> {
    Router::new()
        .route("/api/links/{id}", get(get_link_handler))
        .route("/health", get(health_handler))
}
