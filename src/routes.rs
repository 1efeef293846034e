//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `POST /shorten`         - Create a short link (rate limited)
//! - `GET  /short/{id}`      - Short link redirect (rate limited)
//! - `GET  /api/links/{id}`  - Link details
//! - `GET  /health`          - Storage and limiter status
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Security headers** - `nosniff`, frame denial, CSP and referrer policy
//! - **Rate limiting** - Per-client token bucket (configurable for proxy deployments)
//! - **Body limit** - 1 MiB request bodies
//! - **Path normalization** - Trailing slash handling

use crate::api;
use crate::api::middleware::{rate_limit, security_headers, tracing};
use crate::error::AppError;
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::{Router, middleware};
use serde_json::json;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Constructs the application router with path normalization applied.
pub fn app_router(state: AppState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(router(state))
}

/// All routes and middleware, without path normalization.
///
/// Rate limiting is a route layer, so unmatched paths are answered with a
/// 404 without spending the client's tokens. Known paths hit with the wrong
/// method get a JSON 405.
pub fn router(state: AppState) -> Router {
    let limited = api::routes::limited_routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        rate_limit::layer,
    ));

    let router = Router::new()
        .merge(limited)
        .merge(api::routes::open_routes())
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(fallback)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state);

    security_headers::apply(router).layer(tracing::layer())
}

async fn fallback() -> AppError {
    AppError::not_found("Route not found", json!({}))
}

async fn method_not_allowed(method: Method) -> AppError {
    AppError::method_not_allowed(
        "Method not allowed",
        json!({ "method": method.as_str() }),
    )
}
