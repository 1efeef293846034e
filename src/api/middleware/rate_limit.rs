//! Per-client rate limiting middleware.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use serde_json::json;
use std::net::SocketAddr;

use crate::{error::AppError, state::AppState, utils::client_ip::client_identity};

/// Admits or rejects a request using the shared [`crate::application::services::RateLimiter`].
///
/// # Key Extraction
///
/// The client is identified by the peer socket address, or, when
/// `BEHIND_PROXY` is on, by the first `X-Forwarded-For` entry falling back to
/// `X-Real-IP`. See [`client_identity`].
///
/// # Errors
///
/// Returns `429 Too Many Requests` with a JSON error body when the client's
/// bucket is empty.
///
/// # Example
///
/// ```rust,ignore
/// let limited = Router::new()
///     .route("/shorten", post(shorten_handler))
///     .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit::layer));
/// ```
pub async fn layer(
    State(st): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let client = client_identity(req.headers(), peer, st.behind_proxy);

    if !st.rate_limiter.admit(&client) {
        return Err(AppError::rate_limited(
            "Too many requests",
            json!({ "burst": st.rate_limiter.config().burst }),
        ));
    }

    Ok(next.run(req).await)
}
