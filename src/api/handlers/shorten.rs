//! Handler for link shortening endpoint.

use axum::{Json, extract::State, extract::rejection::JsonRejection, http::StatusCode};
use validator::Validate;

use crate::api::dto::shorten::{ShortenRequest, ShortenResponse};
use crate::error::AppError;
use crate::state::AppState;

/// Creates a short link for a URL.
///
/// # Endpoint
///
/// `POST /shorten`
///
/// # Request Body
///
/// ```json
/// { "url": "https://example.com/some/page" }
/// ```
///
/// # Response
///
/// `201 Created`
///
/// ```json
/// {
///   "short_id": "aB3xYz9Q",
///   "short_url": "http://localhost:3000/short/aB3xYz9Q",
///   "original_url": "https://example.com/some/page",
///   "created_at": "2025-01-01T12:00:00Z"
/// }
/// ```
///
/// # Errors
///
/// - 400 for malformed input, unknown fields or a URL failing syntactic checks
/// - 415 when the body is not sent as `application/json`
/// - 403 for non-http(s) schemes or hosts that resolve to internal addresses
/// - 422 when the target does not answer the reachability probe
/// - 500 / 504 on storage failures
pub async fn shorten_handler(
    State(state): State<AppState>,
    payload: Result<Json<ShortenRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ShortenResponse>), AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let link = state.link_service.create_short_link(&payload.url).await?;
    let short_url = state
        .link_service
        .get_short_url(&state.base_url, &link.short_id);

    Ok((
        StatusCode::CREATED,
        Json(ShortenResponse {
            short_id: link.short_id,
            short_url,
            original_url: link.original_url,
            created_at: link.created_at,
        }),
    ))
}
