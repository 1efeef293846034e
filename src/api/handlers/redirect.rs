//! Handler for short URL redirect.

use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde_json::json;

use crate::error::AppError;
use crate::state::AppState;

/// Redirects a short ID to its original URL and counts the click.
///
/// # Endpoint
///
/// `GET /short/{id}`
///
/// # Response
///
/// `302 Found` with `Location` set to the original URL. The response is
/// marked uncacheable so that every visit reaches the service and is counted.
///
/// # Errors
///
/// - 400 if the ID is not 1-10 alphanumeric characters
/// - 404 if the ID is unknown
/// - 500 / 504 if the click cannot be recorded
pub async fn redirect_handler(
    Path(short_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let link = state
        .link_service
        .resolve_short_link(&short_id)
        .await?
        .ok_or_else(|| {
            AppError::not_found("Short link not found", json!({ "short_id": short_id }))
        })?;

    Ok((
        StatusCode::FOUND,
        [
            (header::LOCATION, link.original_url),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
    ))
}
