//! Handler for link details.

use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::json;

use crate::api::dto::link::LinkResponse;
use crate::error::AppError;
use crate::state::AppState;

/// Returns a stored link and its click count without counting a visit.
///
/// # Endpoint
///
/// `GET /api/links/{id}`
pub async fn get_link_handler(
    Path(short_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<LinkResponse>, AppError> {
    let link = state
        .link_service
        .get_link(&short_id)
        .await?
        .ok_or_else(|| {
            AppError::not_found("Short link not found", json!({ "short_id": short_id }))
        })?;

    let short_url = state
        .link_service
        .get_short_url(&state.base_url, &link.short_id);

    Ok(Json(LinkResponse::from_entity(link, short_url)))
}
