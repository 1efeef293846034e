//! DTOs for link details endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::ShortenedUrl;

/// Stored link with its click count.
#[derive(Debug, Serialize, Deserialize)]
pub struct LinkResponse {
    pub short_id: String,
    pub short_url: String,
    pub original_url: String,
    pub clicks: i64,
    pub created_at: DateTime<Utc>,
}

impl LinkResponse {
    pub fn from_entity(link: ShortenedUrl, short_url: String) -> Self {
        Self {
            short_id: link.short_id,
            short_url,
            original_url: link.original_url,
            clicks: link.clicks,
            created_at: link.created_at,
        }
    }
}
