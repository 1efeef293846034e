//! Shortened URL entity representing a short identifier mapping.

use chrono::{DateTime, Utc};

/// A persisted mapping from a short identifier to a normalized URL.
///
/// `short_id` and `created_at` are fixed at creation. `clicks` is the only
/// field that changes afterwards, and it only ever grows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortenedUrl {
    pub short_id: String,
    pub original_url: String,
    pub clicks: i64,
    pub created_at: DateTime<Utc>,
}

impl ShortenedUrl {
    /// Creates a new ShortenedUrl instance.
    pub fn new(
        short_id: String,
        original_url: String,
        clicks: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            short_id,
            original_url,
            clicks,
            created_at,
        }
    }
}

/// Input data for inserting a new mapping.
#[derive(Debug, Clone)]
pub struct NewShortenedUrl {
    pub short_id: String,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
}

impl NewShortenedUrl {
    /// Builds the entity as it looks right after insertion.
    pub fn into_entity(self) -> ShortenedUrl {
        ShortenedUrl::new(self.short_id, self.original_url, 0, self.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortened_url_creation() {
        let now = Utc::now();
        let url = ShortenedUrl::new(
            "abcD1234".to_string(),
            "https://example.com/".to_string(),
            0,
            now,
        );

        assert_eq!(url.short_id, "abcD1234");
        assert_eq!(url.original_url, "https://example.com/");
        assert_eq!(url.clicks, 0);
        assert_eq!(url.created_at, now);
    }

    #[test]
    fn test_new_shortened_url_starts_with_zero_clicks() {
        let now = Utc::now();
        let new_url = NewShortenedUrl {
            short_id: "xyz78901".to_string(),
            original_url: "https://rust-lang.org/".to_string(),
            created_at: now,
        };

        let entity = new_url.into_entity();
        assert_eq!(entity.clicks, 0);
        assert_eq!(entity.short_id, "xyz78901");
        assert_eq!(entity.created_at, now);
    }
}
