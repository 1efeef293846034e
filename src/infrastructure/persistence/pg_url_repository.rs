//! PostgreSQL implementation of the shortened URL repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{NewShortenedUrl, ShortenedUrl};
use crate::domain::repositories::{InsertOutcome, UrlRepository};
use crate::error::AppError;
use crate::utils::db_error::is_unique_violation_on_short_id;

#[derive(sqlx::FromRow)]
struct ShortenedUrlRow {
    short_id: String,
    original_url: String,
    clicks: i64,
    created_at: DateTime<Utc>,
}

impl From<ShortenedUrlRow> for ShortenedUrl {
    fn from(row: ShortenedUrlRow) -> Self {
        ShortenedUrl::new(row.short_id, row.original_url, row.clicks, row.created_at)
    }
}

/// PostgreSQL repository for shortened URLs.
///
/// Uniqueness of `short_id` is enforced by the `shortened_urls_short_id_key`
/// constraint; inserts use `ON CONFLICT DO NOTHING` so a lost race surfaces as
/// [`InsertOutcome::AlreadyExists`].
pub struct PgUrlRepository {
    pool: Arc<PgPool>,
}

impl PgUrlRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UrlRepository for PgUrlRepository {
    async fn find_by_short_id(&self, short_id: &str) -> Result<Option<ShortenedUrl>, AppError> {
        let row = sqlx::query_as::<_, ShortenedUrlRow>(
            r#"
            SELECT short_id, original_url, clicks, created_at
            FROM shortened_urls
            WHERE short_id = $1
            "#,
        )
        .bind(short_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(ShortenedUrl::from))
    }

    async fn insert_if_absent(&self, new_url: NewShortenedUrl) -> Result<InsertOutcome, AppError> {
        let result = sqlx::query_as::<_, ShortenedUrlRow>(
            r#"
            INSERT INTO shortened_urls (short_id, original_url, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (short_id) DO NOTHING
            RETURNING short_id, original_url, clicks, created_at
            "#,
        )
        .bind(&new_url.short_id)
        .bind(&new_url.original_url)
        .bind(new_url.created_at)
        .fetch_optional(self.pool.as_ref())
        .await;

        match result {
            Ok(Some(row)) => Ok(InsertOutcome::Inserted(row.into())),
            Ok(None) => Ok(InsertOutcome::AlreadyExists),
            Err(e) if is_unique_violation_on_short_id(&e) => Ok(InsertOutcome::AlreadyExists),
            Err(e) => Err(e.into()),
        }
    }

    async fn increment_clicks(&self, short_id: &str) -> Result<Option<ShortenedUrl>, AppError> {
        let row = sqlx::query_as::<_, ShortenedUrlRow>(
            r#"
            UPDATE shortened_urls
            SET clicks = clicks + 1
            WHERE short_id = $1
            RETURNING short_id, original_url, clicks, created_at
            "#,
        )
        .bind(short_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(ShortenedUrl::from))
    }

    async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(self.pool.as_ref())
            .await
            .is_ok()
    }
}
