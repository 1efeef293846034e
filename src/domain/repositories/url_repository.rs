//! Repository trait for shortened URL data access.

use crate::domain::entities::{NewShortenedUrl, ShortenedUrl};
use crate::error::AppError;
use async_trait::async_trait;

/// Outcome of [`UrlRepository::insert_if_absent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The row was written.
    Inserted(ShortenedUrl),
    /// Another entry already owns the short ID. Nothing was written.
    AlreadyExists,
}

/// Repository interface for shortened URLs.
///
/// Implementations must enforce `short_id` uniqueness themselves: the store is
/// the final arbiter when two creators race for the same identifier.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgUrlRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::MemoryUrlRepository`] - In-process implementation
/// - Test mocks available with `cfg(test)`
///
/// # Examples
///
/// See integration tests: `tests/repository_url.rs`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UrlRepository: Send + Sync {
    /// Finds an entry by its short ID.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(ShortenedUrl))` if found
    /// - `Ok(None)` if not found
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage errors.
    async fn find_by_short_id(&self, short_id: &str) -> Result<Option<ShortenedUrl>, AppError>;

    /// Inserts the entry unless its short ID is taken.
    ///
    /// A unique-constraint violation is reported as
    /// [`InsertOutcome::AlreadyExists`], never as an error.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on any other storage error.
    async fn insert_if_absent(&self, new_url: NewShortenedUrl) -> Result<InsertOutcome, AppError>;

    /// Adds one click and returns the updated entry.
    ///
    /// Returns `Ok(None)` if no entry has this short ID.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage errors.
    async fn increment_clicks(&self, short_id: &str) -> Result<Option<ShortenedUrl>, AppError>;

    /// Returns `true` if the store answers.
    async fn health_check(&self) -> bool;
}
