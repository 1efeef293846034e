//! In-process repository used when no database is configured.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::entities::{NewShortenedUrl, ShortenedUrl};
use crate::domain::repositories::{InsertOutcome, UrlRepository};
use crate::error::AppError;

/// Shortened URLs kept in a mutex-guarded map.
///
/// Data lives only as long as the process. The map key is the short ID, which
/// gives the same uniqueness guarantee as the database constraint.
#[derive(Default)]
pub struct MemoryUrlRepository {
    urls: Mutex<HashMap<String, ShortenedUrl>>,
}

impl MemoryUrlRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ShortenedUrl>> {
        self.urls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UrlRepository for MemoryUrlRepository {
    async fn find_by_short_id(&self, short_id: &str) -> Result<Option<ShortenedUrl>, AppError> {
        Ok(self.lock().get(short_id).cloned())
    }

    async fn insert_if_absent(&self, new_url: NewShortenedUrl) -> Result<InsertOutcome, AppError> {
        let mut urls = self.lock();

        if urls.contains_key(&new_url.short_id) {
            return Ok(InsertOutcome::AlreadyExists);
        }

        let entity = new_url.into_entity();
        urls.insert(entity.short_id.clone(), entity.clone());

        Ok(InsertOutcome::Inserted(entity))
    }

    async fn increment_clicks(&self, short_id: &str) -> Result<Option<ShortenedUrl>, AppError> {
        let mut urls = self.lock();

        Ok(urls.get_mut(short_id).map(|url| {
            url.clicks += 1;
            url.clone()
        }))
    }

    async fn health_check(&self) -> bool {
        true
    }
}
