//! Short link creation and resolution.

use chrono::Utc;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::entities::{NewShortenedUrl, ShortenedUrl};
use crate::domain::repositories::{InsertOutcome, UrlRepository};
use crate::error::AppError;
use crate::utils::code_generator::{generate_code, validate_short_id};
use crate::utils::url_normalizer::normalize;
use crate::utils::url_validator::UrlValidator;

/// Identifier candidates tried before giving up on a creation.
pub const MAX_GENERATION_ATTEMPTS: usize = 5;

pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Service for creating and resolving shortened links.
///
/// Creation validates the URL (including the SSRF and reachability checks),
/// normalizes it and assigns a fresh identifier. Uniqueness is optimistic:
/// a candidate is looked up first, and the store's insert-if-absent settles
/// any race. Both kinds of collision share one attempt budget.
pub struct LinkService {
    repository: Arc<dyn UrlRepository>,
    validator: UrlValidator,
    storage_timeout: Duration,
}

impl LinkService {
    pub fn new(
        repository: Arc<dyn UrlRepository>,
        validator: UrlValidator,
        storage_timeout: Duration,
    ) -> Self {
        Self {
            repository,
            validator,
            storage_timeout,
        }
    }

    /// Creates a short link for `raw_url`.
    ///
    /// # Errors
    ///
    /// - Validation failures map to [`AppError::Validation`],
    ///   [`AppError::SecurityRejection`] or [`AppError::Unreachable`]
    /// - [`AppError::IdentifierExhausted`] after [`MAX_GENERATION_ATTEMPTS`] collisions
    /// - [`AppError::StorageTimeout`] / [`AppError::Internal`] on store failures
    pub async fn create_short_link(&self, raw_url: &str) -> Result<ShortenedUrl, AppError> {
        let url = self.validator.validate(raw_url).await?;

        let original_url = normalize(&url)
            .map_err(|e| {
                AppError::bad_request("Invalid URL format", json!({ "reason": e.to_string() }))
            })?
            .to_string();

        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let short_id = generate_code(&original_url);

            let existing = self
                .with_timeout("find_by_short_id", self.repository.find_by_short_id(&short_id))
                .await?;

            if existing.is_some() {
                record_collision(&short_id, attempt);
                continue;
            }

            let new_url = NewShortenedUrl {
                short_id: short_id.clone(),
                original_url: original_url.clone(),
                created_at: Utc::now(),
            };

            match self
                .with_timeout("insert_if_absent", self.repository.insert_if_absent(new_url))
                .await?
            {
                InsertOutcome::Inserted(link) => {
                    metrics::counter!("links_created_total").increment(1);
                    tracing::info!(
                        short_id = %link.short_id,
                        original_url = %link.original_url,
                        attempt,
                        "Short link created"
                    );
                    return Ok(link);
                }
                InsertOutcome::AlreadyExists => record_collision(&short_id, attempt),
            }
        }

        tracing::error!(
            original_url = %original_url,
            attempts = MAX_GENERATION_ATTEMPTS,
            "Failed to generate a unique short ID"
        );

        Err(AppError::identifier_exhausted(
            "Failed to generate a unique short ID",
            json!({ "attempts": MAX_GENERATION_ATTEMPTS }),
        ))
    }

    /// Resolves `short_id` and counts the access.
    ///
    /// Returns `Ok(None)` for an unknown identifier. If the click cannot be
    /// recorded the whole resolution fails.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for a malformed identifier, before any
    /// store call.
    pub async fn resolve_short_link(
        &self,
        short_id: &str,
    ) -> Result<Option<ShortenedUrl>, AppError> {
        validate_short_id(short_id)?;

        let found = self
            .with_timeout("find_by_short_id", self.repository.find_by_short_id(short_id))
            .await?;

        if found.is_none() {
            tracing::debug!(short_id, "Short link not found");
            return Ok(None);
        }

        let updated = self
            .with_timeout("increment_clicks", self.repository.increment_clicks(short_id))
            .await?
            .ok_or_else(|| {
                tracing::error!(short_id, "Short link vanished while recording click");
                AppError::internal(
                    "Failed to record click",
                    json!({ "short_id": short_id }),
                )
            })?;

        metrics::counter!("link_resolutions_total").increment(1);
        tracing::debug!(short_id, clicks = updated.clicks, "Short link resolved");

        Ok(Some(updated))
    }

    /// Looks up `short_id` without counting a click.
    pub async fn get_link(&self, short_id: &str) -> Result<Option<ShortenedUrl>, AppError> {
        validate_short_id(short_id)?;

        self.with_timeout("find_by_short_id", self.repository.find_by_short_id(short_id))
            .await
    }

    /// Builds the public short URL under `base_url`.
    pub fn get_short_url(&self, base_url: &str, short_id: &str) -> String {
        format!("{}/short/{}", base_url.trim_end_matches('/'), short_id)
    }

    async fn with_timeout<T, F>(&self, operation: &'static str, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        tokio::time::timeout(self.storage_timeout, fut)
            .await
            .map_err(|_| {
                tracing::error!(operation, "Storage call timed out");
                AppError::storage_timeout(
                    "Storage operation timed out",
                    json!({
                        "operation": operation,
                        "timeout_ms": self.storage_timeout.as_millis() as u64,
                    }),
                )
            })?
    }
}

fn record_collision(short_id: &str, attempt: usize) {
    metrics::counter!("identifier_collisions_total").increment(1);
    tracing::warn!(short_id, attempt, "Short ID collision, retrying");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::MockUrlRepository;
    use crate::infrastructure::persistence::MemoryUrlRepository;
    use crate::utils::address_safety::{AddressSafety, MockResolver};
    use crate::utils::url_validator::{MockProbe, ProbeResponse, UrlValidatorConfig};
    use async_trait::async_trait;
    use mockall::Sequence;

    fn public_validator() -> UrlValidator {
        let mut resolver = MockResolver::new();
        resolver
            .expect_lookup()
            .returning(|_| Ok(vec!["93.184.216.34".parse().unwrap()]));

        let mut probe = MockProbe::new();
        probe.expect_head().returning(|_| {
            Ok(ProbeResponse {
                status: 200,
                location: None,
            })
        });

        UrlValidator::new(
            AddressSafety::new(Arc::new(resolver)),
            Arc::new(probe),
            UrlValidatorConfig::default(),
        )
    }

    fn service(repository: impl UrlRepository + 'static) -> LinkService {
        LinkService::new(
            Arc::new(repository),
            public_validator(),
            DEFAULT_STORAGE_TIMEOUT,
        )
    }

    fn stored(short_id: &str, clicks: i64) -> ShortenedUrl {
        ShortenedUrl::new(
            short_id.to_string(),
            "https://example.com/".to_string(),
            clicks,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_create_short_link_normalizes_url() {
        let mut repo = MockUrlRepository::new();
        repo.expect_find_by_short_id().times(1).returning(|_| Ok(None));
        repo.expect_insert_if_absent()
            .times(1)
            .returning(|new_url| Ok(InsertOutcome::Inserted(new_url.into_entity())));

        let link = service(repo)
            .create_short_link("https://Example.com:443/path#frag")
            .await
            .unwrap();

        assert_eq!(link.original_url, "https://example.com/path");
        assert_eq!(link.short_id.len(), 8);
        assert_eq!(link.clicks, 0);
    }

    #[tokio::test]
    async fn test_same_url_twice_gets_distinct_ids() {
        let service = service(MemoryUrlRepository::new());

        let first = service.create_short_link("https://example.com/page").await.unwrap();
        let second = service.create_short_link("https://example.com/page").await.unwrap();

        assert_ne!(first.short_id, second.short_id);
        assert_eq!(first.original_url, second.original_url);
    }

    #[tokio::test]
    async fn test_lookup_collision_is_retried() {
        let mut repo = MockUrlRepository::new();
        let mut seq = Sequence::new();

        repo.expect_find_by_short_id()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|id| Ok(Some(stored(id, 0))));
        repo.expect_find_by_short_id()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(None));
        repo.expect_insert_if_absent()
            .times(1)
            .returning(|new_url| Ok(InsertOutcome::Inserted(new_url.into_entity())));

        assert!(service(repo)
            .create_short_link("https://example.com/")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_insert_race_is_retried() {
        let mut repo = MockUrlRepository::new();
        let mut seq = Sequence::new();

        repo.expect_find_by_short_id().times(2).returning(|_| Ok(None));
        repo.expect_insert_if_absent()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(InsertOutcome::AlreadyExists));
        repo.expect_insert_if_absent()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|new_url| Ok(InsertOutcome::Inserted(new_url.into_entity())));

        assert!(service(repo)
            .create_short_link("https://example.com/")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_identifier_exhausted_after_five_collisions() {
        let mut repo = MockUrlRepository::new();
        repo.expect_find_by_short_id()
            .times(MAX_GENERATION_ATTEMPTS)
            .returning(|id| Ok(Some(stored(id, 0))));
        repo.expect_insert_if_absent().never();

        let err = service(repo)
            .create_short_link("https://example.com/")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::IdentifierExhausted { .. }));
    }

    #[tokio::test]
    async fn test_identifier_exhausted_after_five_insert_conflicts() {
        let mut repo = MockUrlRepository::new();
        repo.expect_find_by_short_id()
            .times(MAX_GENERATION_ATTEMPTS)
            .returning(|_| Ok(None));
        repo.expect_insert_if_absent()
            .times(MAX_GENERATION_ATTEMPTS)
            .returning(|_| Ok(InsertOutcome::AlreadyExists));

        let err = service(repo)
            .create_short_link("https://example.com/")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::IdentifierExhausted { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creations_get_distinct_ids() {
        let repo = Arc::new(MemoryUrlRepository::new());
        let service = Arc::new(LinkService::new(
            repo.clone(),
            public_validator(),
            DEFAULT_STORAGE_TIMEOUT,
        ));

        let tasks: Vec<_> = (0..64)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move {
                    service.create_short_link("https://example.com/same").await
                })
            })
            .collect();

        let mut ids = std::collections::HashSet::new();
        for task in tasks {
            let link = task.await.unwrap().unwrap();
            assert!(ids.insert(link.short_id));
        }

        assert_eq!(ids.len(), 64);
        assert_eq!(repo.len(), 64);
    }

    #[tokio::test]
    async fn test_invalid_url_never_touches_storage() {
        let mut repo = MockUrlRepository::new();
        repo.expect_find_by_short_id().never();
        repo.expect_insert_if_absent().never();

        let err = service(repo)
            .create_short_link("ftp://example.com/file")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::SecurityRejection { .. }));
    }

    #[tokio::test]
    async fn test_resolve_unknown_returns_none() {
        let mut repo = MockUrlRepository::new();
        repo.expect_find_by_short_id().times(1).returning(|_| Ok(None));
        repo.expect_increment_clicks().never();

        assert!(service(repo)
            .resolve_short_link("missing1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_resolve_counts_clicks() {
        let service = service(MemoryUrlRepository::new());
        let link = service.create_short_link("https://example.com/").await.unwrap();

        let before = service.get_link(&link.short_id).await.unwrap().unwrap();
        assert_eq!(before.clicks, 0);

        let first = service.resolve_short_link(&link.short_id).await.unwrap().unwrap();
        let second = service.resolve_short_link(&link.short_id).await.unwrap().unwrap();
        assert_eq!(first.clicks, 1);
        assert_eq!(second.clicks, 2);
        assert_eq!(second.original_url, "https://example.com/");

        let after = service.get_link(&link.short_id).await.unwrap().unwrap();
        assert_eq!(after.clicks, 2);
    }

    #[tokio::test]
    async fn test_invalid_short_id_rejected_before_storage() {
        let mut repo = MockUrlRepository::new();
        repo.expect_find_by_short_id().never();
        let service = service(repo);

        for short_id in ["", "bad-id!", "abcdefghijk"] {
            let err = service.resolve_short_link(short_id).await.unwrap_err();
            assert!(matches!(err, AppError::Validation { .. }), "{short_id:?}");
        }
    }

    #[tokio::test]
    async fn test_increment_failure_fails_resolve() {
        let mut repo = MockUrlRepository::new();
        repo.expect_find_by_short_id()
            .returning(|id| Ok(Some(stored(id, 3))));
        repo.expect_increment_clicks()
            .times(1)
            .returning(|_| Err(AppError::internal("Database error", json!({}))));

        let result = service(repo).resolve_short_link("abc12345").await;
        assert!(matches!(result, Err(AppError::Internal { .. })));
    }

    struct StalledRepository;

    #[async_trait]
    impl UrlRepository for StalledRepository {
        async fn find_by_short_id(&self, _: &str) -> Result<Option<ShortenedUrl>, AppError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(None)
        }

        async fn insert_if_absent(&self, _: NewShortenedUrl) -> Result<InsertOutcome, AppError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(InsertOutcome::AlreadyExists)
        }

        async fn increment_clicks(&self, _: &str) -> Result<Option<ShortenedUrl>, AppError> {
            Ok(None)
        }

        async fn health_check(&self) -> bool {
            false
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_storage_times_out() {
        let service = service(StalledRepository);

        let err = service.resolve_short_link("abc12345").await.unwrap_err();
        assert!(matches!(err, AppError::StorageTimeout { .. }));
    }

    #[test]
    fn test_get_short_url() {
        let service = service(MemoryUrlRepository::new());
        assert_eq!(
            service.get_short_url("http://localhost:3000/", "abc12345"),
            "http://localhost:3000/short/abc12345"
        );
    }
}
