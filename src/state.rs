//! Shared state injected into every handler.

use std::sync::Arc;

use crate::application::services::{LinkService, RateLimiter};
use crate::domain::repositories::UrlRepository;

#[derive(Clone)]
pub struct AppState {
    pub link_service: Arc<LinkService>,
    pub rate_limiter: Arc<RateLimiter>,
    /// Used directly only by the health check.
    pub repository: Arc<dyn UrlRepository>,
    /// Public prefix for short URLs, without a trailing slash.
    pub base_url: String,
    /// Read client identity from proxy headers instead of the peer address.
    pub behind_proxy: bool,
}

impl AppState {
    pub fn new(
        link_service: Arc<LinkService>,
        rate_limiter: Arc<RateLimiter>,
        repository: Arc<dyn UrlRepository>,
        base_url: impl Into<String>,
        behind_proxy: bool,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            link_service,
            rate_limiter,
            repository,
            base_url,
            behind_proxy,
        }
    }
}
