//! Application layer services implementing business logic.
//!
//! Services consume repository traits and the URL validator, and provide a
//! small API for HTTP handlers.
//!
//! # Available Services
//!
//! - [`services::link_service::LinkService`] - Short link creation and resolution
//! - [`services::rate_limiter::RateLimiter`] - Per-client admission control

pub mod services;
