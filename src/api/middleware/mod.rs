//! HTTP middleware for request processing and protection.
//!
//! Provides rate limiting, security headers and observability middleware.

pub mod rate_limit;
pub mod security_headers;
pub mod tracing;
