//! Outbound network access used by URL validation.
//!
//! - [`SystemResolver`] - DNS lookups through the OS resolver
//! - [`HttpProbe`] - HEAD requests with redirects disabled

pub mod dns;
pub mod http_probe;

pub use dns::SystemResolver;
pub use http_probe::HttpProbe;
