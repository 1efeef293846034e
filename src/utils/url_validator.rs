//! URL validation with SSRF protection.
//!
//! Validation runs cheap syntactic checks first and only then touches the
//! network: the host must be publicly routable, and the URL must answer a HEAD
//! probe. Redirects are followed by hand so that every hop's host goes through
//! [`AddressSafety`] before it is contacted.

use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use url::Url;

use crate::error::ErrorKind;
use crate::utils::address_safety::AddressSafety;

pub const MAX_URL_LENGTH: usize = 2048;
pub const MIN_URL_LENGTH: usize = 10;
pub const MAX_HOSTNAME_LENGTH: usize = 253;

/// Control characters (C0 and C1) and HTML-significant characters.
static DANGEROUS_CHARS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\x00-\x1F\x7F-\x9F<>"'&]"#).unwrap());

static HOSTNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9.-]+$").unwrap());

/// Reasons a URL (or short identifier) is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("URL is too long ({length} bytes, max 2048)")]
    TooLong { length: usize },

    #[error("URL is too short ({length} bytes, min 10)")]
    TooShort { length: usize },

    #[error("URL contains dangerous characters or invalid encoding")]
    DangerousEncoding,

    #[error("Invalid URL format: {reason}")]
    MalformedUrl { reason: String },

    #[error("Unsupported scheme '{scheme}', only http and https are allowed")]
    UnsupportedScheme { scheme: String },

    #[error("Invalid host '{host}'")]
    InvalidHost { host: String },

    #[error("Private or local network targets are not allowed: {host}")]
    PrivateNetwork { host: String },

    #[error("URL is not reachable: {reason}")]
    Unreachable { reason: String },

    #[error("Invalid short ID: {reason}")]
    InvalidShortId { reason: String },
}

impl ValidationError {
    /// Taxonomy entry used by the request layer to pick a status code.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedScheme { .. } | Self::PrivateNetwork { .. } => {
                ErrorKind::SecurityRejection
            }
            Self::Unreachable { .. } => ErrorKind::UnreachableTarget,
            _ => ErrorKind::InputError,
        }
    }

    /// Stable machine-readable tag.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::TooLong { .. } => "too_long",
            Self::TooShort { .. } => "too_short",
            Self::DangerousEncoding => "dangerous_encoding",
            Self::MalformedUrl { .. } => "malformed_url",
            Self::UnsupportedScheme { .. } => "unsupported_scheme",
            Self::InvalidHost { .. } => "invalid_host",
            Self::PrivateNetwork { .. } => "private_network",
            Self::Unreachable { .. } => "unreachable",
            Self::InvalidShortId { .. } => "invalid_short_id",
        }
    }
}

/// Result of a single HEAD request. Redirects are never followed by the probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub location: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("probe timed out")]
    Timeout,
    #[error("probe failed: {0}")]
    Transport(String),
}

/// Issues the liveness HEAD request for a candidate URL.
///
/// # Implementations
///
/// - [`crate::infrastructure::network::HttpProbe`] - reqwest client, redirects disabled
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Probe: Send + Sync {
    async fn head(&self, url: &Url) -> Result<ProbeResponse, ProbeError>;
}

/// Tunables for the network part of validation.
#[derive(Debug, Clone)]
pub struct UrlValidatorConfig {
    /// Redirect hops followed before giving up.
    pub max_redirects: usize,
    /// Deadline for each probe request.
    pub probe_timeout: Duration,
}

impl Default for UrlValidatorConfig {
    fn default() -> Self {
        Self {
            max_redirects: 3,
            probe_timeout: Duration::from_secs(5),
        }
    }
}

/// Validates user-supplied URLs before they are shortened.
#[derive(Clone)]
pub struct UrlValidator {
    safety: AddressSafety,
    probe: Arc<dyn Probe>,
    config: UrlValidatorConfig,
}

impl UrlValidator {
    pub fn new(safety: AddressSafety, probe: Arc<dyn Probe>, config: UrlValidatorConfig) -> Self {
        Self {
            safety,
            probe,
            config,
        }
    }

    /// Validates raw bytes, rejecting invalid UTF-8 as dangerous encoding.
    ///
    /// Requests reach [`UrlValidator::validate`] as `&str`; the JSON decoder
    /// already refuses invalid UTF-8 with a 400.
    #[cfg(test)]
    pub async fn validate_bytes(&self, raw: &[u8]) -> Result<Url, ValidationError> {
        let raw = std::str::from_utf8(raw).map_err(|_| {
            record_rejection(&ValidationError::DangerousEncoding);
            ValidationError::DangerousEncoding
        })?;
        self.validate(raw).await
    }

    /// Runs every check and returns the parsed (not yet normalized) URL.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] hit. Syntactic failures never
    /// trigger DNS lookups or probes.
    pub async fn validate(&self, raw: &str) -> Result<Url, ValidationError> {
        let result = self.validate_inner(raw).await;
        if let Err(ref e) = result {
            record_rejection(e);
            tracing::info!(reason = e.reason(), error = %e, "URL rejected");
        }
        result
    }

    async fn validate_inner(&self, raw: &str) -> Result<Url, ValidationError> {
        let url = check_syntax(raw)?;
        let host = url.host_str().unwrap_or_default();

        if !self.safety.is_publicly_routable(host).await {
            return Err(ValidationError::PrivateNetwork {
                host: host.to_string(),
            });
        }

        self.check_reachable(&url).await?;

        Ok(url)
    }

    /// Probes `url`, following at most `max_redirects` hops.
    async fn check_reachable(&self, url: &Url) -> Result<(), ValidationError> {
        let mut current = url.clone();
        let mut redirects = 0;

        loop {
            let response =
                match tokio::time::timeout(self.config.probe_timeout, self.probe.head(&current))
                    .await
                {
                    Ok(Ok(response)) => response,
                    Ok(Err(e)) => {
                        return Err(ValidationError::Unreachable {
                            reason: e.to_string(),
                        });
                    }
                    Err(_) => {
                        return Err(ValidationError::Unreachable {
                            reason: ProbeError::Timeout.to_string(),
                        });
                    }
                };

            match (response.status, response.location) {
                (300..=399, Some(location)) => {
                    if redirects >= self.config.max_redirects {
                        return Err(ValidationError::Unreachable {
                            reason: format!("too many redirects (max {})", self.config.max_redirects),
                        });
                    }

                    let next = current
                        .join(&location)
                        .map_err(|e| ValidationError::Unreachable {
                            reason: format!("invalid redirect location: {e}"),
                        })?;

                    if !matches!(next.scheme(), "http" | "https") {
                        return Err(ValidationError::UnsupportedScheme {
                            scheme: next.scheme().to_string(),
                        });
                    }

                    let host = next.host_str().unwrap_or_default();
                    if !self.safety.is_publicly_routable(host).await {
                        tracing::warn!(from = %current, to = %next, "Redirect to non-public host refused");
                        return Err(ValidationError::PrivateNetwork {
                            host: host.to_string(),
                        });
                    }

                    redirects += 1;
                    current = next;
                }
                (200..=399, _) => return Ok(()),
                (status, _) => {
                    return Err(ValidationError::Unreachable {
                        reason: format!("target answered with status {status}"),
                    });
                }
            }
        }
    }
}

fn record_rejection(error: &ValidationError) {
    metrics::counter!("url_validation_rejections_total", "kind" => error.reason()).increment(1);
}

/// Offline checks: length, encoding, parse, scheme and host shape.
///
/// # Errors
///
/// Returns the first failing [`ValidationError`].
pub fn check_syntax(raw: &str) -> Result<Url, ValidationError> {
    if raw.len() > MAX_URL_LENGTH {
        return Err(ValidationError::TooLong { length: raw.len() });
    }

    if raw.len() < MIN_URL_LENGTH {
        return Err(ValidationError::TooShort { length: raw.len() });
    }

    if DANGEROUS_CHARS_REGEX.is_match(raw) {
        return Err(ValidationError::DangerousEncoding);
    }

    let url = Url::parse(raw).map_err(|e| ValidationError::MalformedUrl {
        reason: e.to_string(),
    })?;

    let host = match url.host_str() {
        Some(host) if !host.is_empty() => host,
        _ => {
            return Err(ValidationError::MalformedUrl {
                reason: "URL must have a scheme and a host".to_string(),
            });
        }
    };

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ValidationError::UnsupportedScheme {
            scheme: url.scheme().to_string(),
        });
    }

    let hostname = raw_hostname(raw).unwrap_or(host);
    if hostname.len() > MAX_HOSTNAME_LENGTH || !HOSTNAME_REGEX.is_match(hostname) {
        return Err(ValidationError::InvalidHost {
            host: hostname.to_string(),
        });
    }

    Ok(url)
}

/// Extracts the host exactly as the user typed it, without userinfo or port.
///
/// The parser punycodes and lowercases hosts, so the character check has to
/// run against the raw text.
fn raw_hostname(raw: &str) -> Option<&str> {
    let (_, rest) = raw.split_once("://")?;
    let authority_end = rest.find(['/', '?', '#', '\\']).unwrap_or(rest.len());
    let authority = &rest[..authority_end];
    let host_port = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host_port)| host_port);

    if host_port.starts_with('[') {
        return Some(host_port);
    }

    Some(
        host_port
            .rsplit_once(':')
            .map_or(host_port, |(host, _)| host),
    )
}
