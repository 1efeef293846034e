//! Short identifier generation and validation.
//!
//! Identifiers are derived from the normalized URL mixed with a nanosecond
//! timestamp and OS randomness, so the same URL shortened twice gets two
//! different identifiers.

use base64::Engine as _;
use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::utils::url_validator::ValidationError;

/// Length of every generated identifier.
pub const CODE_LENGTH: usize = 8;

/// Longest identifier accepted on lookup.
pub const MAX_SHORT_ID_LENGTH: usize = 10;

/// Random bytes mixed into each hash.
const ENTROPY_BYTES: usize = 16;

/// Generates a candidate short identifier for `normalized_url`.
///
/// SHA-256 over the URL, a nanosecond timestamp and 16 random bytes, base64url
/// encoded and cut to 8 characters. `-`, `_` and `+` are mapped to `x`, `y`
/// and `z`, so the result is always alphanumeric.
///
/// # Panics
///
/// Panics if the system random number generator fails (extremely rare).
///
/// # Examples
///
/// ```ignore
/// let code = generate_code("https://example.com/");
/// assert_eq!(code.len(), 8);
/// assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
/// ```
pub fn generate_code(normalized_url: &str) -> String {
    let mut entropy = [0u8; ENTROPY_BYTES];
    getrandom::fill(&mut entropy).expect("Failed to generate random bytes");

    let timestamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(normalized_url.as_bytes());
    hasher.update(timestamp.to_be_bytes());
    hasher.update(entropy);
    let digest = hasher.finalize();

    let encoded = base64::engine::general_purpose::URL_SAFE.encode(digest);

    encoded[..CODE_LENGTH]
        .chars()
        .map(|c| match c {
            '-' => 'x',
            '_' => 'y',
            '+' => 'z',
            other => other,
        })
        .collect()
}

/// Checks the syntax of a short identifier before any storage lookup.
///
/// # Rules
///
/// - Length: 1-10 characters
/// - Allowed characters: ASCII letters and digits
///
/// # Errors
///
/// Returns [`ValidationError::InvalidShortId`] if any rule is violated.
pub fn validate_short_id(short_id: &str) -> Result<(), ValidationError> {
    if short_id.is_empty() || short_id.len() > MAX_SHORT_ID_LENGTH {
        return Err(ValidationError::InvalidShortId {
            reason: format!("must be 1-{MAX_SHORT_ID_LENGTH} characters"),
        });
    }

    if !short_id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidShortId {
            reason: "only letters and digits are allowed".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_code_has_correct_length() {
        let code = generate_code("https://example.com/");
        assert_eq!(code.len(), CODE_LENGTH);
    }

    #[test]
    fn test_generate_code_is_alphanumeric() {
        for _ in 0..2000 {
            let code = generate_code("https://example.com/some/path?q=1");
            assert!(
                code.chars().all(|c| c.is_ascii_alphanumeric()),
                "unexpected character in {code}"
            );
        }
    }

    #[test]
    fn test_generate_code_passes_short_id_validation() {
        let code = generate_code("https://rust-lang.org/");
        assert!(validate_short_id(&code).is_ok());
    }

    #[test]
    fn test_same_url_produces_unique_codes() {
        let mut codes = HashSet::new();

        for _ in 0..1000 {
            codes.insert(generate_code("https://example.com/"));
        }

        assert_eq!(codes.len(), 1000);
    }

    #[test]
    fn test_validate_short_id_accepts_valid() {
        assert!(validate_short_id("a").is_ok());
        assert!(validate_short_id("AbC123xyz").is_ok());
        assert!(validate_short_id("abcdefghij").is_ok());
    }

    #[test]
    fn test_validate_short_id_length() {
        assert!(validate_short_id("").is_err());
        assert!(validate_short_id("abcdefghijk").is_err());
    }

    #[test]
    fn test_validate_short_id_characters() {
        for bad in ["abc-123", "abc_123", "abc+123", "ab/cd", "ab cd", "ñandu"] {
            let err = validate_short_id(bad).unwrap_err();
            assert!(matches!(err, ValidationError::InvalidShortId { .. }), "{bad}");
        }
    }
}
