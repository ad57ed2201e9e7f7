//! Input validation and sanitization.
//!
//! This module provides:
//! - Username format validation for request bodies
//! - Image URL validation (SSRF protection for profile and post images)
//! - Text sanitization before storage
//! - Reset-token generation and digests

use std::sync::LazyLock;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::warn;
use url::Url;
use uuid::Uuid;
use validator::ValidationError;

/// Maximum URL length to prevent DoS attacks.
const MAX_URL_LENGTH: usize = 2048;

static USERNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.]{3,30}$").unwrap_or_else(|_| unreachable!()));

/// Blocked URL patterns (internal networks and metadata endpoints).
static BLOCKED_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^https?://127\.",
        r"^https?://localhost",
        r"^https?://10\.",
        r"^https?://172\.(1[6-9]|2[0-9]|3[0-1])\.",
        r"^https?://192\.168\.",
        r"^https?://169\.254\.",
        r"^https?://\[::1\]",
        r"^https?://\[fd",
        r"^https?://\[fe80",
        r"^https?://metadata\.",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Validator hook for usernames: 3 to 30 letters, digits, `_` or `.`.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if USERNAME.is_match(username) {
        Ok(())
    } else {
        Err(ValidationError::new("username").with_message(
            "Username must be 3-30 characters of letters, digits, '_' or '.'".into(),
        ))
    }
}

/// Validator hook for image URLs. Empty strings clear the image.
pub fn validate_image_url(url: &str) -> Result<(), ValidationError> {
    if url.is_empty() {
        return Ok(());
    }
    check_image_url(url)
        .map_err(|msg| ValidationError::new("image_url").with_message(msg.into()))
}

fn check_image_url(url: &str) -> Result<(), String> {
    if url.len() > MAX_URL_LENGTH {
        return Err(format!(
            "URL exceeds maximum length of {} characters",
            MAX_URL_LENGTH
        ));
    }

    let parsed = Url::parse(url.trim()).map_err(|e| format!("Invalid URL format: {}", e))?;
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(format!(
                "Invalid protocol '{}'. Only HTTP and HTTPS are allowed.",
                scheme
            ))
        }
    }

    if BLOCKED_PATTERNS.iter().any(|p| p.is_match(url)) {
        warn!(url = %url, "Blocked URL pattern detected");
        return Err("URL appears to target an internal or restricted endpoint".to_string());
    }

    if parsed.host_str().is_none() {
        return Err("URL must have a valid domain".to_string());
    }
    Ok(())
}

/// Trim and strip control characters, keeping newlines and tabs.
pub fn sanitize_text(input: &str) -> String {
    input
        .trim()
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// Fresh URL-safe password reset token.
pub fn generate_reset_token() -> String {
    let mut bytes = Vec::with_capacity(32);
    bytes.extend_from_slice(Uuid::new_v4().as_bytes());
    bytes.extend_from_slice(Uuid::new_v4().as_bytes());
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hex SHA-256 digest of a reset token; only the digest is stored.
pub fn hash_reset_token(token: &str) -> String {
    Sha256::digest(token.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert!(validate_username("ada.lovelace_1").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"x".repeat(31)).is_err());
    }

    #[test]
    fn test_image_urls() {
        assert!(validate_image_url("").is_ok());
        assert!(validate_image_url("https://cdn.example.com/a.png").is_ok());
        assert!(validate_image_url("http://169.254.169.254/latest/meta-data/").is_err());
        assert!(validate_image_url("http://localhost/a.png").is_err());
        assert!(validate_image_url("javascript:alert(1)").is_err());
    }

    #[test]
    fn test_sanitize_text() {
        assert_eq!(sanitize_text("  hello\u{0007}\nworld  "), "hello\nworld");
    }

    #[test]
    fn test_reset_tokens() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);

        let digest = hash_reset_token(&a);
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, hash_reset_token(&a));
        assert_ne!(digest, hash_reset_token(&b));
    }
}
