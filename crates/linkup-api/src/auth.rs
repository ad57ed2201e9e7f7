//! Cookie session authentication.
//!
//! Sessions are HS256 tokens carried in an HTTP-only cookie. Protected
//! handlers take an [`AuthUser`] argument; the extractor rejects the request
//! before the handler runs when the cookie is missing or invalid.

use axum::extract::FromRequestParts;
use axum::http::header::{ORIGIN, USER_AGENT};
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use linkup_models::UserId;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::metrics;
use crate::state::AppState;

/// Session token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Issued at
    pub iat: i64,
    /// Expiration
    pub exp: i64,
}

/// Why a session token was rejected.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("no session token")]
    Missing,

    #[error("malformed session token: {0}")]
    Malformed(String),

    #[error("session token expired")]
    Expired,

    #[error("session token verification failed: {0}")]
    Verification(String),
}

impl TokenError {
    fn label(&self) -> &'static str {
        match self {
            TokenError::Missing => "missing",
            TokenError::Malformed(_) => "malformed",
            TokenError::Expired => "expired",
            TokenError::Verification(_) => "verification",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidToken
            | ErrorKind::InvalidSignature
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => TokenError::Malformed(err.to_string()),
            _ => TokenError::Verification(err.to_string()),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Missing => ApiError::unauthorized("Unauthorized - No token provided"),
            TokenError::Malformed(_) => ApiError::unauthorized("Unauthorized - Invalid token format"),
            TokenError::Expired => ApiError::unauthorized("Unauthorized - Token expired"),
            TokenError::Verification(msg) => ApiError::internal(msg),
        }
    }
}

/// Sign a session token for a user.
pub fn issue_token(user_id: &UserId, secret: &str, ttl_hours: i64) -> Result<String, ApiError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + ttl_hours * 3600,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::internal(format!("Failed to sign token: {}", e)))
}

/// Verify a session token and return its claims.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

/// `Set-Cookie` value carrying a fresh session token.
pub fn session_cookie(config: &ApiConfig, token: &str) -> String {
    build_cookie(config, token, config.jwt_ttl_hours * 3600)
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_cookie(config: &ApiConfig) -> String {
    build_cookie(config, "", 0)
}

fn build_cookie(config: &ApiConfig, value: &str, max_age: i64) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        config.cookie_name, value, max_age
    );
    if config.is_production() {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Authenticated user extracted from the session cookie.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: UserId,
}

impl AuthUser {
    fn from_parts(parts: &Parts, config: &ApiConfig) -> Result<Self, TokenError> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(&config.cookie_name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(TokenError::Missing)?;

        let claims = verify_token(&token, &config.jwt_secret)?;
        Ok(Self {
            user_id: UserId::from(claims.sub),
        })
    }
}

/// Cookie names and caller hints for a rejected request.
fn diagnostics(parts: &Parts) -> serde_json::Value {
    let jar = CookieJar::from_headers(&parts.headers);
    let cookies: Vec<String> = jar.iter().map(|c| c.name().to_string()).collect();
    let header = |name| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string()
    };

    json!({
        "cookies": cookies,
        "origin": header(ORIGIN),
        "userAgent": header(USER_AGENT),
    })
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match Self::from_parts(parts, &state.config) {
            Ok(user) => Ok(user),
            Err(err) => {
                let details = diagnostics(parts);
                debug!(reason = err.label(), details = %details, "Rejected session: {}", err);
                metrics::record_auth_rejection(err.label());

                let mut api_err = ApiError::from(err);
                if state.config.auth_diagnostics {
                    if let ApiError::Unauthorized { details: slot, .. } = &mut api_err {
                        *slot = Some(details);
                    }
                }
                Err(api_err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    fn signed(exp_offset_secs: i64, secret: &str) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "user-1".to_string(),
            iat: now,
            exp: now + exp_offset_secs,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let token = issue_token(&UserId::from("user-1"), SECRET, 1).unwrap();
        let claims = tokio_test::assert_ok!(verify_token(&token, SECRET));
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_expired_is_distinct() {
        let token = signed(-120, SECRET);
        assert!(matches!(verify_token(&token, SECRET), Err(TokenError::Expired)));
    }

    #[test]
    fn test_wrong_secret_and_garbage_are_malformed() {
        let token = signed(3600, "other-secret");
        assert!(matches!(
            verify_token(&token, SECRET),
            Err(TokenError::Malformed(_))
        ));
        assert!(matches!(
            verify_token("not-a-token", SECRET),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn test_token_errors_map_to_messages() {
        let cases = [
            (TokenError::Missing, "Unauthorized - No token provided"),
            (
                TokenError::Malformed("x".into()),
                "Unauthorized - Invalid token format",
            ),
            (TokenError::Expired, "Unauthorized - Token expired"),
        ];
        for (err, expected) in cases {
            match ApiError::from(err) {
                ApiError::Unauthorized { message, .. } => assert_eq!(message, expected),
                other => panic!("unexpected {:?}", other),
            }
        }
        assert!(matches!(
            ApiError::from(TokenError::Verification("x".into())),
            ApiError::Internal(_)
        ));
    }

    #[test]
    fn test_cookie_attributes() {
        let mut config = ApiConfig::default();
        let cookie = session_cookie(&config, "abc");
        assert!(cookie.starts_with("token=abc; Path=/; HttpOnly; SameSite=Lax"));
        assert!(cookie.ends_with(&format!("Max-Age={}", 72 * 3600)));

        config.environment = "production".to_string();
        let cleared = clear_cookie(&config);
        assert!(cleared.contains("Max-Age=0"));
        assert!(cleared.ends_with("; Secure"));
    }
}
