//! API configuration.

use std::time::Duration;

use thiserror::Error;

/// Secret used when `JWT_SECRET` is unset outside production.
const DEVELOPMENT_JWT_SECRET: &str = "linkup-development-secret";

/// Which document store backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    Memory,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set in production")]
    MissingJwtSecret,

    #[error("unknown STORE_BACKEND '{0}', expected 'firestore' or 'memory'")]
    UnknownStoreBackend(String),
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit requests per second
    pub rate_limit_rps: u32,
    /// Request timeout
    pub request_timeout: Duration,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// HS256 signing secret for session tokens
    pub jwt_secret: String,
    /// Session token lifetime
    pub jwt_ttl_hours: i64,
    /// Name of the session cookie
    pub cookie_name: String,
    /// Base URL of the web client, used in email links
    pub frontend_url: String,
    /// Attach cookie/origin diagnostics to 401 bodies
    pub auth_diagnostics: bool,
    /// Document store backend
    pub store_backend: StoreBackend,
    /// Expose Prometheus metrics at /metrics
    pub metrics_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            cors_origins: vec!["http://localhost:5173".to_string()],
            rate_limit_rps: 20,
            request_timeout: Duration::from_secs(30),
            max_body_size: 5 * 1024 * 1024, // 5MB
            environment: "development".to_string(),
            jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
            jwt_ttl_hours: 72,
            cookie_name: "token".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            auth_diagnostics: false,
            store_backend: StoreBackend::Firestore,
            metrics_enabled: true,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let environment =
            std::env::var("ENVIRONMENT").unwrap_or_else(|_| defaults.environment.clone());

        let jwt_secret = match std::env::var("JWT_SECRET").ok().filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None if environment.eq_ignore_ascii_case("production") => {
                return Err(ConfigError::MissingJwtSecret)
            }
            None => defaults.jwt_secret.clone(),
        };

        let store_backend = match std::env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "firestore".to_string())
            .to_lowercase()
            .as_str()
        {
            "firestore" => StoreBackend::Firestore,
            "memory" => StoreBackend::Memory,
            other => return Err(ConfigError::UnknownStoreBackend(other.to_string())),
        };

        Ok(Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: env_parse("API_PORT").unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            rate_limit_rps: env_parse("RATE_LIMIT_RPS").unwrap_or(defaults.rate_limit_rps),
            request_timeout: Duration::from_secs(env_parse("REQUEST_TIMEOUT").unwrap_or(30)),
            max_body_size: env_parse("MAX_BODY_SIZE").unwrap_or(defaults.max_body_size),
            environment,
            jwt_secret,
            jwt_ttl_hours: env_parse("JWT_TTL_HOURS").unwrap_or(defaults.jwt_ttl_hours),
            cookie_name: std::env::var("AUTH_COOKIE_NAME").unwrap_or(defaults.cookie_name),
            frontend_url: std::env::var("FRONTEND_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.frontend_url),
            auth_diagnostics: env_flag("AUTH_DIAGNOSTICS").unwrap_or(false),
            store_backend,
            metrics_enabled: env_flag("METRICS_ENABLED").unwrap_or(true),
        })
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|v| v == "true" || v == "1")
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    fn clear_env() {
        for key in [
            "ENVIRONMENT",
            "JWT_SECRET",
            "JWT_TTL_HOURS",
            "STORE_BACKEND",
            "FRONTEND_URL",
            "AUTH_DIAGNOSTICS",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_development_defaults() {
        clear_env();
        let config = ApiConfig::from_env().unwrap();
        assert_eq!(config.jwt_ttl_hours, 72);
        assert_eq!(config.cookie_name, "token");
        assert_eq!(config.store_backend, StoreBackend::Firestore);
        assert!(!config.auth_diagnostics);
    }

    #[test]
    #[serial]
    fn test_production_requires_jwt_secret() {
        clear_env();
        std::env::set_var("ENVIRONMENT", "production");
        assert!(matches!(
            ApiConfig::from_env(),
            Err(ConfigError::MissingJwtSecret)
        ));

        std::env::set_var("JWT_SECRET", "s3cret");
        let config = ApiConfig::from_env().unwrap();
        assert!(config.is_production());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_store_backend_and_frontend_url() {
        clear_env();
        std::env::set_var("STORE_BACKEND", "memory");
        std::env::set_var("FRONTEND_URL", "https://linkup.example/");
        let config = ApiConfig::from_env().unwrap();
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.frontend_url, "https://linkup.example");

        std::env::set_var("STORE_BACKEND", "mongo");
        assert!(ApiConfig::from_env().is_err());
        clear_env();
    }
}
