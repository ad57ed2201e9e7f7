//! Mail configuration.

use std::time::Duration;

use crate::error::{MailError, MailResult};

/// Default transactional mail endpoint.
const DEFAULT_API_URL: &str = "https://send.api.mailtrap.io/api/send";

/// Which mailer to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailProvider {
    /// Log messages instead of sending them.
    Log,
    /// Send through the HTTP mail API.
    Http,
}

/// Mail configuration.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub provider: MailProvider,
    pub api_url: String,
    pub api_key: Option<String>,
    pub from_email: String,
    pub from_name: String,
    pub timeout: Duration,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            provider: MailProvider::Log,
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            from_email: "no-reply@linkup.local".to_string(),
            from_name: "LinkUp".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl MailConfig {
    /// Create config from environment variables.
    pub fn from_env() -> MailResult<Self> {
        let defaults = Self::default();

        let provider = match std::env::var("MAIL_PROVIDER")
            .unwrap_or_else(|_| "log".to_string())
            .to_lowercase()
            .as_str()
        {
            "log" | "" => MailProvider::Log,
            "http" => MailProvider::Http,
            other => {
                return Err(MailError::config(format!(
                    "unknown MAIL_PROVIDER '{}', expected 'log' or 'http'",
                    other
                )))
            }
        };

        let api_key = std::env::var("MAIL_API_KEY").ok().filter(|k| !k.is_empty());
        if provider == MailProvider::Http && api_key.is_none() {
            return Err(MailError::config("MAIL_API_KEY must be set when MAIL_PROVIDER=http"));
        }

        Ok(Self {
            provider,
            api_url: std::env::var("MAIL_API_URL").unwrap_or(defaults.api_url),
            api_key,
            from_email: std::env::var("MAIL_FROM_EMAIL").unwrap_or(defaults.from_email),
            from_name: std::env::var("MAIL_FROM_NAME").unwrap_or(defaults.from_name),
            timeout: std::env::var("MAIL_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        })
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    fn clear_env() {
        for key in [
            "MAIL_PROVIDER",
            "MAIL_API_KEY",
            "MAIL_API_URL",
            "MAIL_FROM_EMAIL",
            "MAIL_FROM_NAME",
            "MAIL_TIMEOUT_SECS",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_to_log_provider() {
        clear_env();
        let config = MailConfig::from_env().unwrap();
        assert_eq!(config.provider, MailProvider::Log);
        assert_eq!(config.from_name, "LinkUp");
    }

    #[test]
    #[serial]
    fn test_http_provider_requires_key() {
        clear_env();
        std::env::set_var("MAIL_PROVIDER", "http");
        assert!(MailConfig::from_env().is_err());

        std::env::set_var("MAIL_API_KEY", "secret");
        let config = MailConfig::from_env().unwrap();
        assert_eq!(config.provider, MailProvider::Http);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_unknown_provider_is_rejected() {
        clear_env();
        std::env::set_var("MAIL_PROVIDER", "pigeon");
        assert!(MailConfig::from_env().is_err());
        clear_env();
    }
}
