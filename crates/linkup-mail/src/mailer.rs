//! Mailer implementations.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, info_span, Instrument};

use crate::config::{MailConfig, MailProvider};
use crate::error::{MailError, MailResult};

/// Shared handle to a mailer.
pub type SharedMailer = Arc<dyn Mailer>;

/// The email delivery capability.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> MailResult<()>;
}

/// Build the mailer selected by the configuration.
pub fn from_config(config: &MailConfig) -> MailResult<SharedMailer> {
    match config.provider {
        MailProvider::Log => Ok(Arc::new(LogMailer)),
        MailProvider::Http => Ok(Arc::new(HttpMailer::new(config.clone())?)),
    }
}

/// Logs messages instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> MailResult<()> {
        info!(to = %to, subject = %subject, body_len = body.len(), "Email (not sent, log mailer)");
        Ok(())
    }
}

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: Address<'a>,
    to: Vec<Address<'a>>,
    subject: &'a str,
    text: &'a str,
    category: &'a str,
}

/// Sends through a JSON transactional mail API with a bearer key.
pub struct HttpMailer {
    http: Client,
    config: MailConfig,
}

impl HttpMailer {
    pub fn new(config: MailConfig) -> MailResult<Self> {
        if config.api_key.is_none() {
            return Err(MailError::config("HTTP mailer requires an API key"));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("linkup-mail/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, config })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> MailResult<()> {
        let request = SendRequest {
            from: Address {
                email: &self.config.from_email,
                name: Some(&self.config.from_name),
            },
            to: vec![Address {
                email: to,
                name: None,
            }],
            subject,
            text: body,
            category: "account",
        };

        let span = info_span!("mail_send", subject = %subject);
        let response = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(self.config.api_key.as_deref().unwrap_or_default())
            .json(&request)
            .send()
            .instrument(span)
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected(status.as_u16(), text));
        }

        info!(to = %to, subject = %subject, "Email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn http_config(server: &MockServer) -> MailConfig {
        MailConfig {
            provider: MailProvider::Http,
            api_url: format!("{}/api/send", server.uri()),
            api_key: Some("test-key".to_string()),
            from_email: "no-reply@linkup.test".to_string(),
            from_name: "LinkUp".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_http_mailer_posts_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/send"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "to": [{ "email": "ada@example.com" }],
                "subject": "Hello",
                "text": "Body"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mailer = HttpMailer::new(http_config(&server)).unwrap();
        mailer.send("ada@example.com", "Hello", "Body").await.unwrap();
    }

    #[tokio::test]
    async fn test_http_mailer_surfaces_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let mailer = HttpMailer::new(http_config(&server)).unwrap();
        let err = mailer.send("ada@example.com", "Hello", "Body").await.unwrap_err();
        assert!(matches!(err, MailError::Rejected(401, _)));
    }

    #[tokio::test]
    async fn test_log_mailer_always_succeeds() {
        let mailer = from_config(&MailConfig::default()).unwrap();
        tokio_test::assert_ok!(mailer.send("ada@example.com", "Hi", "there").await);
    }
}
