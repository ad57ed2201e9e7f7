//! Mail error types.

use thiserror::Error;

/// Result type for mail operations.
pub type MailResult<T> = Result<T, MailError>;

/// Errors that can occur while sending email.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail configuration error: {0}")]
    Config(String),

    #[error("Mail API rejected the message ({0}): {1}")]
    Rejected(u16, String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MailError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
