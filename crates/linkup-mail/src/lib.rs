//! Email delivery for LinkUp.
//!
//! This crate provides:
//! - The `Mailer` capability (`send(to, subject, body)`)
//! - `LogMailer`, which only logs, for development and tests
//! - `HttpMailer`, which posts to a transactional mail API
//! - Message templates for account emails

pub mod config;
pub mod error;
pub mod mailer;
pub mod templates;

pub use config::{MailConfig, MailProvider};
pub use error::{MailError, MailResult};
pub use mailer::{from_config, HttpMailer, LogMailer, Mailer, SharedMailer};
pub use templates::Email;
