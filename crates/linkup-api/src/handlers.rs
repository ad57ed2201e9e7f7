//! Request handlers.

pub mod auth;
pub mod chat;
pub mod connections;
pub mod health;
pub mod jobs;
pub mod notifications;
pub mod posts;
pub mod saved_posts;
pub mod users;

pub use health::*;
