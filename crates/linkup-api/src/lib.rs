//! Axum HTTP API server for LinkUp.
//!
//! This crate provides:
//! - REST endpoints for accounts, profiles, posts, jobs, connections,
//!   notifications and chat
//! - Cookie session authentication
//! - Rate limiting and security headers
//! - Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod security;
pub mod services;
pub mod state;

pub use config::{ApiConfig, StoreBackend};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
