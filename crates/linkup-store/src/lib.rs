//! Document persistence for LinkUp.
//!
//! This crate provides:
//! - The `DocumentStore` seam with a Firestore REST backend and an in-memory backend
//! - Service account authentication via gcp_auth, with token caching
//! - Retry with exponential backoff and jitter
//! - Typed repositories per collection
//! - Structured query builder

pub mod application_repo;
pub mod chat_repo;
pub mod client;
pub mod error;
pub mod invitation_repo;
pub mod job_repo;
pub mod memory;
pub mod metrics;
pub mod notification_repo;
pub mod post_repo;
pub mod query;
pub mod retry;
pub mod store;
pub mod token_cache;
pub mod types;
pub mod user_repo;

pub use application_repo::ApplicationRepository;
pub use chat_repo::ChatRepository;
pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{StoreError, StoreResult};
pub use invitation_repo::InvitationRepository;
pub use job_repo::JobRepository;
pub use memory::MemoryStore;
pub use notification_repo::NotificationRepository;
pub use post_repo::PostRepository;
pub use query::Direction;
pub use retry::RetryConfig;
pub use store::{is_valid_doc_id, DocumentStore, SharedStore};
pub use types::{Document, FromFirestoreValue, ToFirestoreValue, Value};
pub use user_repo::UserRepository;
