//! Business logic services.
//!
//! Services own typed repositories and return API errors; handlers stay thin
//! wrappers around them.

pub mod accounts;
pub mod chat;
pub mod connections;
pub mod jobs;
pub mod notifications;
pub mod populate;
pub mod posts;
pub mod profiles;
pub mod saved_posts;

pub use accounts::AccountService;
pub use chat::ChatService;
pub use connections::{ConnectionService, ConnectionStatus};
pub use jobs::JobService;
pub use notifications::NotificationService;
pub use populate::Populator;
pub use posts::PostService;
pub use profiles::ProfileService;
pub use saved_posts::SavedPostService;

use linkup_models::{User, UserId};
use linkup_store::{
    ApplicationRepository, ChatRepository, InvitationRepository, JobRepository,
    NotificationRepository, PostRepository, SharedStore, UserRepository,
};

use crate::error::{ApiError, ApiResult};

/// One repository per collection, sharing a store handle.
#[derive(Clone)]
pub struct Repositories {
    pub users: UserRepository,
    pub posts: PostRepository,
    pub jobs: JobRepository,
    pub applications: ApplicationRepository,
    pub chats: ChatRepository,
    pub notifications: NotificationRepository,
    pub invitations: InvitationRepository,
}

impl Repositories {
    pub fn new(store: SharedStore) -> Self {
        Self {
            users: UserRepository::new(store.clone()),
            posts: PostRepository::new(store.clone()),
            jobs: JobRepository::new(store.clone()),
            applications: ApplicationRepository::new(store.clone()),
            chats: ChatRepository::new(store.clone()),
            notifications: NotificationRepository::new(store.clone()),
            invitations: InvitationRepository::new(store),
        }
    }

    /// Load a user or fail with 404.
    pub async fn require_user(&self, user_id: &UserId) -> ApiResult<User> {
        self.users
            .get(user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))
    }
}
