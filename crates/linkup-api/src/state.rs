//! Application state.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use linkup_mail::{MailConfig, MailError, SharedMailer};
use linkup_store::{FirestoreClient, MemoryStore, SharedStore, StoreError};

use crate::config::{ApiConfig, StoreBackend};
use crate::services::{
    AccountService, ChatService, ConnectionService, JobService, NotificationService, Populator,
    PostService, ProfileService, Repositories, SavedPostService,
};

/// Failure while building the application state at startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("mailer unavailable: {0}")]
    Mail(#[from] MailError),
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: SharedStore,
    pub mailer: SharedMailer,
    pub accounts: AccountService,
    pub profiles: ProfileService,
    pub posts: PostService,
    pub saved_posts: SavedPostService,
    pub jobs: JobService,
    pub connections: ConnectionService,
    pub notifications: NotificationService,
    pub chat: ChatService,
}

impl AppState {
    /// Build the configured store and mailer, then verify the store is
    /// reachable.
    pub async fn new(config: ApiConfig) -> Result<Self, StartupError> {
        let store: SharedStore = match config.store_backend {
            StoreBackend::Firestore => Arc::new(FirestoreClient::from_env().await?),
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
        };
        store.ping().await?;
        info!(backend = store.backend(), "Document store ready");

        let mailer = linkup_mail::from_config(&MailConfig::from_env()?)?;

        Ok(Self::with_store(config, store, mailer))
    }

    /// Wire services around an existing store and mailer.
    pub fn with_store(config: ApiConfig, store: SharedStore, mailer: SharedMailer) -> Self {
        let repos = Repositories::new(store.clone());
        let populator = Populator::new(repos.users.clone(), repos.jobs.clone());
        let notifications = NotificationService::new(repos.notifications.clone(), populator.clone());

        Self {
            accounts: AccountService::new(repos.users.clone(), mailer.clone(), config.clone()),
            profiles: ProfileService::new(repos.clone()),
            posts: PostService::new(repos.clone(), populator.clone(), notifications.clone()),
            saved_posts: SavedPostService::new(repos.clone(), populator.clone()),
            jobs: JobService::new(repos.clone(), populator.clone(), notifications.clone()),
            connections: ConnectionService::new(
                repos.clone(),
                populator.clone(),
                notifications.clone(),
            ),
            chat: ChatService::new(repos, populator, notifications.clone()),
            notifications,
            config,
            store,
            mailer,
        }
    }

    /// Release the store after the server has stopped.
    pub async fn shutdown(&self) {
        self.store.close().await;
        info!(backend = self.store.backend(), "Document store closed");
    }
}
