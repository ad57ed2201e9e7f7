//! Direct messaging.

use tracing::info;

use linkup_models::{Chat, ChatId, Message, Notification, NotificationType, UserId};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::security::sanitize_text;
use crate::services::notifications::NotificationService;
use crate::services::populate::{ChatView, MessageView, Populator};
use crate::services::Repositories;

/// Maximum message length in characters.
const MAX_MESSAGE_CHARS: usize = 5000;

#[derive(Clone)]
pub struct ChatService {
    repos: Repositories,
    populator: Populator,
    notifications: NotificationService,
}

impl ChatService {
    pub fn new(
        repos: Repositories,
        populator: Populator,
        notifications: NotificationService,
    ) -> Self {
        Self {
            repos,
            populator,
            notifications,
        }
    }

    /// The chat between the caller and `participant`, created on first use.
    pub async fn open(&self, user_id: &UserId, participant: &UserId) -> ApiResult<ChatView> {
        if user_id == participant {
            return Err(ApiError::bad_request("You cannot start a chat with yourself"));
        }
        self.repos.require_user(participant).await?;

        let chat = self.repos.chats.get_or_create(user_id, participant).await?;
        let mut views = self.populator.chats(vec![chat]).await?;
        Ok(views.remove(0))
    }

    pub async fn list(&self, user_id: &UserId) -> ApiResult<Vec<ChatView>> {
        let chats = self.repos.chats.list_for_user(user_id).await?;
        Ok(self.populator.chats(chats).await?)
    }

    async fn participant_chat(&self, user_id: &UserId, chat_id: &ChatId) -> ApiResult<Chat> {
        let chat = self
            .repos
            .chats
            .get(chat_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Chat not found"))?;
        if !chat.has_participant(user_id) {
            return Err(ApiError::forbidden("You are not a participant in this chat"));
        }
        Ok(chat)
    }

    pub async fn messages(&self, user_id: &UserId, chat_id: &ChatId) -> ApiResult<Vec<MessageView>> {
        self.participant_chat(user_id, chat_id).await?;
        let messages = self.repos.chats.list_messages(chat_id).await?;
        Ok(self.populator.messages(messages).await?)
    }

    pub async fn send(
        &self,
        user_id: &UserId,
        chat_id: &ChatId,
        content: &str,
    ) -> ApiResult<MessageView> {
        let content = sanitize_text(content);
        if content.is_empty() || content.chars().count() > MAX_MESSAGE_CHARS {
            return Err(ApiError::Validation(format!(
                "Message must be 1-{} characters",
                MAX_MESSAGE_CHARS
            )));
        }

        let chat = self.participant_chat(user_id, chat_id).await?;
        let message = Message::new(chat.id.clone(), user_id.clone(), content);
        self.repos.chats.add_message(&message).await?;
        metrics::record_message_sent();
        info!(chat_id = %chat.id, "Message sent");

        if let Some(other) = chat.other_participant(user_id) {
            self.notifications
                .notify(
                    Notification::new(other.clone(), NotificationType::Message, "You have a new message")
                        .with_actor(user_id.clone()),
                )
                .await;
        }

        let mut views = self.populator.messages(vec![message]).await?;
        Ok(views.remove(0))
    }
}
