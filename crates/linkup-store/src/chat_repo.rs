//! Chat repository.
//!
//! Chats are keyed by the sorted participant pair, so creating a chat for
//! the same two users always resolves to one document. Messages live in the
//! `chats/{chat_id}/messages` subcollection.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use linkup_models::{Chat, ChatId, Message, MessageId, UserId};

use crate::error::{StoreError, StoreResult};
use crate::query::Direction;
use crate::store::SharedStore;
use crate::types::{Document, Fields, StructuredQuery, ToFirestoreValue};

const CHATS: &str = "chats";
const MESSAGES: &str = "messages";

/// Repository for chats and their messages.
#[derive(Clone)]
pub struct ChatRepository {
    store: SharedStore,
}

impl ChatRepository {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    fn chat_path(chat_id: &ChatId) -> String {
        format!("{}/{}", CHATS, chat_id)
    }

    fn messages_path(chat_id: &ChatId) -> String {
        format!("{}/{}", Self::chat_path(chat_id), MESSAGES)
    }

    pub async fn get(&self, chat_id: &ChatId) -> StoreResult<Option<Chat>> {
        match self.store.get_document(CHATS, chat_id.as_str()).await? {
            Some(doc) => Ok(Some(document_to_chat(&doc)?)),
            None => Ok(None),
        }
    }

    /// Return the chat for a pair, creating it on first use.
    ///
    /// A concurrent creator that loses the create-only write re-reads the
    /// winner's document.
    pub async fn get_or_create(&self, a: &UserId, b: &UserId) -> StoreResult<Chat> {
        let chat = Chat::between(a.clone(), b.clone());
        if let Some(existing) = self.get(&chat.id).await? {
            return Ok(existing);
        }

        match self
            .store
            .create_document(CHATS, chat.id.as_str(), chat_to_fields(&chat))
            .await
        {
            Ok(_) => {
                info!("Created chat {}", chat.id);
                Ok(chat)
            }
            Err(e) if e.is_already_exists() => {
                debug!("Chat {} created concurrently, re-reading", chat.id);
                self.get(&chat.id)
                    .await?
                    .ok_or_else(|| StoreError::not_found(format!("{}/{}", CHATS, chat.id)))
            }
            Err(e) => Err(e),
        }
    }

    /// Chats a user takes part in, most recently active first.
    pub async fn list_for_user(&self, user_id: &UserId) -> StoreResult<Vec<Chat>> {
        let query = StructuredQuery::collection(CHATS)
            .where_array_contains("participants", user_id.to_firestore_value());
        let docs = self.store.run_query("", query).await?;

        let mut chats = docs
            .iter()
            .map(document_to_chat)
            .collect::<StoreResult<Vec<_>>>()?;
        chats.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(chats)
    }

    /// Append a message. The chat's last message only moves forward: a
    /// message older than the chat's latest activity is stored but does not
    /// replace `last_message`.
    pub async fn add_message(&self, message: &Message) -> StoreResult<()> {
        let chat = self
            .get(&message.chat)
            .await?
            .ok_or_else(|| StoreError::not_found(format!("{}/{}", CHATS, message.chat)))?;

        self.store
            .create_document(
                &Self::messages_path(&message.chat),
                message.id.as_str(),
                message_to_fields(message),
            )
            .await?;

        if chat.last_message.is_some() && message.created_at < chat.updated_at {
            debug!("Message {} is older than chat {} activity", message.id, chat.id);
            return Ok(());
        }
        self.touch(&message.chat, &message.content, message.created_at)
            .await
    }

    async fn touch(&self, chat_id: &ChatId, last_message: &str, at: DateTime<Utc>) -> StoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("last_message".to_string(), last_message.to_firestore_value());
        fields.insert("updated_at".to_string(), at.to_firestore_value());

        self.store
            .update_document(
                CHATS,
                chat_id.as_str(),
                fields,
                Some(vec!["last_message".to_string(), "updated_at".to_string()]),
            )
            .await?;
        Ok(())
    }

    /// Messages of a chat, oldest first.
    pub async fn list_messages(&self, chat_id: &ChatId) -> StoreResult<Vec<Message>> {
        let query =
            StructuredQuery::collection(MESSAGES).order_by("created_at", Direction::Ascending);
        let docs = self
            .store
            .run_query(&Self::chat_path(chat_id), query)
            .await?;
        docs.iter()
            .map(|doc| document_to_message(chat_id, doc))
            .collect()
    }
}

fn chat_to_fields(chat: &Chat) -> Fields {
    let mut fields = HashMap::new();
    fields.insert("participants".to_string(), chat.participants.to_firestore_value());
    fields.insert("created_at".to_string(), chat.created_at.to_firestore_value());
    fields.insert("updated_at".to_string(), chat.updated_at.to_firestore_value());

    if let Some(last) = &chat.last_message {
        fields.insert("last_message".to_string(), last.to_firestore_value());
    }

    fields
}

fn document_to_chat(doc: &Document) -> StoreResult<Chat> {
    let id = doc
        .id()
        .ok_or_else(|| StoreError::invalid_document("chat document has no name"))?;

    let participants: [UserId; 2] = doc
        .get_vec::<UserId>("participants")
        .try_into()
        .map_err(|_| StoreError::invalid_document(format!("chat {} must have two participants", id)))?;

    Ok(Chat {
        id: ChatId::from(id),
        participants,
        last_message: doc.get("last_message"),
        created_at: doc.timestamp("created_at"),
        updated_at: doc.timestamp("updated_at"),
    })
}

fn message_to_fields(message: &Message) -> Fields {
    let mut fields = HashMap::new();
    fields.insert("sender".to_string(), message.sender.to_firestore_value());
    fields.insert("content".to_string(), message.content.to_firestore_value());
    fields.insert("created_at".to_string(), message.created_at.to_firestore_value());
    fields
}

fn document_to_message(chat_id: &ChatId, doc: &Document) -> StoreResult<Message> {
    let id = doc
        .id()
        .ok_or_else(|| StoreError::invalid_document("message document has no name"))?;

    Ok(Message {
        id: MessageId::from(id),
        chat: chat_id.clone(),
        sender: doc.require("sender")?,
        content: doc.string("content"),
        created_at: doc.timestamp("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::memory::MemoryStore;

    #[tokio::test]
    async fn test_get_or_create_is_symmetric() {
        let repo = ChatRepository::new(Arc::new(MemoryStore::new()));
        let ada = UserId::from("ada");
        let bob = UserId::from("bob");

        let first = repo.get_or_create(&ada, &bob).await.unwrap();
        let second = repo.get_or_create(&bob, &ada).await.unwrap();
        assert_eq!(first.id, second.id);

        // One user may take part in many chats.
        repo.get_or_create(&ada, &UserId::from("cy")).await.unwrap();
        assert_eq!(repo.list_for_user(&ada).await.unwrap().len(), 2);
        assert_eq!(repo.list_for_user(&bob).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_messages_are_ordered_and_touch_chat() {
        let repo = ChatRepository::new(Arc::new(MemoryStore::new()));
        let ada = UserId::from("ada");
        let bob = UserId::from("bob");
        let chat = repo.get_or_create(&ada, &bob).await.unwrap();

        let mut first = Message::new(chat.id.clone(), ada.clone(), "hi");
        first.created_at = Utc::now() - chrono::Duration::seconds(5);
        let second = Message::new(chat.id.clone(), bob.clone(), "hello");
        repo.add_message(&second).await.unwrap();
        repo.add_message(&first).await.unwrap();

        let messages = repo.list_messages(&chat.id).await.unwrap();
        let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["hi", "hello"]);

        // The older message arrived last but does not replace the newer one.
        let loaded = repo.get(&chat.id).await.unwrap().unwrap();
        assert_eq!(loaded.last_message.as_deref(), Some("hello"));
        assert_eq!(loaded.updated_at, second.created_at);
    }

    #[tokio::test]
    async fn test_message_to_missing_chat_is_not_found() {
        let repo = ChatRepository::new(Arc::new(MemoryStore::new()));
        let message = Message::new(ChatId::from("nobody_nowhere"), UserId::from("ada"), "hi");
        let err = repo.add_message(&message).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(repo.list_messages(&message.chat).await.unwrap().is_empty());
    }
}
