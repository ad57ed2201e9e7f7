//! Notification repository.

use std::collections::HashMap;

use chrono::Utc;
use tracing::info;

use linkup_models::{Notification, NotificationId, NotificationType, UserId};

use crate::error::{StoreError, StoreResult};
use crate::store::SharedStore;
use crate::types::{Document, Fields, StructuredQuery, ToFirestoreValue, Value};

const NOTIFICATIONS: &str = "notifications";

/// Repository for notification documents.
#[derive(Clone)]
pub struct NotificationRepository {
    store: SharedStore,
}

impl NotificationRepository {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn create(&self, notification: &Notification) -> StoreResult<()> {
        self.store
            .create_document(
                NOTIFICATIONS,
                notification.id.as_str(),
                notification_to_fields(notification),
            )
            .await?;
        Ok(())
    }

    pub async fn get(&self, id: &NotificationId) -> StoreResult<Option<Notification>> {
        match self.store.get_document(NOTIFICATIONS, id.as_str()).await? {
            Some(doc) => Ok(Some(document_to_notification(&doc)?)),
            None => Ok(None),
        }
    }

    /// A user's notifications, newest first.
    pub async fn list_for_recipient(&self, recipient: &UserId) -> StoreResult<Vec<Notification>> {
        let query = StructuredQuery::collection(NOTIFICATIONS)
            .where_eq("recipient", recipient.to_firestore_value());
        let docs = self.store.run_query("", query).await?;

        let mut notifications = docs
            .iter()
            .map(document_to_notification)
            .collect::<StoreResult<Vec<_>>>()?;
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn list_unread(&self, recipient: &UserId) -> StoreResult<Vec<Document>> {
        let query = StructuredQuery::collection(NOTIFICATIONS)
            .where_eq("recipient", recipient.to_firestore_value())
            .where_eq("read", Value::BooleanValue(false));
        self.store.run_query("", query).await
    }

    pub async fn count_unread(&self, recipient: &UserId) -> StoreResult<usize> {
        Ok(self.list_unread(recipient).await?.len())
    }

    pub async fn mark_read(&self, id: &NotificationId) -> StoreResult<Notification> {
        let mut fields = HashMap::new();
        fields.insert("read".to_string(), true.to_firestore_value());
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());

        let doc = self
            .store
            .update_document(
                NOTIFICATIONS,
                id.as_str(),
                fields,
                Some(vec!["read".to_string(), "updated_at".to_string()]),
            )
            .await?;
        document_to_notification(&doc)
    }

    /// Mark every unread notification of a user as read; returns how many changed.
    pub async fn mark_all_read(&self, recipient: &UserId) -> StoreResult<usize> {
        let unread = self.list_unread(recipient).await?;
        for doc in &unread {
            if let Some(id) = doc.id() {
                self.mark_read(&NotificationId::from(id)).await?;
            }
        }
        Ok(unread.len())
    }

    pub async fn delete(&self, id: &NotificationId) -> StoreResult<()> {
        self.store.delete_document(NOTIFICATIONS, id.as_str()).await
    }

    /// Delete every notification of a user; returns how many were removed.
    pub async fn delete_all(&self, recipient: &UserId) -> StoreResult<usize> {
        let notifications = self.list_for_recipient(recipient).await?;
        for notification in &notifications {
            self.delete(&notification.id).await?;
        }
        info!(
            "Deleted {} notifications for {}",
            notifications.len(),
            recipient
        );
        Ok(notifications.len())
    }
}

fn notification_to_fields(notification: &Notification) -> Fields {
    let mut fields = HashMap::new();
    fields.insert("recipient".to_string(), notification.recipient.to_firestore_value());
    fields.insert("type".to_string(), notification.kind.as_str().to_firestore_value());
    fields.insert("content".to_string(), notification.content.to_firestore_value());
    fields.insert("read".to_string(), notification.read.to_firestore_value());
    fields.insert("created_at".to_string(), notification.created_at.to_firestore_value());
    fields.insert("updated_at".to_string(), notification.updated_at.to_firestore_value());

    if let Some(actor) = &notification.actor {
        fields.insert("actor".to_string(), actor.to_firestore_value());
    }
    if let Some(post) = &notification.related_post {
        fields.insert("related_post".to_string(), post.to_firestore_value());
    }
    if let Some(job) = &notification.related_job {
        fields.insert("related_job".to_string(), job.to_firestore_value());
    }

    fields
}

fn document_to_notification(doc: &Document) -> StoreResult<Notification> {
    let id = doc
        .id()
        .ok_or_else(|| StoreError::invalid_document("notification document has no name"))?;
    let kind = doc
        .require::<String>("type")?
        .parse::<NotificationType>()
        .map_err(|e| StoreError::invalid_document(format!("notification {}: {}", id, e)))?;

    Ok(Notification {
        id: NotificationId::from(id),
        recipient: doc.require("recipient")?,
        actor: doc.get("actor"),
        kind,
        content: doc.string("content"),
        related_post: doc.get("related_post"),
        related_job: doc.get("related_job"),
        read: doc.get("read").unwrap_or(false),
        created_at: doc.timestamp("created_at"),
        updated_at: doc.timestamp("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use linkup_models::PostId;

    use super::*;
    use crate::memory::MemoryStore;

    #[tokio::test]
    async fn test_count_read_delete_cycle() {
        let repo = NotificationRepository::new(Arc::new(MemoryStore::new()));
        let ada = UserId::from("ada");

        let like = Notification::new(ada.clone(), NotificationType::Like, "liked your post")
            .with_actor(UserId::from("bob"))
            .with_post(PostId::from("p1"));
        let comment = Notification::new(ada.clone(), NotificationType::Comment, "commented");
        let other = Notification::new(UserId::from("bob"), NotificationType::Message, "hi");
        for n in [&like, &comment, &other] {
            repo.create(n).await.unwrap();
        }

        assert_eq!(repo.count_unread(&ada).await.unwrap(), 2);
        repo.mark_read(&like.id).await.unwrap();
        assert_eq!(repo.count_unread(&ada).await.unwrap(), 1);
        assert_eq!(repo.mark_all_read(&ada).await.unwrap(), 1);
        assert_eq!(repo.count_unread(&ada).await.unwrap(), 0);

        let loaded = repo.get(&like.id).await.unwrap().unwrap();
        assert_eq!(loaded.kind, NotificationType::Like);
        assert_eq!(loaded.related_post, Some(PostId::from("p1")));
        assert!(loaded.read);

        assert_eq!(repo.delete_all(&ada).await.unwrap(), 2);
        assert!(repo.list_for_recipient(&ada).await.unwrap().is_empty());
        assert_eq!(repo.list_for_recipient(&UserId::from("bob")).await.unwrap().len(), 1);
    }
}
