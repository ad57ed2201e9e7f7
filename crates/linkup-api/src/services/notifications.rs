//! Notification service.

use tracing::{debug, warn};

use linkup_models::{Notification, NotificationId, UserId};
use linkup_store::NotificationRepository;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::services::populate::{NotificationView, Populator};

#[derive(Clone)]
pub struct NotificationService {
    notifications: NotificationRepository,
    populator: Populator,
}

impl NotificationService {
    pub fn new(notifications: NotificationRepository, populator: Populator) -> Self {
        Self {
            notifications,
            populator,
        }
    }

    /// Record a notification as a side effect of another action. Failures
    /// are logged and never propagate to the triggering request.
    pub async fn notify(&self, notification: Notification) {
        if notification.actor.as_ref() == Some(&notification.recipient) {
            return;
        }

        let kind = notification.kind.as_str();
        match self.notifications.create(&notification).await {
            Ok(()) => {
                debug!(recipient = %notification.recipient, kind, "Notification recorded");
                metrics::record_notification(kind, true);
            }
            Err(e) => {
                warn!(recipient = %notification.recipient, kind, "Failed to record notification: {}", e);
                metrics::record_notification(kind, false);
            }
        }
    }

    pub async fn list(&self, user_id: &UserId) -> ApiResult<Vec<NotificationView>> {
        let notifications = self.notifications.list_for_recipient(user_id).await?;
        Ok(self.populator.notifications(notifications).await?)
    }

    pub async fn count_unread(&self, user_id: &UserId) -> ApiResult<usize> {
        Ok(self.notifications.count_unread(user_id).await?)
    }

    async fn owned(&self, user_id: &UserId, id: &NotificationId) -> ApiResult<Notification> {
        let notification = self
            .notifications
            .get(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Notification not found"))?;
        if &notification.recipient != user_id {
            return Err(ApiError::forbidden("Not authorized to access this notification"));
        }
        Ok(notification)
    }

    pub async fn mark_read(
        &self,
        user_id: &UserId,
        id: &NotificationId,
    ) -> ApiResult<NotificationView> {
        self.owned(user_id, id).await?;
        let updated = self.notifications.mark_read(id).await?;
        let mut views = self.populator.notifications(vec![updated]).await?;
        Ok(views.remove(0))
    }

    pub async fn mark_all_read(&self, user_id: &UserId) -> ApiResult<usize> {
        Ok(self.notifications.mark_all_read(user_id).await?)
    }

    pub async fn delete(&self, user_id: &UserId, id: &NotificationId) -> ApiResult<()> {
        self.owned(user_id, id).await?;
        self.notifications.delete(id).await?;
        Ok(())
    }

    pub async fn delete_all(&self, user_id: &UserId) -> ApiResult<usize> {
        Ok(self.notifications.delete_all(user_id).await?)
    }
}
