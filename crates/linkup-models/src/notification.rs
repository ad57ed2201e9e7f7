//! User notifications.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{JobId, NotificationId, ParseEnumError, PostId, UserId};

/// What triggered a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Like,
    Comment,
    ConnectionRequest,
    ConnectionAccepted,
    ApplicationReceived,
    ApplicationStatus,
    Message,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Like => "like",
            NotificationType::Comment => "comment",
            NotificationType::ConnectionRequest => "connection_request",
            NotificationType::ConnectionAccepted => "connection_accepted",
            NotificationType::ApplicationReceived => "application_received",
            NotificationType::ApplicationStatus => "application_status",
            NotificationType::Message => "message",
        }
    }
}

impl FromStr for NotificationType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(NotificationType::Like),
            "comment" => Ok(NotificationType::Comment),
            "connection_request" => Ok(NotificationType::ConnectionRequest),
            "connection_accepted" => Ok(NotificationType::ConnectionAccepted),
            "application_received" => Ok(NotificationType::ApplicationReceived),
            "application_status" => Ok(NotificationType::ApplicationStatus),
            "message" => Ok(NotificationType::Message),
            other => Err(ParseEnumError::new("notification type", other)),
        }
    }
}

/// A notification addressed to one recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub recipient: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<UserId>,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_post: Option<PostId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_job: Option<JobId>,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Notification {
    /// Create an unread notification.
    pub fn new(recipient: UserId, kind: NotificationType, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: NotificationId::new(),
            recipient,
            actor: None,
            kind,
            content: content.into(),
            related_post: None,
            related_job: None,
            read: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_actor(mut self, actor: UserId) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn with_post(mut self, post: PostId) -> Self {
        self.related_post = Some(post);
        self
    }

    pub fn with_job(mut self, job: JobId) -> Self {
        self.related_job = Some(job);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_as_type() {
        let n = Notification::new(UserId::from("u"), NotificationType::ConnectionRequest, "hi")
            .with_actor(UserId::from("a"));
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "connection_request");
        assert_eq!(json["read"], false);
        assert_eq!(json["actor"], "a");
    }
}
