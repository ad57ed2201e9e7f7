//! Shared data models for the LinkUp backend.
//!
//! This crate provides Serde-serializable types for:
//! - Typed document identifiers
//! - Users and their display summaries
//! - Posts, comments and likes
//! - Jobs and applications
//! - Chats and messages
//! - Notifications and connection invitations

pub mod chat;
pub mod ids;
pub mod invitation;
pub mod job;
pub mod notification;
pub mod post;
pub mod user;

// Re-export common types
pub use chat::{Chat, Message};
pub use ids::{
    ApplicationId, ChatId, CommentId, InvitationId, JobId, MessageId, NotificationId, PostId,
    UserId,
};
pub use invitation::{Invitation, InvitationStatus};
pub use job::{Application, ApplicationStatus, EmploymentType, Job, WorkplaceType};
pub use notification::{Notification, NotificationType};
pub use post::{Comment, CommentPermission, Post, Visibility};
pub use user::{normalize_email, User, UserSummary};

/// Error returned when parsing a stored enumeration value fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
