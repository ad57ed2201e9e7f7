//! Typed document identifiers.
//!
//! Every cross-collection reference is stored as one of these newtypes so a
//! post id can never be passed where a user id is expected.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! document_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Generate a new random ID.
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Create from an existing string.
            pub fn from_string(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Get the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

document_id!(
    /// Unique identifier for a user.
    UserId
);
document_id!(
    /// Unique identifier for a post.
    PostId
);
document_id!(
    /// Unique identifier for a comment embedded in a post.
    CommentId
);
document_id!(
    /// Unique identifier for a job posting.
    JobId
);
document_id!(
    /// Identifier of an application. Derived from the (job, applicant) pair.
    ApplicationId
);
document_id!(
    /// Identifier of a chat. Derived from the sorted participant pair.
    ChatId
);
document_id!(
    /// Unique identifier for a chat message.
    MessageId
);
document_id!(
    /// Unique identifier for a notification.
    NotificationId
);
document_id!(
    /// Identifier of a connection invitation. Derived from (sender, recipient).
    InvitationId
);

impl ApplicationId {
    /// The one application id a given applicant can hold for a job.
    pub fn for_pair(job: &JobId, applicant: &UserId) -> Self {
        Self(format!("{}_{}", job.as_str(), applicant.as_str()))
    }
}

impl ChatId {
    /// Order-independent id for the chat between two users.
    pub fn for_pair(a: &UserId, b: &UserId) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self(format!("{}_{}", first.as_str(), second.as_str()))
    }
}

impl InvitationId {
    /// Directional id for an invitation from `sender` to `recipient`.
    pub fn for_pair(sender: &UserId, recipient: &UserId) -> Self {
        Self(format!("{}_{}", sender.as_str(), recipient.as_str()))
    }
}
