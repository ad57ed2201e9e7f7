//! User records and display summaries.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{PostId, UserId};

/// A user account with profile fields.
///
/// Credentials (`password_hash`, reset token fields) never leave the server:
/// they are skipped when serializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub about: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub profile_picture: String,
    #[serde(default)]
    pub banner_image: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub connections: Vec<UserId>,
    /// Saved posts in insertion order. Treated as a set.
    #[serde(default)]
    pub saved_posts: Vec<PostId>,
    #[serde(skip_serializing, default)]
    pub reset_password_token: Option<String>,
    #[serde(skip_serializing, default)]
    pub reset_password_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with empty profile fields.
    pub fn new(
        name: impl Into<String>,
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            name: name.into(),
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            headline: String::new(),
            about: String::new(),
            location: String::new(),
            profile_picture: String::new(),
            banner_image: String::new(),
            skills: Vec::new(),
            connections: Vec::new(),
            saved_posts: Vec::new(),
            reset_password_token: None,
            reset_password_expires: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check whether a post is in the saved set.
    pub fn has_saved(&self, post_id: &PostId) -> bool {
        self.saved_posts.contains(post_id)
    }

    /// Check whether `other` is a connection.
    pub fn is_connected_to(&self, other: &UserId) -> bool {
        self.connections.contains(other)
    }

    /// Display fields used when this user is populated into another document.
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            username: self.username.clone(),
            headline: self.headline.clone(),
            profile_picture: self.profile_picture.clone(),
        }
    }
}

/// Selected display fields of a user, used when resolving references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    pub username: String,
    pub headline: String,
    pub profile_picture: String,
}

impl UserSummary {
    /// Placeholder for a reference whose user no longer exists.
    pub fn deleted(id: UserId) -> Self {
        Self {
            id,
            name: "Deleted user".to_string(),
            username: String::new(),
            headline: String::new(),
            profile_picture: String::new(),
        }
    }
}

/// Normalize an email address for lookups and uniqueness checks.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
