//! Posts with embedded likes and comments.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{CommentId, ParseEnumError, PostId, UserId};

/// Who can see a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Connections,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Connections => "connections",
            Visibility::Private => "private",
        }
    }
}

impl FromStr for Visibility {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "connections" => Ok(Visibility::Connections),
            "private" => Ok(Visibility::Private),
            other => Err(ParseEnumError::new("visibility", other)),
        }
    }
}

/// Who can comment on a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum CommentPermission {
    #[default]
    Everyone,
    Connections,
    Nobody,
}

impl CommentPermission {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentPermission::Everyone => "everyone",
            CommentPermission::Connections => "connections",
            CommentPermission::Nobody => "nobody",
        }
    }
}

impl FromStr for CommentPermission {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "everyone" => Ok(CommentPermission::Everyone),
            "connections" => Ok(CommentPermission::Connections),
            "nobody" => Ok(CommentPermission::Nobody),
            other => Err(ParseEnumError::new("comment permission", other)),
        }
    }
}

/// A comment embedded in a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub content: String,
    pub user: UserId,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(user: UserId, content: impl Into<String>) -> Self {
        Self {
            id: CommentId::new(),
            content: content.into(),
            user,
            created_at: Utc::now(),
        }
    }
}

/// A post in the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub author: UserId,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub comment_permission: CommentPermission,
    #[serde(default)]
    pub likes: Vec<UserId>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Create a new public post.
    pub fn new(author: UserId, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: PostId::new(),
            author,
            description: description.into(),
            image: None,
            visibility: Visibility::default(),
            comment_permission: CommentPermission::default(),
            likes: Vec::new(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_liked_by(&self, user: &UserId) -> bool {
        self.likes.contains(user)
    }

    /// Whether `viewer` may see this post. `connected` tells whether the
    /// viewer is a connection of the author.
    pub fn is_visible_to(&self, viewer: &UserId, connected: bool) -> bool {
        if &self.author == viewer {
            return true;
        }
        match self.visibility {
            Visibility::Public => true,
            Visibility::Connections => connected,
            Visibility::Private => false,
        }
    }

    /// Whether `user` may comment. `connected` as in [`Post::is_visible_to`].
    pub fn accepts_comment_from(&self, user: &UserId, connected: bool) -> bool {
        if &self.author == user {
            return true;
        }
        match self.comment_permission {
            CommentPermission::Everyone => true,
            CommentPermission::Connections => connected,
            CommentPermission::Nobody => false,
        }
    }
}
