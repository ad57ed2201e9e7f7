//! Post repository. Likes and comments are embedded in the post document.

use std::collections::HashMap;

use chrono::Utc;
use tracing::info;

use linkup_models::{Comment, CommentId, Post, PostId, UserId};

use crate::error::{StoreError, StoreResult};
use crate::query::Direction;
use crate::store::SharedStore;
use crate::types::{
    doc_ids, ArrayValue, Document, Fields, FromFirestoreValue, StructuredQuery, ToFirestoreValue,
    Value,
};

const POSTS: &str = "posts";

/// Repository for post documents.
#[derive(Clone)]
pub struct PostRepository {
    store: SharedStore,
}

impl PostRepository {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn create(&self, post: &Post) -> StoreResult<()> {
        self.store
            .create_document(POSTS, post.id.as_str(), post_to_fields(post))
            .await?;
        info!("Created post {} by {}", post.id, post.author);
        Ok(())
    }

    pub async fn get(&self, post_id: &PostId) -> StoreResult<Option<Post>> {
        match self.store.get_document(POSTS, post_id.as_str()).await? {
            Some(doc) => Ok(Some(document_to_post(&doc)?)),
            None => Ok(None),
        }
    }

    /// Get several posts; ids of deleted posts are skipped.
    pub async fn get_many(&self, post_ids: &[PostId]) -> StoreResult<Vec<Post>> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }
        let docs = self
            .store
            .batch_get_documents(POSTS, &doc_ids(post_ids))
            .await?;
        docs.iter().map(document_to_post).collect()
    }

    /// Newest posts first.
    pub async fn list_recent(&self, limit: i32) -> StoreResult<Vec<Post>> {
        let query = StructuredQuery::collection(POSTS)
            .order_by("created_at", Direction::Descending)
            .limit(limit);
        let docs = self.store.run_query("", query).await?;
        docs.iter().map(document_to_post).collect()
    }

    pub async fn delete(&self, post_id: &PostId) -> StoreResult<()> {
        self.store.delete_document(POSTS, post_id.as_str()).await?;
        info!("Deleted post {}", post_id);
        Ok(())
    }

    /// Replace the like list.
    pub async fn set_likes(&self, post_id: &PostId, likes: &[UserId]) -> StoreResult<()> {
        self.update_field(post_id, "likes", likes.to_firestore_value())
            .await
    }

    /// Replace the comment list.
    pub async fn set_comments(&self, post_id: &PostId, comments: &[Comment]) -> StoreResult<()> {
        let value = Value::ArrayValue(ArrayValue {
            values: Some(comments.iter().map(comment_to_value).collect()),
        });
        self.update_field(post_id, "comments", value).await
    }

    async fn update_field(&self, post_id: &PostId, field: &str, value: Value) -> StoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert(field.to_string(), value);
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());

        self.store
            .update_document(
                POSTS,
                post_id.as_str(),
                fields,
                Some(vec![field.to_string(), "updated_at".to_string()]),
            )
            .await?;
        Ok(())
    }
}

fn comment_to_value(comment: &Comment) -> Value {
    let mut fields = HashMap::new();
    fields.insert("id".to_string(), comment.id.to_firestore_value());
    fields.insert("content".to_string(), comment.content.to_firestore_value());
    fields.insert("user".to_string(), comment.user.to_firestore_value());
    fields.insert("created_at".to_string(), comment.created_at.to_firestore_value());
    fields.to_firestore_value()
}

fn value_to_comment(value: &Value) -> Option<Comment> {
    let fields = value.map_fields()?;
    let get_string = |key: &str| -> Option<String> {
        fields.get(key).and_then(|v| String::from_firestore_value(v))
    };

    Some(Comment {
        id: CommentId::from(get_string("id")?),
        content: get_string("content").unwrap_or_default(),
        user: UserId::from(get_string("user")?),
        created_at: fields
            .get("created_at")
            .and_then(chrono::DateTime::from_firestore_value)
            .unwrap_or_else(Utc::now),
    })
}

fn post_to_fields(post: &Post) -> Fields {
    let mut fields = HashMap::new();
    fields.insert("author".to_string(), post.author.to_firestore_value());
    fields.insert("description".to_string(), post.description.to_firestore_value());
    fields.insert("visibility".to_string(), post.visibility.as_str().to_firestore_value());
    fields.insert(
        "comment_permission".to_string(),
        post.comment_permission.as_str().to_firestore_value(),
    );
    fields.insert("likes".to_string(), post.likes.to_firestore_value());
    fields.insert(
        "comments".to_string(),
        Value::ArrayValue(ArrayValue {
            values: Some(post.comments.iter().map(comment_to_value).collect()),
        }),
    );
    fields.insert("created_at".to_string(), post.created_at.to_firestore_value());
    fields.insert("updated_at".to_string(), post.updated_at.to_firestore_value());

    if let Some(image) = &post.image {
        fields.insert("image".to_string(), image.to_firestore_value());
    }

    fields
}

fn document_to_post(doc: &Document) -> StoreResult<Post> {
    let id = doc
        .id()
        .ok_or_else(|| StoreError::invalid_document("post document has no name"))?;

    Ok(Post {
        id: PostId::from(id),
        author: doc.require("author")?,
        description: doc.string("description"),
        image: doc.get("image"),
        visibility: doc.parsed("visibility"),
        comment_permission: doc.parsed("comment_permission"),
        likes: doc.get_vec("likes"),
        comments: doc
            .field("comments")
            .map(|v| v.array_items().iter().filter_map(value_to_comment).collect())
            .unwrap_or_default(),
        created_at: doc.timestamp("created_at"),
        updated_at: doc.timestamp("updated_at"),
    })
}
