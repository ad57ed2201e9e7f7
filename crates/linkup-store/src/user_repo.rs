//! User repository.
//!
//! Uses a dual-document pattern for email uniqueness:
//! - User doc at `users/{user_id}`
//! - Email claim at `user_emails/{normalized email}` created with a
//!   create-only write, so a second signup with the same address conflicts

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use linkup_models::{normalize_email, PostId, User, UserId};

use crate::error::{StoreError, StoreResult};
use crate::query::Direction;
use crate::store::SharedStore;
use crate::types::{doc_ids, Document, Fields, StructuredQuery, ToFirestoreValue, Value};

const USERS: &str = "users";
const USER_EMAILS: &str = "user_emails";

/// Profile fields a user may edit.
const PROFILE_FIELDS: [&str; 7] = [
    "name",
    "headline",
    "about",
    "location",
    "profile_picture",
    "banner_image",
    "skills",
];

/// Repository for user documents.
#[derive(Clone)]
pub struct UserRepository {
    store: SharedStore,
}

impl UserRepository {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Create a user, claiming its email first.
    ///
    /// Fails with `AlreadyExists` when the email is already claimed.
    pub async fn create(&self, user: &User) -> StoreResult<()> {
        let email = normalize_email(&user.email);

        let mut claim = HashMap::new();
        claim.insert("user_id".to_string(), user.id.to_firestore_value());
        claim.insert("created_at".to_string(), user.created_at.to_firestore_value());
        self.store.create_document(USER_EMAILS, &email, claim).await?;

        if let Err(e) = self
            .store
            .create_document(USERS, user.id.as_str(), user_to_fields(user))
            .await
        {
            // Release the claim so the address can be used again.
            if let Err(release) = self.store.delete_document(USER_EMAILS, &email).await {
                warn!("Failed to release email claim for {}: {}", email, release);
            }
            return Err(e);
        }

        info!("Created user {}", user.id);
        Ok(())
    }

    /// Get a user by ID.
    pub async fn get(&self, user_id: &UserId) -> StoreResult<Option<User>> {
        match self.store.get_document(USERS, user_id.as_str()).await? {
            Some(doc) => Ok(Some(document_to_user(&doc)?)),
            None => Ok(None),
        }
    }

    /// Get several users; unknown ids are skipped.
    pub async fn get_many(&self, user_ids: &[UserId]) -> StoreResult<Vec<User>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let docs = self
            .store
            .batch_get_documents(USERS, &doc_ids(user_ids))
            .await?;
        docs.iter().map(document_to_user).collect()
    }

    /// Look up a user through the email claim.
    pub async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = normalize_email(email);
        let Some(claim) = self.store.get_document(USER_EMAILS, &email).await? else {
            return Ok(None);
        };
        let user_id: UserId = claim.require("user_id")?;
        self.get(&user_id).await
    }

    /// Check whether a username is taken.
    pub async fn username_exists(&self, username: &str) -> StoreResult<bool> {
        let query = StructuredQuery::collection(USERS)
            .where_eq("username", username.to_firestore_value())
            .limit(1);
        Ok(!self.store.run_query("", query).await?.is_empty())
    }

    /// Find the user holding a reset-token digest.
    pub async fn find_by_reset_token(&self, token_hash: &str) -> StoreResult<Option<User>> {
        let query = StructuredQuery::collection(USERS)
            .where_eq("reset_password_token", token_hash.to_firestore_value())
            .limit(1);
        match self.store.run_query("", query).await?.first() {
            Some(doc) => Ok(Some(document_to_user(doc)?)),
            None => Ok(None),
        }
    }

    /// Most recently created users.
    pub async fn list_recent(&self, limit: i32) -> StoreResult<Vec<User>> {
        let query = StructuredQuery::collection(USERS)
            .order_by("created_at", Direction::Descending)
            .limit(limit);
        let docs = self.store.run_query("", query).await?;
        docs.iter().map(document_to_user).collect()
    }

    /// Write the editable profile fields.
    pub async fn update_profile(&self, user: &User) -> StoreResult<User> {
        let all = user_to_fields(user);
        let mut mask: Vec<String> = PROFILE_FIELDS.iter().map(|f| f.to_string()).collect();
        mask.push("updated_at".to_string());
        let fields = mask
            .iter()
            .filter_map(|f| all.get(f).map(|v| (f.clone(), v.clone())))
            .collect();

        let doc = self
            .store
            .update_document(USERS, user.id.as_str(), fields, Some(mask))
            .await?;
        document_to_user(&doc)
    }

    /// Replace the saved-post list.
    pub async fn set_saved_posts(&self, user_id: &UserId, saved: &[PostId]) -> StoreResult<()> {
        self.update_array(user_id, "saved_posts", saved.to_firestore_value())
            .await
    }

    /// Replace the connection list.
    pub async fn set_connections(
        &self,
        user_id: &UserId,
        connections: &[UserId],
    ) -> StoreResult<()> {
        self.update_array(user_id, "connections", connections.to_firestore_value())
            .await
    }

    async fn update_array(&self, user_id: &UserId, field: &str, value: Value) -> StoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert(field.to_string(), value);
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());

        self.store
            .update_document(
                USERS,
                user_id.as_str(),
                fields,
                Some(vec![field.to_string(), "updated_at".to_string()]),
            )
            .await?;
        Ok(())
    }

    /// Store a reset-token digest and its expiry.
    pub async fn set_reset_token(
        &self,
        user_id: &UserId,
        token_hash: &str,
        expires: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("reset_password_token".to_string(), token_hash.to_firestore_value());
        fields.insert("reset_password_expires".to_string(), expires.to_firestore_value());

        self.store
            .update_document(
                USERS,
                user_id.as_str(),
                fields,
                Some(vec![
                    "reset_password_token".to_string(),
                    "reset_password_expires".to_string(),
                ]),
            )
            .await?;
        Ok(())
    }

    /// Replace the password hash and clear any reset token.
    pub async fn set_password(&self, user_id: &UserId, password_hash: &str) -> StoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("password_hash".to_string(), password_hash.to_firestore_value());
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());

        // Masked fields missing from the payload are deleted.
        self.store
            .update_document(
                USERS,
                user_id.as_str(),
                fields,
                Some(vec![
                    "password_hash".to_string(),
                    "reset_password_token".to_string(),
                    "reset_password_expires".to_string(),
                    "updated_at".to_string(),
                ]),
            )
            .await?;
        Ok(())
    }
}

fn user_to_fields(user: &User) -> Fields {
    let mut fields = HashMap::new();
    fields.insert("name".to_string(), user.name.to_firestore_value());
    fields.insert("username".to_string(), user.username.to_firestore_value());
    fields.insert("email".to_string(), normalize_email(&user.email).to_firestore_value());
    fields.insert("password_hash".to_string(), user.password_hash.to_firestore_value());
    fields.insert("headline".to_string(), user.headline.to_firestore_value());
    fields.insert("about".to_string(), user.about.to_firestore_value());
    fields.insert("location".to_string(), user.location.to_firestore_value());
    fields.insert("profile_picture".to_string(), user.profile_picture.to_firestore_value());
    fields.insert("banner_image".to_string(), user.banner_image.to_firestore_value());
    fields.insert("skills".to_string(), user.skills.to_firestore_value());
    fields.insert("connections".to_string(), user.connections.to_firestore_value());
    fields.insert("saved_posts".to_string(), user.saved_posts.to_firestore_value());
    fields.insert("created_at".to_string(), user.created_at.to_firestore_value());
    fields.insert("updated_at".to_string(), user.updated_at.to_firestore_value());

    if let Some(token) = &user.reset_password_token {
        fields.insert("reset_password_token".to_string(), token.to_firestore_value());
    }
    if let Some(expires) = user.reset_password_expires {
        fields.insert("reset_password_expires".to_string(), expires.to_firestore_value());
    }

    fields
}

fn document_to_user(doc: &Document) -> StoreResult<User> {
    let id = doc
        .id()
        .ok_or_else(|| StoreError::invalid_document("user document has no name"))?;

    Ok(User {
        id: UserId::from(id),
        name: doc.string("name"),
        username: doc.string("username"),
        email: doc.string("email"),
        password_hash: doc.string("password_hash"),
        headline: doc.string("headline"),
        about: doc.string("about"),
        location: doc.string("location"),
        profile_picture: doc.string("profile_picture"),
        banner_image: doc.string("banner_image"),
        skills: doc.get_vec("skills"),
        connections: doc.get_vec("connections"),
        saved_posts: doc.get_vec("saved_posts"),
        reset_password_token: doc.get("reset_password_token"),
        reset_password_expires: doc.get("reset_password_expires"),
        created_at: doc.timestamp("created_at"),
        updated_at: doc.timestamp("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::memory::MemoryStore;

    fn repo() -> UserRepository {
        UserRepository::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let repo = repo();
        let first = User::new("Ada", "ada", "Ada@Example.com", "hash");
        repo.create(&first).await.unwrap();

        let second = User::new("Other", "other", " ada@example.com ", "hash");
        let err = repo.create(&second).await.unwrap_err();
        assert!(err.is_already_exists());

        let found = repo.find_by_email("ADA@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, first.id);
        assert_eq!(found.email, "ada@example.com");
    }

    #[tokio::test]
    async fn test_saved_posts_keep_order() {
        let repo = repo();
        let user = User::new("Ada", "ada", "ada@example.com", "hash");
        repo.create(&user).await.unwrap();

        let saved = vec![PostId::from("p2"), PostId::from("p1")];
        repo.set_saved_posts(&user.id, &saved).await.unwrap();

        let loaded = repo.get(&user.id).await.unwrap().unwrap();
        assert_eq!(loaded.saved_posts, saved);
        assert_eq!(loaded.name, "Ada");
    }

    #[tokio::test]
    async fn test_set_password_clears_reset_token() {
        let repo = repo();
        let user = User::new("Ada", "ada", "ada@example.com", "old");
        repo.create(&user).await.unwrap();

        let expires = Utc::now() + chrono::Duration::hours(1);
        repo.set_reset_token(&user.id, "digest", expires).await.unwrap();
        let found = repo.find_by_reset_token("digest").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);

        repo.set_password(&user.id, "new").await.unwrap();
        let loaded = repo.get(&user.id).await.unwrap().unwrap();
        assert_eq!(loaded.password_hash, "new");
        assert!(loaded.reset_password_token.is_none());
        assert!(repo.find_by_reset_token("digest").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_username_exists() {
        let repo = repo();
        repo.create(&User::new("Ada", "ada", "ada@example.com", "h"))
            .await
            .unwrap();
        assert!(repo.username_exists("ada").await.unwrap());
        assert!(!repo.username_exists("grace").await.unwrap());
    }
}
