//! Saved posts.
//!
//! The saved set lives in the user document's `saved_posts` field and every
//! change rewrites that whole field. Two concurrent changes by the same user
//! race and the last write wins.

use tracing::debug;

use linkup_models::{PostId, User, UserId};

use crate::error::{ApiError, ApiResult};
use crate::services::populate::{PostView, Populator};
use crate::services::Repositories;

#[derive(Clone)]
pub struct SavedPostService {
    repos: Repositories,
    populator: Populator,
}

impl SavedPostService {
    pub fn new(repos: Repositories, populator: Populator) -> Self {
        Self { repos, populator }
    }

    /// The post must exist and be visible to the viewer; otherwise 404.
    async fn require_visible_post(&self, viewer: &User, post_id: &PostId) -> ApiResult<()> {
        self.repos
            .posts
            .get(post_id)
            .await?
            .filter(|p| p.is_visible_to(&viewer.id, viewer.is_connected_to(&p.author)))
            .map(|_| ())
            .ok_or_else(|| ApiError::not_found("Post not found"))
    }

    /// Flip the saved state of a post; returns whether it is now saved.
    pub async fn toggle(&self, user_id: &UserId, post_id: &PostId) -> ApiResult<bool> {
        let mut user = self.repos.require_user(user_id).await?;

        // Unsaving never needs the post to still be visible.
        let saved = if user.has_saved(post_id) {
            user.saved_posts.retain(|id| id != post_id);
            false
        } else {
            self.require_visible_post(&user, post_id).await?;
            user.saved_posts.push(post_id.clone());
            true
        };

        self.repos
            .users
            .set_saved_posts(user_id, &user.saved_posts)
            .await?;
        debug!(user_id = %user_id, post_id = %post_id, saved, "Toggled saved post");
        Ok(saved)
    }

    /// Add a post to the saved set; saving twice keeps one entry.
    pub async fn save(&self, user_id: &UserId, post_id: &PostId) -> ApiResult<()> {
        let mut user = self.repos.require_user(user_id).await?;
        self.require_visible_post(&user, post_id).await?;

        if !user.has_saved(post_id) {
            user.saved_posts.push(post_id.clone());
            self.repos
                .users
                .set_saved_posts(user_id, &user.saved_posts)
                .await?;
        }
        Ok(())
    }

    /// Remove a post from the saved set; unknown ids are a no-op.
    pub async fn unsave(&self, user_id: &UserId, post_id: &PostId) -> ApiResult<()> {
        let mut user = self.repos.require_user(user_id).await?;

        if user.has_saved(post_id) {
            user.saved_posts.retain(|id| id != post_id);
            self.repos
                .users
                .set_saved_posts(user_id, &user.saved_posts)
                .await?;
        }
        Ok(())
    }

    pub async fn is_saved(&self, user_id: &UserId, post_id: &PostId) -> ApiResult<bool> {
        Ok(self.repos.require_user(user_id).await?.has_saved(post_id))
    }

    /// Saved posts that still exist and are visible to the user, populated,
    /// newest first.
    pub async fn list(&self, user_id: &UserId) -> ApiResult<Vec<PostView>> {
        let user = self.repos.require_user(user_id).await?;
        if user.saved_posts.is_empty() {
            return Ok(Vec::new());
        }

        let mut posts = self.repos.posts.get_many(&user.saved_posts).await?;
        posts.retain(|p| p.is_visible_to(&user.id, user.is_connected_to(&p.author)));
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(self.populator.posts(posts).await?)
    }
}
