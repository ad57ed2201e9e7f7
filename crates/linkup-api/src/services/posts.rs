//! Post service: feed, likes and comments.

use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use linkup_models::{
    Comment, CommentId, CommentPermission, Notification, NotificationType, Post, PostId, User,
    UserId, Visibility,
};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::security::{sanitize_text, validate_image_url};
use crate::services::notifications::NotificationService;
use crate::services::populate::{PostView, Populator};
use crate::services::Repositories;

/// Number of posts scanned for the feed.
const FEED_LIMIT: i32 = 50;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    #[validate(length(min = 1, max = 3000, message = "Description must be 1-3000 characters"))]
    pub description: String,
    #[validate(custom(function = "validate_image_url"))]
    pub image: Option<String>,
    pub visibility: Option<Visibility>,
    pub comment_permission: Option<CommentPermission>,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeOutcome {
    pub liked: bool,
    pub like_count: usize,
}

#[derive(Clone)]
pub struct PostService {
    repos: Repositories,
    populator: Populator,
    notifications: NotificationService,
}

impl PostService {
    pub fn new(
        repos: Repositories,
        populator: Populator,
        notifications: NotificationService,
    ) -> Self {
        Self {
            repos,
            populator,
            notifications,
        }
    }

    pub async fn create(&self, author: &UserId, new_post: NewPost) -> ApiResult<PostView> {
        let description = sanitize_text(&new_post.description);
        if description.is_empty() {
            return Err(ApiError::Validation("Description is required".to_string()));
        }

        let mut post = Post::new(author.clone(), description);
        post.image = new_post
            .image
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty());
        post.visibility = new_post.visibility.unwrap_or_default();
        post.comment_permission = new_post.comment_permission.unwrap_or_default();

        self.repos.posts.create(&post).await?;
        metrics::record_post_created();
        info!(post_id = %post.id, author = %author, "Post created");

        Ok(self.populator.post(post).await?)
    }

    /// Recent posts the viewer may see, newest first.
    pub async fn feed(&self, viewer_id: &UserId) -> ApiResult<Vec<PostView>> {
        let viewer = self.repos.require_user(viewer_id).await?;
        let posts = self.repos.posts.list_recent(FEED_LIMIT).await?;

        let visible: Vec<Post> = posts
            .into_iter()
            .filter(|p| p.is_visible_to(&viewer.id, viewer.is_connected_to(&p.author)))
            .collect();
        Ok(self.populator.posts(visible).await?)
    }

    /// A post the viewer may see; invisible posts are reported as missing.
    async fn visible_post(&self, viewer: &User, post_id: &PostId) -> ApiResult<Post> {
        self.repos
            .posts
            .get(post_id)
            .await?
            .filter(|p| p.is_visible_to(&viewer.id, viewer.is_connected_to(&p.author)))
            .ok_or_else(|| ApiError::not_found("Post not found"))
    }

    pub async fn get(&self, viewer_id: &UserId, post_id: &PostId) -> ApiResult<PostView> {
        let viewer = self.repos.require_user(viewer_id).await?;
        let post = self.visible_post(&viewer, post_id).await?;
        Ok(self.populator.post(post).await?)
    }

    pub async fn delete(&self, user_id: &UserId, post_id: &PostId) -> ApiResult<()> {
        let post = self
            .repos
            .posts
            .get(post_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Post not found"))?;
        if &post.author != user_id {
            return Err(ApiError::forbidden("You are not authorized to delete this post"));
        }

        self.repos.posts.delete(post_id).await?;
        info!(post_id = %post_id, "Post deleted");
        Ok(())
    }

    pub async fn toggle_like(&self, user_id: &UserId, post_id: &PostId) -> ApiResult<LikeOutcome> {
        let viewer = self.repos.require_user(user_id).await?;
        let mut post = self.visible_post(&viewer, post_id).await?;

        let liked = if post.is_liked_by(user_id) {
            post.likes.retain(|id| id != user_id);
            false
        } else {
            post.likes.push(user_id.clone());
            true
        };
        self.repos.posts.set_likes(post_id, &post.likes).await?;

        if liked {
            self.notifications
                .notify(
                    Notification::new(
                        post.author.clone(),
                        NotificationType::Like,
                        format!("{} liked your post", viewer.name),
                    )
                    .with_actor(user_id.clone())
                    .with_post(post_id.clone()),
                )
                .await;
        }

        Ok(LikeOutcome {
            liked,
            like_count: post.likes.len(),
        })
    }

    pub async fn add_comment(
        &self,
        user_id: &UserId,
        post_id: &PostId,
        content: &str,
    ) -> ApiResult<PostView> {
        let content = sanitize_text(content);
        if content.is_empty() || content.chars().count() > 1000 {
            return Err(ApiError::Validation(
                "Comment must be 1-1000 characters".to_string(),
            ));
        }

        let viewer = self.repos.require_user(user_id).await?;
        let mut post = self.visible_post(&viewer, post_id).await?;
        if !post.accepts_comment_from(user_id, viewer.is_connected_to(&post.author)) {
            return Err(ApiError::forbidden("Comments are restricted on this post"));
        }

        post.comments.push(Comment::new(user_id.clone(), content));
        post.updated_at = Utc::now();
        self.repos.posts.set_comments(post_id, &post.comments).await?;

        self.notifications
            .notify(
                Notification::new(
                    post.author.clone(),
                    NotificationType::Comment,
                    format!("{} commented on your post", viewer.name),
                )
                .with_actor(user_id.clone())
                .with_post(post_id.clone()),
            )
            .await;

        Ok(self.populator.post(post).await?)
    }

    /// Remove a comment; allowed for its author and the post's author.
    pub async fn delete_comment(
        &self,
        user_id: &UserId,
        post_id: &PostId,
        comment_id: &CommentId,
    ) -> ApiResult<PostView> {
        let mut post = self
            .repos
            .posts
            .get(post_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Post not found"))?;

        let comment = post
            .comments
            .iter()
            .find(|c| &c.id == comment_id)
            .ok_or_else(|| ApiError::not_found("Comment not found"))?;
        if &comment.user != user_id && &post.author != user_id {
            return Err(ApiError::forbidden(
                "You are not authorized to delete this comment",
            ));
        }

        post.comments.retain(|c| &c.id != comment_id);
        self.repos.posts.set_comments(post_id, &post.comments).await?;
        Ok(self.populator.post(post).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use linkup_store::MemoryStore;

    use super::*;

    struct Fixture {
        service: PostService,
        repos: Repositories,
        ada: User,
        bob: User,
    }

    async fn fixture() -> Fixture {
        let repos = Repositories::new(Arc::new(MemoryStore::new()));
        let populator = Populator::new(repos.users.clone(), repos.jobs.clone());
        let notifications = NotificationService::new(repos.notifications.clone(), populator.clone());
        let ada = User::new("Ada", "ada", "ada@example.com", "hash");
        let bob = User::new("Bob", "bob", "bob@example.com", "hash");
        repos.users.create(&ada).await.unwrap();
        repos.users.create(&bob).await.unwrap();

        Fixture {
            service: PostService::new(repos.clone(), populator, notifications),
            repos,
            ada,
            bob,
        }
    }

    fn new_post(visibility: Visibility, permission: CommentPermission) -> NewPost {
        NewPost {
            description: "Hello network".to_string(),
            image: None,
            visibility: Some(visibility),
            comment_permission: Some(permission),
        }
    }

    #[tokio::test]
    async fn test_private_posts_hidden_from_others() {
        let f = fixture().await;
        let post = f
            .service
            .create(&f.ada.id, new_post(Visibility::Private, CommentPermission::Everyone))
            .await
            .unwrap();

        assert_eq!(f.service.feed(&f.ada.id).await.unwrap().len(), 1);
        assert!(f.service.feed(&f.bob.id).await.unwrap().is_empty());
        assert!(matches!(
            f.service.get(&f.bob.id, &post.id).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_like_toggle_notifies_author_once() {
        let f = fixture().await;
        let post = f
            .service
            .create(&f.ada.id, new_post(Visibility::Public, CommentPermission::Everyone))
            .await
            .unwrap();

        let first = f.service.toggle_like(&f.bob.id, &post.id).await.unwrap();
        assert!(first.liked);
        assert_eq!(first.like_count, 1);
        let second = f.service.toggle_like(&f.bob.id, &post.id).await.unwrap();
        assert!(!second.liked);
        assert_eq!(second.like_count, 0);

        let notifications = f.repos.notifications.list_for_recipient(&f.ada.id).await.unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, NotificationType::Like);

        // Liking one's own post records nothing.
        f.service.toggle_like(&f.ada.id, &post.id).await.unwrap();
        assert_eq!(
            f.repos.notifications.list_for_recipient(&f.ada.id).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_comment_permissions_and_deletion() {
        let f = fixture().await;
        let closed = f
            .service
            .create(&f.ada.id, new_post(Visibility::Public, CommentPermission::Nobody))
            .await
            .unwrap();
        assert!(matches!(
            f.service.add_comment(&f.bob.id, &closed.id, "hi").await,
            Err(ApiError::Forbidden(_))
        ));

        let open = f
            .service
            .create(&f.ada.id, new_post(Visibility::Public, CommentPermission::Everyone))
            .await
            .unwrap();
        let view = f.service.add_comment(&f.bob.id, &open.id, "Great post").await.unwrap();
        assert_eq!(view.comments.len(), 1);
        assert_eq!(view.comments[0].user.username, "bob");

        // The post author may remove anyone's comment.
        let comment_id = view.comments[0].id.clone();
        let view = f
            .service
            .delete_comment(&f.ada.id, &open.id, &comment_id)
            .await
            .unwrap();
        assert!(view.comments.is_empty());
    }

    #[tokio::test]
    async fn test_only_author_deletes() {
        let f = fixture().await;
        let post = f
            .service
            .create(&f.ada.id, new_post(Visibility::Public, CommentPermission::Everyone))
            .await
            .unwrap();
        assert!(matches!(
            f.service.delete(&f.bob.id, &post.id).await,
            Err(ApiError::Forbidden(_))
        ));
        f.service.delete(&f.ada.id, &post.id).await.unwrap();
        assert!(f.repos.posts.get(&post.id).await.unwrap().is_none());
    }
}
