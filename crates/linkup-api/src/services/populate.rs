//! Response assembly: resolves stored references into display views.
//!
//! Stored documents hold ids only; views embed the referenced user's
//! display fields (or the job) at response time. References to documents
//! that no longer exist fall back to placeholders or are dropped.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use linkup_models::{
    Application, ApplicationId, ApplicationStatus, Chat, ChatId, Comment, CommentId,
    CommentPermission, Invitation, InvitationId, InvitationStatus, Job, JobId, Message,
    MessageId, Notification, NotificationId, NotificationType, Post, PostId, User, UserId,
    UserSummary, Visibility,
};
use linkup_store::{JobRepository, StoreResult, UserRepository};

/// A post with its author and comment authors resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: PostId,
    pub author: UserSummary,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub visibility: Visibility,
    pub comment_permission: CommentPermission,
    pub likes: Vec<UserId>,
    pub like_count: usize,
    pub comments: Vec<CommentView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: CommentId,
    pub content: String,
    pub user: UserSummary,
    pub created_at: DateTime<Utc>,
}

/// An application with its applicant and, when requested, its job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationView {
    pub id: ApplicationId,
    pub job_id: JobId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<Job>,
    pub applicant: UserSummary,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub experience: String,
    pub skills: Vec<String>,
    pub cover_letter: String,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatView {
    pub id: ChatId,
    pub participants: Vec<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: MessageId,
    pub chat: ChatId,
    pub sender: UserSummary,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: NotificationId,
    pub recipient: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<UserSummary>,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_post: Option<PostId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_job: Option<JobId>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationView {
    pub id: InvitationId,
    pub sender: UserSummary,
    pub recipient: UserId,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
}

/// Resolves user and job references in batches.
#[derive(Clone)]
pub struct Populator {
    users: UserRepository,
    jobs: JobRepository,
}

/// Display fields by user id.
type Summaries = HashMap<UserId, UserSummary>;

fn summary_of(summaries: &Summaries, id: &UserId) -> UserSummary {
    summaries
        .get(id)
        .cloned()
        .unwrap_or_else(|| UserSummary::deleted(id.clone()))
}

impl Populator {
    pub fn new(users: UserRepository, jobs: JobRepository) -> Self {
        Self { users, jobs }
    }

    /// Batch-load display fields for a set of users.
    ///
    /// Takes an owned list so no borrowing iterator is held across the await.
    pub async fn summaries(&self, mut ids: Vec<UserId>) -> StoreResult<Summaries> {
        ids.sort();
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let users: Vec<User> = self.users.get_many(&ids).await?;
        Ok(users.into_iter().map(|u| (u.id.clone(), u.summary())).collect())
    }

    pub async fn posts(&self, posts: Vec<Post>) -> StoreResult<Vec<PostView>> {
        let ids: Vec<UserId> = posts
            .iter()
            .flat_map(|p| {
                std::iter::once(p.author.clone()).chain(p.comments.iter().map(|c| c.user.clone()))
            })
            .collect();
        let summaries = self.summaries(ids).await?;
        Ok(posts
            .into_iter()
            .map(|post| post_view(post, &summaries))
            .collect())
    }

    pub async fn post(&self, post: Post) -> StoreResult<PostView> {
        let mut views = self.posts(vec![post]).await?;
        Ok(views.remove(0))
    }

    /// Populate applicants, and the jobs themselves when `with_jobs` is set.
    pub async fn applications(
        &self,
        applications: Vec<Application>,
        with_jobs: bool,
    ) -> StoreResult<Vec<ApplicationView>> {
        let summaries = self
            .summaries(applications.iter().map(|a| a.applicant.clone()).collect())
            .await?;

        let jobs: HashMap<JobId, Job> = if with_jobs {
            let mut job_ids: Vec<JobId> = applications.iter().map(|a| a.job.clone()).collect();
            job_ids.sort();
            job_ids.dedup();
            self.jobs
                .get_many(&job_ids)
                .await?
                .into_iter()
                .map(|j| (j.id.clone(), j))
                .collect()
        } else {
            HashMap::new()
        };

        Ok(applications
            .into_iter()
            .map(|a| ApplicationView {
                applicant: summary_of(&summaries, &a.applicant),
                job: jobs.get(&a.job).cloned(),
                id: a.id,
                job_id: a.job,
                full_name: a.full_name,
                email: a.email,
                phone: a.phone,
                experience: a.experience,
                skills: a.skills,
                cover_letter: a.cover_letter,
                status: a.status,
                created_at: a.created_at,
                updated_at: a.updated_at,
            })
            .collect())
    }

    pub async fn chats(&self, chats: Vec<Chat>) -> StoreResult<Vec<ChatView>> {
        let summaries = self
            .summaries(chats.iter().flat_map(|c| c.participants.iter().cloned()).collect())
            .await?;
        Ok(chats
            .into_iter()
            .map(|chat| ChatView {
                participants: chat
                    .participants
                    .iter()
                    .map(|id| summary_of(&summaries, id))
                    .collect(),
                id: chat.id,
                last_message: chat.last_message,
                created_at: chat.created_at,
                updated_at: chat.updated_at,
            })
            .collect())
    }

    pub async fn messages(&self, messages: Vec<Message>) -> StoreResult<Vec<MessageView>> {
        let summaries = self
            .summaries(messages.iter().map(|m| m.sender.clone()).collect())
            .await?;
        Ok(messages
            .into_iter()
            .map(|m| MessageView {
                sender: summary_of(&summaries, &m.sender),
                id: m.id,
                chat: m.chat,
                content: m.content,
                created_at: m.created_at,
            })
            .collect())
    }

    pub async fn notifications(
        &self,
        notifications: Vec<Notification>,
    ) -> StoreResult<Vec<NotificationView>> {
        let summaries = self
            .summaries(notifications.iter().filter_map(|n| n.actor.clone()).collect())
            .await?;
        Ok(notifications
            .into_iter()
            .map(|n| NotificationView {
                actor: n.actor.as_ref().map(|id| summary_of(&summaries, id)),
                id: n.id,
                recipient: n.recipient,
                kind: n.kind,
                content: n.content,
                related_post: n.related_post,
                related_job: n.related_job,
                read: n.read,
                created_at: n.created_at,
            })
            .collect())
    }

    pub async fn invitations(
        &self,
        invitations: Vec<Invitation>,
    ) -> StoreResult<Vec<InvitationView>> {
        let summaries = self
            .summaries(invitations.iter().map(|i| i.sender.clone()).collect())
            .await?;
        Ok(invitations
            .into_iter()
            .map(|i| InvitationView {
                sender: summary_of(&summaries, &i.sender),
                id: i.id,
                recipient: i.recipient,
                status: i.status,
                created_at: i.created_at,
            })
            .collect())
    }
}

fn post_view(post: Post, summaries: &Summaries) -> PostView {
    PostView {
        author: summary_of(summaries, &post.author),
        like_count: post.likes.len(),
        comments: post
            .comments
            .into_iter()
            .map(|c: Comment| CommentView {
                user: summary_of(summaries, &c.user),
                id: c.id,
                content: c.content,
                created_at: c.created_at,
            })
            .collect(),
        id: post.id,
        description: post.description,
        image: post.image,
        visibility: post.visibility,
        comment_permission: post.comment_permission,
        likes: post.likes,
        created_at: post.created_at,
        updated_at: post.updated_at,
    }
}
