//! Connection requests and the connection graph.
//!
//! Accepting an invitation writes both users' `connections` lists as two
//! separate single-document updates.

use serde::Serialize;
use tracing::info;

use linkup_models::{
    Invitation, InvitationId, InvitationStatus, Notification, NotificationType, User, UserId,
    UserSummary,
};

use crate::error::{ApiError, ApiResult};
use crate::services::notifications::NotificationService;
use crate::services::populate::{InvitationView, Populator};
use crate::services::Repositories;

/// Relationship between the caller and another user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
    PendingSent,
    PendingReceived,
    None,
}

#[derive(Clone)]
pub struct ConnectionService {
    repos: Repositories,
    populator: Populator,
    notifications: NotificationService,
}

impl ConnectionService {
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

    async fn pending(&self, sender: &UserId, recipient: &UserId) -> ApiResult<Option<Invitation>> {
        Ok(self
            .repos
            .invitations
            .find(sender, recipient)
            .await?
            .filter(Invitation::is_pending))
    }

    pub async fn request(&self, sender_id: &UserId, recipient_id: &UserId) -> ApiResult<Invitation> {
        if sender_id == recipient_id {
            return Err(ApiError::bad_request("You cannot send a request to yourself"));
        }

        let sender = self.repos.require_user(sender_id).await?;
        self.repos.require_user(recipient_id).await?;

        if sender.is_connected_to(recipient_id) {
            return Err(ApiError::bad_request("You are already connected"));
        }
        if self.pending(sender_id, recipient_id).await?.is_some()
            || self.pending(recipient_id, sender_id).await?.is_some()
        {
            return Err(ApiError::conflict("A connection request is already pending"));
        }

        // A settled invitation in this direction occupies the id; clear it.
        let invitation = Invitation::new(sender_id.clone(), recipient_id.clone());
        if self.repos.invitations.get(&invitation.id).await?.is_some() {
            self.repos.invitations.delete(&invitation.id).await?;
        }

        match self.repos.invitations.create(&invitation).await {
            Ok(()) => {}
            Err(e) if e.is_already_exists() => {
                return Err(ApiError::conflict("A connection request is already pending"));
            }
            Err(e) => return Err(e.into()),
        }

        self.notifications
            .notify(
                Notification::new(
                    recipient_id.clone(),
                    NotificationType::ConnectionRequest,
                    format!("{} sent you a connection request", sender.name),
                )
                .with_actor(sender_id.clone()),
            )
            .await;

        Ok(invitation)
    }

    /// A pending invitation addressed to `user_id`.
    async fn incoming(&self, user_id: &UserId, id: &InvitationId) -> ApiResult<Invitation> {
        let invitation = self
            .repos
            .invitations
            .get(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Connection request not found"))?;
        if &invitation.recipient != user_id {
            return Err(ApiError::forbidden("Not authorized to respond to this request"));
        }
        if !invitation.is_pending() {
            return Err(ApiError::bad_request("This request has already been processed"));
        }
        Ok(invitation)
    }

    pub async fn accept(&self, user_id: &UserId, id: &InvitationId) -> ApiResult<()> {
        let invitation = self.incoming(user_id, id).await?;
        let mut recipient = self.repos.require_user(&invitation.recipient).await?;
        let mut sender = self.repos.require_user(&invitation.sender).await?;

        self.repos
            .invitations
            .set_status(id, InvitationStatus::Accepted)
            .await?;

        link(&mut recipient, &sender.id);
        link(&mut sender, &recipient.id);
        self.repos
            .users
            .set_connections(&recipient.id, &recipient.connections)
            .await?;
        self.repos
            .users
            .set_connections(&sender.id, &sender.connections)
            .await?;

        self.notifications
            .notify(
                Notification::new(
                    sender.id.clone(),
                    NotificationType::ConnectionAccepted,
                    format!("{} accepted your connection request", recipient.name),
                )
                .with_actor(recipient.id.clone()),
            )
            .await;

        info!(a = %sender.id, b = %recipient.id, "Connection established");
        Ok(())
    }

    pub async fn reject(&self, user_id: &UserId, id: &InvitationId) -> ApiResult<()> {
        self.incoming(user_id, id).await?;
        self.repos
            .invitations
            .set_status(id, InvitationStatus::Rejected)
            .await?;
        Ok(())
    }

    pub async fn list(&self, user_id: &UserId) -> ApiResult<Vec<UserSummary>> {
        let user = self.repos.require_user(user_id).await?;
        let connections = self.repos.users.get_many(&user.connections).await?;
        Ok(connections.iter().map(User::summary).collect())
    }

    pub async fn requests(&self, user_id: &UserId) -> ApiResult<Vec<InvitationView>> {
        let pending = self.repos.invitations.list_pending_for(user_id).await?;
        Ok(self.populator.invitations(pending).await?)
    }

    pub async fn status(&self, user_id: &UserId, other: &UserId) -> ApiResult<ConnectionStatus> {
        let user = self.repos.require_user(user_id).await?;
        if user.is_connected_to(other) {
            return Ok(ConnectionStatus::Connected);
        }
        if self.pending(user_id, other).await?.is_some() {
            return Ok(ConnectionStatus::PendingSent);
        }
        if self.pending(other, user_id).await?.is_some() {
            return Ok(ConnectionStatus::PendingReceived);
        }
        Ok(ConnectionStatus::None)
    }

    /// Remove a connection on both sides and forget old invitations.
    pub async fn remove(&self, user_id: &UserId, other_id: &UserId) -> ApiResult<()> {
        let mut user = self.repos.require_user(user_id).await?;
        if !user.is_connected_to(other_id) {
            return Err(ApiError::bad_request("You are not connected to this user"));
        }

        user.connections.retain(|id| id != other_id);
        self.repos
            .users
            .set_connections(&user.id, &user.connections)
            .await?;

        if let Some(mut other) = self.repos.users.get(other_id).await? {
            other.connections.retain(|id| id != user_id);
            self.repos
                .users
                .set_connections(&other.id, &other.connections)
                .await?;
        }

        self.repos
            .invitations
            .delete(&InvitationId::for_pair(user_id, other_id))
            .await?;
        self.repos
            .invitations
            .delete(&InvitationId::for_pair(other_id, user_id))
            .await?;

        info!(a = %user_id, b = %other_id, "Connection removed");
        Ok(())
    }
}

fn link(user: &mut User, other: &UserId) {
    if !user.is_connected_to(other) {
        user.connections.push(other.clone());
    }
}
