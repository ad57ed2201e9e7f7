//! Connection invitation repository.
//!
//! Invitations are keyed `{sender}_{recipient}`; at most one exists per
//! direction of a pair.

use std::collections::HashMap;

use chrono::Utc;
use tracing::info;

use linkup_models::{Invitation, InvitationId, InvitationStatus, UserId};

use crate::error::{StoreError, StoreResult};
use crate::store::SharedStore;
use crate::types::{Document, Fields, StructuredQuery, ToFirestoreValue};

const INVITATIONS: &str = "invitations";

/// Repository for invitation documents.
#[derive(Clone)]
pub struct InvitationRepository {
    store: SharedStore,
}

impl InvitationRepository {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Create an invitation. Fails with `AlreadyExists` when one is already
    /// stored for this direction of the pair.
    pub async fn create(&self, invitation: &Invitation) -> StoreResult<()> {
        self.store
            .create_document(
                INVITATIONS,
                invitation.id.as_str(),
                invitation_to_fields(invitation),
            )
            .await?;
        info!(
            "Created invitation {} -> {}",
            invitation.sender, invitation.recipient
        );
        Ok(())
    }

    pub async fn get(&self, id: &InvitationId) -> StoreResult<Option<Invitation>> {
        match self.store.get_document(INVITATIONS, id.as_str()).await? {
            Some(doc) => Ok(Some(document_to_invitation(&doc)?)),
            None => Ok(None),
        }
    }

    /// Invitation sent by `sender` to `recipient`, whatever its status.
    pub async fn find(&self, sender: &UserId, recipient: &UserId) -> StoreResult<Option<Invitation>> {
        self.get(&InvitationId::for_pair(sender, recipient)).await
    }

    /// Pending invitations addressed to a user, newest first.
    pub async fn list_pending_for(&self, recipient: &UserId) -> StoreResult<Vec<Invitation>> {
        let query = StructuredQuery::collection(INVITATIONS)
            .where_eq("recipient", recipient.to_firestore_value())
            .where_eq(
                "status",
                InvitationStatus::Pending.as_str().to_firestore_value(),
            );
        let docs = self.store.run_query("", query).await?;

        let mut invitations = docs
            .iter()
            .map(document_to_invitation)
            .collect::<StoreResult<Vec<_>>>()?;
        invitations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invitations)
    }

    pub async fn set_status(&self, id: &InvitationId, status: InvitationStatus) -> StoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("status".to_string(), status.as_str().to_firestore_value());
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());

        self.store
            .update_document(
                INVITATIONS,
                id.as_str(),
                fields,
                Some(vec!["status".to_string(), "updated_at".to_string()]),
            )
            .await?;
        Ok(())
    }

    pub async fn delete(&self, id: &InvitationId) -> StoreResult<()> {
        self.store.delete_document(INVITATIONS, id.as_str()).await
    }
}

fn invitation_to_fields(invitation: &Invitation) -> Fields {
    let mut fields = HashMap::new();
    fields.insert("sender".to_string(), invitation.sender.to_firestore_value());
    fields.insert("recipient".to_string(), invitation.recipient.to_firestore_value());
    fields.insert("status".to_string(), invitation.status.as_str().to_firestore_value());
    fields.insert("created_at".to_string(), invitation.created_at.to_firestore_value());
    fields.insert("updated_at".to_string(), invitation.updated_at.to_firestore_value());
    fields
}

fn document_to_invitation(doc: &Document) -> StoreResult<Invitation> {
    let id = doc
        .id()
        .ok_or_else(|| StoreError::invalid_document("invitation document has no name"))?;

    Ok(Invitation {
        id: InvitationId::from(id),
        sender: doc.require("sender")?,
        recipient: doc.require("recipient")?,
        status: doc.parsed("status"),
        created_at: doc.timestamp("created_at"),
        updated_at: doc.timestamp("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::memory::MemoryStore;

    #[tokio::test]
    async fn test_pending_list_and_status() {
        let repo = InvitationRepository::new(Arc::new(MemoryStore::new()));
        let ada = UserId::from("ada");
        let bob = UserId::from("bob");
        let cy = UserId::from("cy");

        let from_bob = Invitation::new(bob.clone(), ada.clone());
        let from_cy = Invitation::new(cy.clone(), ada.clone());
        repo.create(&from_bob).await.unwrap();
        repo.create(&from_cy).await.unwrap();
        assert!(repo
            .create(&Invitation::new(bob.clone(), ada.clone()))
            .await
            .unwrap_err()
            .is_already_exists());

        repo.set_status(&from_cy.id, InvitationStatus::Rejected)
            .await
            .unwrap();
        let pending = repo.list_pending_for(&ada).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].sender, bob);

        assert!(repo.find(&bob, &ada).await.unwrap().is_some());
        assert!(repo.find(&ada, &bob).await.unwrap().is_none());
    }
}
