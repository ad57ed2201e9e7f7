//! Job application repository.
//!
//! Application documents are keyed `{job_id}_{applicant_id}` and written
//! create-only, so the store itself rejects a second application to the
//! same job with `AlreadyExists`.

use std::collections::HashMap;

use chrono::Utc;
use tracing::info;

use linkup_models::{Application, ApplicationId, ApplicationStatus, JobId, UserId};

use crate::error::{StoreError, StoreResult};
use crate::store::SharedStore;
use crate::types::{Document, Fields, StructuredQuery, ToFirestoreValue, Value};

const APPLICATIONS: &str = "applications";

/// Repository for application documents.
#[derive(Clone)]
pub struct ApplicationRepository {
    store: SharedStore,
}

impl ApplicationRepository {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Create an application; `AlreadyExists` if the pair already applied.
    pub async fn create(&self, application: &Application) -> StoreResult<()> {
        self.store
            .create_document(
                APPLICATIONS,
                application.id.as_str(),
                application_to_fields(application),
            )
            .await?;
        info!(
            "Created application {} (job={}, applicant={})",
            application.id, application.job, application.applicant
        );
        Ok(())
    }

    pub async fn get(&self, id: &ApplicationId) -> StoreResult<Option<Application>> {
        match self.store.get_document(APPLICATIONS, id.as_str()).await? {
            Some(doc) => Ok(Some(document_to_application(&doc)?)),
            None => Ok(None),
        }
    }

    /// Applications to a job, newest first.
    pub async fn list_for_job(&self, job_id: &JobId) -> StoreResult<Vec<Application>> {
        self.list_where("job", job_id.to_firestore_value()).await
    }

    /// Applications by a user, newest first.
    pub async fn list_for_applicant(&self, applicant: &UserId) -> StoreResult<Vec<Application>> {
        self.list_where("applicant", applicant.to_firestore_value())
            .await
    }

    async fn list_where(
        &self,
        field: &str,
        value: Value,
    ) -> StoreResult<Vec<Application>> {
        let query = StructuredQuery::collection(APPLICATIONS).where_eq(field, value);
        let docs = self.store.run_query("", query).await?;

        // Sorted here so the equality filter needs no composite index.
        let mut applications = docs
            .iter()
            .map(document_to_application)
            .collect::<StoreResult<Vec<_>>>()?;
        applications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(applications)
    }

    pub async fn set_status(
        &self,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> StoreResult<Application> {
        let mut fields = HashMap::new();
        fields.insert("status".to_string(), status.as_str().to_firestore_value());
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());

        let doc = self
            .store
            .update_document(
                APPLICATIONS,
                id.as_str(),
                fields,
                Some(vec!["status".to_string(), "updated_at".to_string()]),
            )
            .await?;
        document_to_application(&doc)
    }

    pub async fn delete(&self, id: &ApplicationId) -> StoreResult<()> {
        self.store.delete_document(APPLICATIONS, id.as_str()).await?;
        info!("Deleted application {}", id);
        Ok(())
    }
}

fn application_to_fields(application: &Application) -> Fields {
    let mut fields = HashMap::new();
    fields.insert("job".to_string(), application.job.to_firestore_value());
    fields.insert("applicant".to_string(), application.applicant.to_firestore_value());
    fields.insert("full_name".to_string(), application.full_name.to_firestore_value());
    fields.insert("email".to_string(), application.email.to_firestore_value());
    fields.insert("phone".to_string(), application.phone.to_firestore_value());
    fields.insert("experience".to_string(), application.experience.to_firestore_value());
    fields.insert("skills".to_string(), application.skills.to_firestore_value());
    fields.insert("cover_letter".to_string(), application.cover_letter.to_firestore_value());
    fields.insert("status".to_string(), application.status.as_str().to_firestore_value());
    fields.insert("created_at".to_string(), application.created_at.to_firestore_value());
    fields.insert("updated_at".to_string(), application.updated_at.to_firestore_value());
    fields
}

fn document_to_application(doc: &Document) -> StoreResult<Application> {
    let id = doc
        .id()
        .ok_or_else(|| StoreError::invalid_document("application document has no name"))?;

    Ok(Application {
        id: ApplicationId::from(id),
        job: doc.require("job")?,
        applicant: doc.require("applicant")?,
        full_name: doc.string("full_name"),
        email: doc.string("email"),
        phone: doc.string("phone"),
        experience: doc.string("experience"),
        skills: doc.get_vec("skills"),
        cover_letter: doc.string("cover_letter"),
        status: doc.parsed("status"),
        created_at: doc.timestamp("created_at"),
        updated_at: doc.timestamp("updated_at"),
    })
}
