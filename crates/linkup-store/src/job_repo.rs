//! Job posting repository.

use std::collections::HashMap;

use chrono::Utc;
use tracing::info;

use linkup_models::{Job, JobId};

use crate::error::{StoreError, StoreResult};
use crate::query::Direction;
use crate::store::SharedStore;
use crate::types::{doc_ids, Document, Fields, StructuredQuery, ToFirestoreValue};

const JOBS: &str = "jobs";

/// Repository for job documents.
#[derive(Clone)]
pub struct JobRepository {
    store: SharedStore,
}

impl JobRepository {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn create(&self, job: &Job) -> StoreResult<()> {
        self.store
            .create_document(JOBS, job.id.as_str(), job_to_fields(job))
            .await?;
        info!("Created job {} ({}) by {}", job.id, job.title, job.posted_by);
        Ok(())
    }

    pub async fn get(&self, job_id: &JobId) -> StoreResult<Option<Job>> {
        match self.store.get_document(JOBS, job_id.as_str()).await? {
            Some(doc) => Ok(Some(document_to_job(&doc)?)),
            None => Ok(None),
        }
    }

    pub async fn get_many(&self, job_ids: &[JobId]) -> StoreResult<Vec<Job>> {
        if job_ids.is_empty() {
            return Ok(Vec::new());
        }
        let docs = self
            .store
            .batch_get_documents(JOBS, &doc_ids(job_ids))
            .await?;
        docs.iter().map(document_to_job).collect()
    }

    /// Jobs newest first, optionally including closed postings.
    pub async fn list(&self, include_closed: bool) -> StoreResult<Vec<Job>> {
        let query = StructuredQuery::collection(JOBS).order_by("created_at", Direction::Descending);
        let docs = self.store.run_query("", query).await?;

        let mut jobs = docs
            .iter()
            .map(document_to_job)
            .collect::<StoreResult<Vec<_>>>()?;
        if !include_closed {
            jobs.retain(|j| j.is_open);
        }
        Ok(jobs)
    }

    /// Stop accepting applications.
    pub async fn close(&self, job_id: &JobId) -> StoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("is_open".to_string(), false.to_firestore_value());
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());

        self.store
            .update_document(
                JOBS,
                job_id.as_str(),
                fields,
                Some(vec!["is_open".to_string(), "updated_at".to_string()]),
            )
            .await?;
        info!("Closed job {}", job_id);
        Ok(())
    }

    pub async fn delete(&self, job_id: &JobId) -> StoreResult<()> {
        self.store.delete_document(JOBS, job_id.as_str()).await?;
        info!("Deleted job {}", job_id);
        Ok(())
    }
}

fn job_to_fields(job: &Job) -> Fields {
    let mut fields = HashMap::new();
    fields.insert("title".to_string(), job.title.to_firestore_value());
    fields.insert("company".to_string(), job.company.to_firestore_value());
    fields.insert("location".to_string(), job.location.to_firestore_value());
    fields.insert("description".to_string(), job.description.to_firestore_value());
    fields.insert(
        "employment_type".to_string(),
        job.employment_type.as_str().to_firestore_value(),
    );
    fields.insert("workplace".to_string(), job.workplace.as_str().to_firestore_value());
    fields.insert("skills".to_string(), job.skills.to_firestore_value());
    fields.insert("posted_by".to_string(), job.posted_by.to_firestore_value());
    fields.insert("is_open".to_string(), job.is_open.to_firestore_value());
    fields.insert("created_at".to_string(), job.created_at.to_firestore_value());
    fields.insert("updated_at".to_string(), job.updated_at.to_firestore_value());

    if let Some(salary) = &job.salary {
        fields.insert("salary".to_string(), salary.to_firestore_value());
    }

    fields
}

fn document_to_job(doc: &Document) -> StoreResult<Job> {
    let id = doc
        .id()
        .ok_or_else(|| StoreError::invalid_document("job document has no name"))?;

    Ok(Job {
        id: JobId::from(id),
        title: doc.string("title"),
        company: doc.string("company"),
        location: doc.string("location"),
        description: doc.string("description"),
        employment_type: doc.parsed("employment_type"),
        workplace: doc.parsed("workplace"),
        skills: doc.get_vec("skills"),
        salary: doc.get("salary"),
        posted_by: doc.require("posted_by")?,
        is_open: doc.get("is_open").unwrap_or(true),
        created_at: doc.timestamp("created_at"),
        updated_at: doc.timestamp("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use linkup_models::{EmploymentType, UserId, WorkplaceType};

    use super::*;
    use crate::memory::MemoryStore;

    fn job(title: &str) -> Job {
        let now = Utc::now();
        Job {
            id: JobId::new(),
            title: title.to_string(),
            company: "Acme".to_string(),
            location: "Remote".to_string(),
            description: "Build things".to_string(),
            employment_type: EmploymentType::Contract,
            workplace: WorkplaceType::Remote,
            skills: vec!["rust".to_string()],
            salary: Some("100k".to_string()),
            posted_by: UserId::from("poster"),
            is_open: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_closed_jobs_hidden_by_default() {
        let repo = JobRepository::new(Arc::new(MemoryStore::new()));
        let open = job("Open role");
        let closed = job("Closed role");
        repo.create(&open).await.unwrap();
        repo.create(&closed).await.unwrap();
        repo.close(&closed.id).await.unwrap();

        let listed = repo.list(false).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, open.id);
        assert_eq!(repo.list(true).await.unwrap().len(), 2);

        let loaded = repo.get(&open.id).await.unwrap().unwrap();
        assert_eq!(loaded.employment_type, EmploymentType::Contract);
        assert_eq!(loaded.salary.as_deref(), Some("100k"));
    }
}
