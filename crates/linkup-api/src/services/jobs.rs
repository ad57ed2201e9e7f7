//! Job postings and applications.

use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use linkup_models::{
    Application, ApplicationId, ApplicationStatus, EmploymentType, Job, JobId, Notification,
    NotificationType, UserId, WorkplaceType,
};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::security::sanitize_text;
use crate::services::notifications::NotificationService;
use crate::services::populate::{ApplicationView, Populator};
use crate::services::Repositories;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewJob {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 200, message = "Company must be 1-200 characters"))]
    pub company: String,
    #[validate(length(min = 1, max = 200, message = "Location must be 1-200 characters"))]
    pub location: String,
    #[validate(length(min = 1, max = 10000, message = "Description must be 1-10000 characters"))]
    pub description: String,
    #[serde(default)]
    pub employment_type: EmploymentType,
    #[serde(default)]
    pub workplace: WorkplaceType,
    #[serde(default)]
    pub skills: Vec<String>,
    pub salary: Option<String>,
}

/// Application fields as submitted by the applicant.
#[derive(Debug, Default, Clone, Validate)]
pub struct ApplicationForm {
    #[validate(length(min = 1, max = 100, message = "Full name is required"))]
    pub full_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, max = 30, message = "Phone is required"))]
    pub phone: String,
    #[validate(length(max = 5000, message = "Experience must be at most 5000 characters"))]
    pub experience: String,
    pub skills: Vec<String>,
    #[validate(length(max = 5000, message = "Cover letter must be at most 5000 characters"))]
    pub cover_letter: String,
}

/// Split a comma separated skill list, dropping blanks.
pub fn parse_skills(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(sanitize_text)
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Clone)]
pub struct JobService {
    repos: Repositories,
    populator: Populator,
    notifications: NotificationService,
}

impl JobService {
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

    /// Jobs newest first, optionally filtered by a search string.
    pub async fn list(&self, query: Option<&str>, include_closed: bool) -> ApiResult<Vec<Job>> {
        let jobs = self.repos.jobs.list(include_closed).await?;
        Ok(match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => jobs.into_iter().filter(|j| j.matches(q)).collect(),
            None => jobs,
        })
    }

    pub async fn create(&self, poster: &UserId, new_job: NewJob) -> ApiResult<Job> {
        let now = Utc::now();
        let job = Job {
            id: JobId::new(),
            title: sanitize_text(&new_job.title),
            company: sanitize_text(&new_job.company),
            location: sanitize_text(&new_job.location),
            description: sanitize_text(&new_job.description),
            employment_type: new_job.employment_type,
            workplace: new_job.workplace,
            skills: new_job
                .skills
                .iter()
                .map(|s| sanitize_text(s))
                .filter(|s| !s.is_empty())
                .collect(),
            salary: new_job
                .salary
                .map(|s| sanitize_text(&s))
                .filter(|s| !s.is_empty()),
            posted_by: poster.clone(),
            is_open: true,
            created_at: now,
            updated_at: now,
        };

        self.repos.jobs.create(&job).await?;
        info!(job_id = %job.id, poster = %poster, "Job posted");
        Ok(job)
    }

    pub async fn get(&self, job_id: &JobId) -> ApiResult<Job> {
        self.repos
            .jobs
            .get(job_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Job not found"))
    }

    async fn owned_job(&self, user_id: &UserId, job_id: &JobId) -> ApiResult<Job> {
        let job = self.get(job_id).await?;
        if !job.is_posted_by(user_id) {
            return Err(ApiError::forbidden("Only the poster can manage this job"));
        }
        Ok(job)
    }

    pub async fn close(&self, user_id: &UserId, job_id: &JobId) -> ApiResult<Job> {
        self.owned_job(user_id, job_id).await?;
        self.repos.jobs.close(job_id).await?;
        self.get(job_id).await
    }

    /// Delete a job together with its applications.
    pub async fn delete(&self, user_id: &UserId, job_id: &JobId) -> ApiResult<()> {
        self.owned_job(user_id, job_id).await?;
        for application in self.repos.applications.list_for_job(job_id).await? {
            self.repos.applications.delete(&application.id).await?;
        }
        self.repos.jobs.delete(job_id).await?;
        info!(job_id = %job_id, "Job deleted");
        Ok(())
    }

    /// Apply to a job. A second application by the same user is a conflict.
    pub async fn apply(
        &self,
        applicant: &UserId,
        job_id: &JobId,
        form: ApplicationForm,
    ) -> ApiResult<Application> {
        let job = self.get(job_id).await?;
        if !job.is_open {
            return Err(ApiError::bad_request("This job is no longer accepting applications"));
        }
        if job.is_posted_by(applicant) {
            return Err(ApiError::bad_request("You cannot apply to your own job"));
        }

        let now = Utc::now();
        let application = Application {
            id: ApplicationId::for_pair(job_id, applicant),
            job: job_id.clone(),
            applicant: applicant.clone(),
            full_name: sanitize_text(&form.full_name),
            email: form.email.trim().to_string(),
            phone: sanitize_text(&form.phone),
            experience: sanitize_text(&form.experience),
            skills: form.skills,
            cover_letter: sanitize_text(&form.cover_letter),
            status: ApplicationStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        match self.repos.applications.create(&application).await {
            Ok(()) => metrics::record_application("created"),
            Err(e) if e.is_already_exists() => {
                metrics::record_application("duplicate");
                return Err(ApiError::conflict("You have already applied to this job"));
            }
            Err(e) => return Err(e.into()),
        }

        self.notifications
            .notify(
                Notification::new(
                    job.posted_by.clone(),
                    NotificationType::ApplicationReceived,
                    format!("{} applied to {}", application.full_name, job.title),
                )
                .with_actor(applicant.clone())
                .with_job(job.id.clone()),
            )
            .await;

        Ok(application)
    }

    /// Applications to a job; visible to its poster only.
    pub async fn applications_for_job(
        &self,
        user_id: &UserId,
        job_id: &JobId,
    ) -> ApiResult<Vec<ApplicationView>> {
        self.owned_job(user_id, job_id).await?;
        let applications = self.repos.applications.list_for_job(job_id).await?;
        Ok(self.populator.applications(applications, false).await?)
    }

    pub async fn my_applications(&self, user_id: &UserId) -> ApiResult<Vec<ApplicationView>> {
        let applications = self.repos.applications.list_for_applicant(user_id).await?;
        Ok(self.populator.applications(applications, true).await?)
    }

    async fn require_application(&self, id: &ApplicationId) -> ApiResult<Application> {
        self.repos
            .applications
            .get(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Application not found"))
    }

    /// Review an application; only the job's poster may change its status.
    pub async fn set_status(
        &self,
        user_id: &UserId,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> ApiResult<ApplicationView> {
        let application = self.require_application(id).await?;
        let job = self.owned_job(user_id, &application.job).await?;

        let updated = self.repos.applications.set_status(id, status).await?;

        self.notifications
            .notify(
                Notification::new(
                    updated.applicant.clone(),
                    NotificationType::ApplicationStatus,
                    format!(
                        "Your application for {} is now {}",
                        job.title,
                        status.as_str()
                    ),
                )
                .with_actor(user_id.clone())
                .with_job(job.id.clone()),
            )
            .await;

        let mut views = self.populator.applications(vec![updated], true).await?;
        Ok(views.remove(0))
    }

    /// Withdraw one's own application.
    pub async fn withdraw(&self, user_id: &UserId, id: &ApplicationId) -> ApiResult<()> {
        let application = self.require_application(id).await?;
        if &application.applicant != user_id {
            return Err(ApiError::forbidden("You can only withdraw your own applications"));
        }
        self.repos.applications.delete(id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use linkup_models::User;
    use linkup_store::MemoryStore;

    use super::*;

    struct Fixture {
        service: JobService,
        repos: Repositories,
        poster: User,
        applicant: User,
        job: Job,
    }

    async fn fixture() -> Fixture {
        let repos = Repositories::new(Arc::new(MemoryStore::new()));
        let populator = Populator::new(repos.users.clone(), repos.jobs.clone());
        let notifications = NotificationService::new(repos.notifications.clone(), populator.clone());
        let service = JobService::new(repos.clone(), populator, notifications);

        let poster = User::new("Grace", "grace", "grace@example.com", "hash");
        let applicant = User::new("Ada", "ada", "ada@example.com", "hash");
        repos.users.create(&poster).await.unwrap();
        repos.users.create(&applicant).await.unwrap();

        let job = service
            .create(
                &poster.id,
                NewJob {
                    title: "Compiler Engineer".to_string(),
                    company: "Navy".to_string(),
                    location: "Arlington".to_string(),
                    description: "Build COBOL".to_string(),
                    employment_type: EmploymentType::FullTime,
                    workplace: WorkplaceType::OnSite,
                    skills: vec!["compilers".to_string()],
                    salary: None,
                },
            )
            .await
            .unwrap();

        Fixture {
            service,
            repos,
            poster,
            applicant,
            job,
        }
    }

    fn form() -> ApplicationForm {
        ApplicationForm {
            full_name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: "555-0100".to_string(),
            experience: "Analytical engines".to_string(),
            skills: parse_skills("math, , engines"),
            cover_letter: "Hello".to_string(),
        }
    }

    #[test]
    fn test_parse_skills() {
        assert_eq!(parse_skills(" rust ,go,, "), vec!["rust", "go"]);
        assert!(parse_skills("").is_empty());
    }

    #[tokio::test]
    async fn test_apply_once_then_conflict() {
        let f = fixture().await;
        let application = f.service.apply(&f.applicant.id, &f.job.id, form()).await.unwrap();
        assert_eq!(application.skills, vec!["math", "engines"]);

        let err = f
            .service
            .apply(&f.applicant.id, &f.job.id, form())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(ref m) if m == "You have already applied to this job"));

        let notifications = f
            .repos
            .notifications
            .list_for_recipient(&f.poster.id)
            .await
            .unwrap();
        assert_eq!(notifications.len(), 1);
    }

    #[tokio::test]
    async fn test_apply_rules() {
        let f = fixture().await;
        assert!(matches!(
            f.service.apply(&f.poster.id, &f.job.id, form()).await,
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            f.service.apply(&f.applicant.id, &JobId::from("nope"), form()).await,
            Err(ApiError::NotFound(_))
        ));

        f.service.close(&f.poster.id, &f.job.id).await.unwrap();
        assert!(matches!(
            f.service.apply(&f.applicant.id, &f.job.id, form()).await,
            Err(ApiError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_status_review_is_poster_only() {
        let f = fixture().await;
        let application = f.service.apply(&f.applicant.id, &f.job.id, form()).await.unwrap();

        assert!(matches!(
            f.service
                .set_status(&f.applicant.id, &application.id, ApplicationStatus::Accepted)
                .await,
            Err(ApiError::Forbidden(_))
        ));

        let view = f
            .service
            .set_status(&f.poster.id, &application.id, ApplicationStatus::Shortlisted)
            .await
            .unwrap();
        assert_eq!(view.status, ApplicationStatus::Shortlisted);
        assert_eq!(view.job.as_ref().map(|j| j.title.as_str()), Some("Compiler Engineer"));

        let mine = f.service.my_applications(&f.applicant.id).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].applicant.username, "ada");
    }

    #[tokio::test]
    async fn test_withdraw_allows_reapplying() {
        let f = fixture().await;
        let application = f.service.apply(&f.applicant.id, &f.job.id, form()).await.unwrap();
        f.service.withdraw(&f.applicant.id, &application.id).await.unwrap();
        f.service.apply(&f.applicant.id, &f.job.id, form()).await.unwrap();
    }

    #[tokio::test]
    async fn test_search_filters_jobs() {
        let f = fixture().await;
        assert_eq!(f.service.list(Some("compiler"), false).await.unwrap().len(), 1);
        assert!(f.service.list(Some("gardener"), false).await.unwrap().is_empty());
    }
}
