//! Job and application handlers.

use axum::extract::{Multipart, State};
use axum_extra::extract::WithRejection;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use linkup_models::{Application, ApplicationId, ApplicationStatus, Job, JobId};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiMultipart, ApiPath, ApiQuery};
use crate::services::jobs::{parse_skills, ApplicationForm, NewJob};
use crate::services::populate::ApplicationView;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobQuery {
    pub q: Option<String>,
    #[serde(default)]
    pub include_closed: bool,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: ApplicationStatus,
}

/// GET /api/jobs
pub async fn list_jobs(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<JobQuery>,
) -> ApiResult<Json<Vec<Job>>> {
    Ok(Json(
        state
            .jobs
            .list(query.q.as_deref(), query.include_closed)
            .await?,
    ))
}

/// POST /api/jobs
pub async fn create_job(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<NewJob>,
) -> ApiResult<(StatusCode, Json<Job>)> {
    req.validate()?;
    let job = state.jobs.create(&user.user_id, req).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/jobs/:id
pub async fn get_job(
    State(state): State<AppState>,
    ApiPath(job_id): ApiPath<String>,
) -> ApiResult<Json<Job>> {
    Ok(Json(state.jobs.get(&JobId::from(job_id)).await?))
}

/// PATCH /api/jobs/:id/close
pub async fn close_job(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(job_id): ApiPath<String>,
) -> ApiResult<Json<Job>> {
    Ok(Json(
        state.jobs.close(&user.user_id, &JobId::from(job_id)).await?,
    ))
}

/// DELETE /api/jobs/:id
pub async fn delete_job(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(job_id): ApiPath<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state
        .jobs
        .delete(&user.user_id, &JobId::from(job_id))
        .await?;
    Ok(Json(json!({ "message": "Job deleted successfully" })))
}

/// Read the application form fields; unknown fields and files are ignored.
async fn read_form(mut multipart: Multipart) -> ApiResult<ApplicationForm> {
    let mut form = ApplicationForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid form data: {}", e)))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if field.file_name().is_some() {
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid form field {}: {}", name, e)))?;

        match name.as_str() {
            "fullName" => form.full_name = value,
            "email" => form.email = value,
            "phone" => form.phone = value,
            "experience" => form.experience = value,
            "skills" => form.skills = parse_skills(&value),
            "coverLetter" => form.cover_letter = value,
            _ => {}
        }
    }

    Ok(form)
}

/// POST /api/jobs/:id/applications
pub async fn apply(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(job_id): ApiPath<String>,
    WithRejection(multipart, _): ApiMultipart,
) -> ApiResult<(StatusCode, Json<Application>)> {
    let form = read_form(multipart).await?;
    form.validate()?;

    let application = state
        .jobs
        .apply(&user.user_id, &JobId::from(job_id), form)
        .await?;
    Ok((StatusCode::CREATED, Json(application)))
}

/// GET /api/jobs/:id/applications
pub async fn job_applications(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(job_id): ApiPath<String>,
) -> ApiResult<Json<Vec<ApplicationView>>> {
    Ok(Json(
        state
            .jobs
            .applications_for_job(&user.user_id, &JobId::from(job_id))
            .await?,
    ))
}

/// GET /api/applications/me
pub async fn my_applications(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<ApplicationView>>> {
    Ok(Json(state.jobs.my_applications(&user.user_id).await?))
}

/// PATCH /api/applications/:id/status
pub async fn update_application_status(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(application_id): ApiPath<String>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> ApiResult<Json<ApplicationView>> {
    Ok(Json(
        state
            .jobs
            .set_status(
                &user.user_id,
                &ApplicationId::from(application_id),
                req.status,
            )
            .await?,
    ))
}

/// DELETE /api/applications/:id
pub async fn withdraw_application(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(application_id): ApiPath<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state
        .jobs
        .withdraw(&user.user_id, &ApplicationId::from(application_id))
        .await?;
    Ok(Json(json!({ "message": "Application withdrawn" })))
}
