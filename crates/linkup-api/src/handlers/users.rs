//! Profile handlers.

use axum::extract::State;
use axum::Json;
use validator::Validate;

use linkup_models::{UserId, UserSummary};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath};
use crate::services::profiles::{ProfileUpdate, ProfileView};
use crate::state::AppState;

/// GET /api/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(user_id): ApiPath<String>,
) -> ApiResult<Json<ProfileView>> {
    Ok(Json(state.profiles.get(&UserId::from(user_id)).await?))
}

/// PUT /api/users/profile
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> ApiResult<Json<ProfileView>> {
    update.validate()?;
    Ok(Json(state.profiles.update(&user.user_id, update).await?))
}

/// GET /api/users/suggestions
pub async fn suggestions(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<UserSummary>>> {
    Ok(Json(state.profiles.suggestions(&user.user_id).await?))
}
