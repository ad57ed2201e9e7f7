//! Saved post handlers.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use linkup_models::PostId;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath};
use crate::services::populate::PostView;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub post_id: String,
}

#[derive(Debug, Serialize)]
pub struct SavedResponse {
    pub saved: bool,
}

/// GET /api/savedposts
pub async fn list_saved(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<PostView>>> {
    Ok(Json(state.saved_posts.list(&user.user_id).await?))
}

/// POST /api/savedposts
pub async fn save_post(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<SaveRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    state
        .saved_posts
        .save(&user.user_id, &PostId::from(req.post_id))
        .await?;
    Ok(Json(json!({ "message": "Post saved", "saved": true })))
}

/// DELETE /api/savedposts/:id
pub async fn unsave_post(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(post_id): ApiPath<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state
        .saved_posts
        .unsave(&user.user_id, &PostId::from(post_id))
        .await?;
    Ok(Json(json!({ "message": "Post unsaved", "saved": false })))
}

/// POST /api/savedposts/toggle/:id
pub async fn toggle_saved(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(post_id): ApiPath<String>,
) -> ApiResult<Json<SavedResponse>> {
    let saved = state
        .saved_posts
        .toggle(&user.user_id, &PostId::from(post_id))
        .await?;
    Ok(Json(SavedResponse { saved }))
}

/// GET /api/savedposts/check/:id
pub async fn check_saved(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(post_id): ApiPath<String>,
) -> ApiResult<Json<SavedResponse>> {
    let saved = state
        .saved_posts
        .is_saved(&user.user_id, &PostId::from(post_id))
        .await?;
    Ok(Json(SavedResponse { saved }))
}
