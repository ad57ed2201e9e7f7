//! Post handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use linkup_models::{CommentId, PostId};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath};
use crate::services::populate::PostView;
use crate::services::posts::{LikeOutcome, NewPost};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub content: String,
}

/// GET /api/posts
pub async fn feed(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<PostView>>> {
    Ok(Json(state.posts.feed(&user.user_id).await?))
}

/// POST /api/posts
pub async fn create_post(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<NewPost>,
) -> ApiResult<(StatusCode, Json<PostView>)> {
    req.validate()?;
    let post = state.posts.create(&user.user_id, req).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// GET /api/posts/:id
pub async fn get_post(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(post_id): ApiPath<String>,
) -> ApiResult<Json<PostView>> {
    Ok(Json(
        state.posts.get(&user.user_id, &PostId::from(post_id)).await?,
    ))
}

/// DELETE /api/posts/:id
pub async fn delete_post(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(post_id): ApiPath<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state
        .posts
        .delete(&user.user_id, &PostId::from(post_id))
        .await?;
    Ok(Json(json!({ "message": "Post deleted successfully" })))
}

/// POST /api/posts/:id/like
pub async fn like_post(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(post_id): ApiPath<String>,
) -> ApiResult<Json<LikeOutcome>> {
    Ok(Json(
        state
            .posts
            .toggle_like(&user.user_id, &PostId::from(post_id))
            .await?,
    ))
}

/// POST /api/posts/:id/comments
pub async fn add_comment(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(post_id): ApiPath<String>,
    ApiJson(req): ApiJson<CommentRequest>,
) -> ApiResult<(StatusCode, Json<PostView>)> {
    let post = state
        .posts
        .add_comment(&user.user_id, &PostId::from(post_id), &req.content)
        .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// DELETE /api/posts/:id/comments/:comment_id
pub async fn delete_comment(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath((post_id, comment_id)): ApiPath<(String, String)>,
) -> ApiResult<Json<PostView>> {
    Ok(Json(
        state
            .posts
            .delete_comment(
                &user.user_id,
                &PostId::from(post_id),
                &CommentId::from(comment_id),
            )
            .await?,
    ))
}
