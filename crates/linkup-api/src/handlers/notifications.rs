//! Notification handlers.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::json;

use linkup_models::NotificationId;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::ApiPath;
use crate::services::populate::NotificationView;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: usize,
}

/// GET /api/notifications/get
pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<NotificationView>>> {
    Ok(Json(state.notifications.list(&user.user_id).await?))
}

/// GET /api/notifications/count
pub async fn unread_count(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<CountResponse>> {
    let count = state.notifications.count_unread(&user.user_id).await?;
    Ok(Json(CountResponse { count }))
}

/// PUT /api/notifications/read/:id
pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<NotificationView>> {
    Ok(Json(
        state
            .notifications
            .mark_read(&user.user_id, &NotificationId::from(id))
            .await?,
    ))
}

/// PUT /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<serde_json::Value>> {
    let updated = state.notifications.mark_all_read(&user.user_id).await?;
    Ok(Json(json!({
        "message": "All notifications marked as read",
        "updated": updated
    })))
}

/// DELETE /api/notifications/deleteone/:id
pub async fn delete_notification(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state
        .notifications
        .delete(&user.user_id, &NotificationId::from(id))
        .await?;
    Ok(Json(json!({ "message": "Notification deleted" })))
}

/// DELETE /api/notifications
pub async fn delete_all_notifications(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<serde_json::Value>> {
    let deleted = state.notifications.delete_all(&user.user_id).await?;
    Ok(Json(json!({
        "message": "All notifications deleted",
        "deleted": deleted
    })))
}
