//! Connection handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::json;

use linkup_models::{Invitation, InvitationId, UserId, UserSummary};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::ApiPath;
use crate::services::connections::ConnectionStatus;
use crate::services::populate::InvitationView;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: ConnectionStatus,
}

/// POST /api/connections/request/:user_id
pub async fn send_request(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(recipient): ApiPath<String>,
) -> ApiResult<(StatusCode, Json<Invitation>)> {
    let invitation = state
        .connections
        .request(&user.user_id, &UserId::from(recipient))
        .await?;
    Ok((StatusCode::CREATED, Json(invitation)))
}

/// PUT /api/connections/accept/:invitation_id
pub async fn accept_request(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(invitation_id): ApiPath<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state
        .connections
        .accept(&user.user_id, &InvitationId::from(invitation_id))
        .await?;
    Ok(Json(json!({ "message": "Connection accepted successfully" })))
}

/// PUT /api/connections/reject/:invitation_id
pub async fn reject_request(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(invitation_id): ApiPath<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state
        .connections
        .reject(&user.user_id, &InvitationId::from(invitation_id))
        .await?;
    Ok(Json(json!({ "message": "Connection request rejected" })))
}

/// GET /api/connections
pub async fn list_connections(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<UserSummary>>> {
    Ok(Json(state.connections.list(&user.user_id).await?))
}

/// GET /api/connections/requests
pub async fn pending_requests(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<InvitationView>>> {
    Ok(Json(state.connections.requests(&user.user_id).await?))
}

/// GET /api/connections/status/:user_id
pub async fn connection_status(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(other): ApiPath<String>,
) -> ApiResult<Json<StatusResponse>> {
    let status = state
        .connections
        .status(&user.user_id, &UserId::from(other))
        .await?;
    Ok(Json(StatusResponse { status }))
}

/// DELETE /api/connections/:user_id
pub async fn remove_connection(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(other): ApiPath<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state
        .connections
        .remove(&user.user_id, &UserId::from(other))
        .await?;
    Ok(Json(json!({ "message": "Connection removed successfully" })))
}
