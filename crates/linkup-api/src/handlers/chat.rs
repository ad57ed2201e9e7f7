//! Chat handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use linkup_models::{ChatId, UserId};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath};
use crate::services::populate::{ChatView, MessageView};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatRequest {
    pub participant_id: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub content: String,
}

/// POST /api/chat/create
pub async fn create_chat(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateChatRequest>,
) -> ApiResult<Json<ChatView>> {
    Ok(Json(
        state
            .chat
            .open(&user.user_id, &UserId::from(req.participant_id))
            .await?,
    ))
}

/// GET /api/chat
pub async fn list_chats(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<ChatView>>> {
    Ok(Json(state.chat.list(&user.user_id).await?))
}

/// GET /api/chat/:id/messages
pub async fn list_messages(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(chat_id): ApiPath<String>,
) -> ApiResult<Json<Vec<MessageView>>> {
    Ok(Json(
        state
            .chat
            .messages(&user.user_id, &ChatId::from(chat_id))
            .await?,
    ))
}

/// POST /api/chat/:id/messages
pub async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(chat_id): ApiPath<String>,
    ApiJson(req): ApiJson<MessageRequest>,
) -> ApiResult<(StatusCode, Json<MessageView>)> {
    let message = state
        .chat
        .send(&user.user_id, &ChatId::from(chat_id), &req.content)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}
