//! Account handlers: signup, login, logout and password reset.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::auth::{clear_cookie, session_cookie, AuthUser};
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::security::validate_username;
use crate::services::accounts::{NewAccount, Session};
use crate::services::profiles::ProfileView;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    #[validate(custom(function = "validate_username"))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Reset token is required"))]
    pub token: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

fn with_cookie(state: &AppState, status: StatusCode, session: Session) -> impl IntoResponse {
    let cookie = session_cookie(&state.config, &session.token);
    (
        status,
        [(header::SET_COOKIE, cookie)],
        Json(ProfileView::from(session.user)),
    )
}

/// POST /api/auth/signup
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;
    let session = state
        .accounts
        .signup(NewAccount {
            name: req.name,
            username: req.username,
            email: req.email,
            password: req.password,
        })
        .await?;
    Ok(with_cookie(&state, StatusCode::CREATED, session))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;
    let session = state.accounts.login(&req.email, &req.password).await?;
    Ok(with_cookie(&state, StatusCode::OK, session))
}

/// GET|POST /api/auth/logout
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::SET_COOKIE, clear_cookie(&state.config))],
        Json(json!({ "message": "Logged out successfully" })),
    )
}

/// GET /api/auth/me
pub async fn me(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<ProfileView>> {
    let user = state.accounts.me(&user.user_id).await?;
    Ok(Json(user.into()))
}

/// POST /api/auth/forgot-password
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ForgotPasswordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    req.validate()?;
    state.accounts.forgot_password(&req.email).await?;
    Ok(Json(json!({
        "message": "If an account with that email exists, a password reset link has been sent"
    })))
}

/// POST /api/auth/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    req.validate()?;
    state
        .accounts
        .reset_password(&req.token, &req.password)
        .await?;
    Ok(Json(json!({ "message": "Password reset successful" })))
}
