//! API routes.

use std::sync::Arc;

use axum::middleware;
use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::auth::{forgot_password, login, logout, me, reset_password, signup};
use crate::handlers::chat::{create_chat, list_chats, list_messages, send_message};
use crate::handlers::connections::{
    accept_request, connection_status, list_connections, pending_requests, reject_request,
    remove_connection, send_request,
};
use crate::handlers::jobs::{
    apply, close_job, create_job, delete_job, get_job, job_applications, list_jobs,
    my_applications, update_application_status, withdraw_application,
};
use crate::handlers::notifications::{
    delete_all_notifications, delete_notification, list_notifications, mark_all_read, mark_read,
    unread_count,
};
use crate::handlers::posts::{
    add_comment, create_post, delete_comment, delete_post, feed, get_post, like_post,
};
use crate::handlers::saved_posts::{check_saved, list_saved, save_post, toggle_saved, unsave_post};
use crate::handlers::users::{get_user, suggestions, update_profile};
use crate::handlers::{health, ready};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let auth_routes = Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", get(logout).post(logout))
        .route("/auth/me", get(me))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password));

    let user_routes = Router::new()
        .route("/users/profile", put(update_profile))
        .route("/users/suggestions", get(suggestions))
        .route("/users/:user_id", get(get_user));

    let post_routes = Router::new()
        .route("/posts", get(feed).post(create_post))
        .route("/posts/:post_id", get(get_post).delete(delete_post))
        .route("/posts/:post_id/like", post(like_post))
        .route("/posts/:post_id/comments", post(add_comment))
        .route("/posts/:post_id/comments/:comment_id", delete(delete_comment));

    let saved_post_routes = Router::new()
        .route("/savedposts", get(list_saved).post(save_post))
        .route("/savedposts/:post_id", delete(unsave_post))
        .route("/savedposts/toggle/:post_id", post(toggle_saved))
        .route("/savedposts/check/:post_id", get(check_saved));

    let job_routes = Router::new()
        .route("/jobs", get(list_jobs).post(create_job))
        .route("/jobs/:job_id", get(get_job).delete(delete_job))
        .route("/jobs/:job_id/close", patch(close_job))
        .route(
            "/jobs/:job_id/applications",
            get(job_applications).post(apply),
        )
        .route("/applications/me", get(my_applications))
        .route("/applications/:application_id", delete(withdraw_application))
        .route(
            "/applications/:application_id/status",
            patch(update_application_status),
        );

    let connection_routes = Router::new()
        .route("/connections", get(list_connections))
        .route("/connections/requests", get(pending_requests))
        .route("/connections/request/:user_id", post(send_request))
        .route("/connections/accept/:invitation_id", put(accept_request))
        .route("/connections/reject/:invitation_id", put(reject_request))
        .route("/connections/status/:user_id", get(connection_status))
        .route("/connections/:user_id", delete(remove_connection));

    let notification_routes = Router::new()
        .route("/notifications", delete(delete_all_notifications))
        .route("/notifications/get", get(list_notifications))
        .route("/notifications/count", get(unread_count))
        .route("/notifications/read-all", put(mark_all_read))
        .route("/notifications/read/:notification_id", put(mark_read))
        .route(
            "/notifications/deleteone/:notification_id",
            delete(delete_notification),
        );

    let chat_routes = Router::new()
        .route("/chat", get(list_chats))
        .route("/chat/create", post(create_chat))
        .route(
            "/chat/:chat_id/messages",
            get(list_messages).post(send_message),
        );

    let rate_limiter = Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    let api_routes = Router::new()
        .merge(auth_routes)
        .merge(user_routes)
        .merge(post_routes)
        .merge(saved_post_routes)
        .merge(job_routes)
        .merge(connection_routes)
        .merge(notification_routes)
        .merge(chat_routes)
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    let metrics_routes = match metrics_handle {
        Some(handle) => Router::new().route("/metrics", get(move || async move { handle.render() })),
        None => Router::new(),
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
