//! End-to-end tests driving the router against the in-memory store.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use linkup_api::auth::issue_token;
use linkup_api::{create_router, ApiConfig, AppState};
use linkup_mail::LogMailer;
use linkup_models::UserId;
use linkup_store::MemoryStore;

const BOUNDARY: &str = "linkup-test-boundary";

fn app() -> Router {
    let state = AppState::with_store(
        ApiConfig::default(),
        Arc::new(MemoryStore::new()),
        Arc::new(LogMailer),
    );
    create_router(state, None)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn empty_request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn multipart_request(uri: &str, cookie: &str, fields: &[(&str, &str)]) -> Request<Body> {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::COOKIE, cookie)
        .body(Body::from(body))
        .unwrap()
}

/// Sign up a user and return `(user_id, cookie)`.
async fn signup(app: &Router, username: &str) -> (String, String) {
    let request = json_request(
        "POST",
        "/api/auth/signup",
        None,
        json!({
            "name": username,
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "secret123",
        }),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .unwrap()
        .to_string();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    (body["id"].as_str().unwrap().to_string(), cookie)
}

async fn create_post(app: &Router, cookie: &str, description: &str) -> String {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/api/posts",
            Some(cookie),
            json!({ "description": description }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = send(&app, empty_request("GET", "/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_signup_me_and_logout() {
    let app = app();
    let (id, cookie) = signup(&app, "ada").await;

    let (status, me) = send(&app, empty_request("GET", "/api/auth/me", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], id.as_str());
    assert_eq!(me["username"], "ada");
    assert!(me.get("password").is_none());

    let response = app
        .clone()
        .oneshot(empty_request("POST", "/api/auth/logout", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cleared = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(cleared.starts_with("token=;"));
    assert!(cleared.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_duplicate_signup_conflicts() {
    let app = app();
    signup(&app, "ada").await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/signup",
            None,
            json!({
                "name": "Other",
                "username": "other",
                "email": "ada@example.com",
                "password": "secret123",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Email already exists");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/signup",
            None,
            json!({
                "name": "Other",
                "username": "ada",
                "email": "other@example.com",
                "password": "secret123",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Username already exists");
}

#[tokio::test]
async fn test_login_with_bad_password() {
    let app = app();
    signup(&app, "ada").await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "email": "ada@example.com", "password": "wrong-password" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid credentials");

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "email": "ada@example.com", "password": "secret123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_auth_failures_are_distinguished() {
    let app = app();

    let (status, body) = send(&app, empty_request("GET", "/api/auth/me", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthorized - No token provided");

    let (status, body) = send(
        &app,
        empty_request("GET", "/api/auth/me", Some("token=not-a-jwt")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthorized - Invalid token format");

    let config = ApiConfig::default();
    let expired = issue_token(&UserId::from("ghost"), &config.jwt_secret, -1).unwrap();
    let (status, body) = send(
        &app,
        empty_request("GET", "/api/auth/me", Some(&format!("token={expired}"))),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthorized - Token expired");
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_saved_posts_flow() {
    let app = app();
    let (_, cookie) = signup(&app, "ada").await;
    let post_id = create_post(&app, &cookie, "Hello network").await;

    let (status, body) = send(&app, empty_request("GET", "/api/savedposts", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let toggle = format!("/api/savedposts/toggle/{post_id}");
    let (_, body) = send(&app, empty_request("POST", &toggle, Some(&cookie))).await;
    assert_eq!(body["saved"], true);
    let (_, body) = send(&app, empty_request("POST", &toggle, Some(&cookie))).await;
    assert_eq!(body["saved"], false);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/savedposts",
            Some(&cookie),
            json!({ "postId": post_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, empty_request("GET", "/api/savedposts", Some(&cookie))).await;
    let saved = body.as_array().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0]["id"], post_id.as_str());
    assert_eq!(saved[0]["author"]["username"], "ada");

    let check = format!("/api/savedposts/check/{post_id}");
    let (_, body) = send(&app, empty_request("GET", &check, Some(&cookie))).await;
    assert_eq!(body["saved"], true);

    let unsave = format!("/api/savedposts/{post_id}");
    let (status, _) = send(&app, empty_request("DELETE", &unsave, Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, empty_request("GET", "/api/savedposts", Some(&cookie))).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_like_and_comment_notify_author() {
    let app = app();
    let (_, ada) = signup(&app, "ada").await;
    let (_, bob) = signup(&app, "bob").await;
    let post_id = create_post(&app, &ada, "Looking for feedback").await;

    let (status, body) = send(
        &app,
        empty_request("POST", &format!("/api/posts/{post_id}/like"), Some(&bob)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["liked"], true);
    assert_eq!(body["likeCount"], 1);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/posts/{post_id}/comments"),
            Some(&bob),
            json!({ "content": "Looks great" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["comments"][0]["user"]["username"], "bob");

    let (_, body) = send(&app, empty_request("GET", "/api/notifications/count", Some(&ada))).await;
    assert_eq!(body["count"], 2);

    let (_, list) = send(&app, empty_request("GET", "/api/notifications/get", Some(&ada))).await;
    let first = list[0]["id"].as_str().unwrap().to_string();
    assert_eq!(list[0]["actor"]["username"], "bob");

    let (status, body) = send(
        &app,
        empty_request("PUT", &format!("/api/notifications/read/{first}"), Some(&ada)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["read"], true);

    // Someone else's notification is off limits.
    let (status, _) = send(
        &app,
        empty_request("PUT", &format!("/api/notifications/read/{first}"), Some(&bob)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = send(&app, empty_request("GET", "/api/notifications/count", Some(&ada))).await;
    assert_eq!(body["count"], 1);

    let (status, _) = send(
        &app,
        empty_request(
            "DELETE",
            &format!("/api/notifications/deleteone/{first}"),
            Some(&ada),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, empty_request("DELETE", "/api/notifications", Some(&ada))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 1);
    let (_, list) = send(&app, empty_request("GET", "/api/notifications/get", Some(&ada))).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn test_apply_twice_conflicts() {
    let app = app();
    let (_, poster) = signup(&app, "poster").await;
    let (_, applicant) = signup(&app, "applicant").await;

    let (status, job) = send(
        &app,
        json_request(
            "POST",
            "/api/jobs",
            Some(&poster),
            json!({
                "title": "Rust Engineer",
                "company": "LinkUp",
                "location": "Remote",
                "description": "Build the backend",
                "workplace": "remote",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let job_id = job["id"].as_str().unwrap().to_string();
    let uri = format!("/api/jobs/{job_id}/applications");

    let fields = [
        ("fullName", "App Licant"),
        ("email", "applicant@example.com"),
        ("phone", "555-0100"),
        ("experience", "5 years"),
        ("skills", "rust, tokio"),
        ("coverLetter", "Hire me"),
    ];

    let (status, body) = send(&app, multipart_request(&uri, &applicant, &fields)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["skills"], json!(["rust", "tokio"]));

    let (status, body) = send(&app, multipart_request(&uri, &applicant, &fields)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "You have already applied to this job");

    let (status, body) = send(&app, empty_request("GET", &uri, Some(&poster))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["applicant"]["username"], "applicant");

    let (status, _) = send(&app, empty_request("GET", &uri, Some(&applicant))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_connection_lifecycle() {
    let app = app();
    let (ada_id, ada) = signup(&app, "ada").await;
    let (bob_id, bob) = signup(&app, "bob").await;

    let (status, invitation) = send(
        &app,
        empty_request("POST", &format!("/api/connections/request/{bob_id}"), Some(&ada)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let invitation_id = invitation["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        empty_request("POST", &format!("/api/connections/request/{ada_id}"), Some(&bob)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = send(
        &app,
        empty_request("GET", &format!("/api/connections/status/{bob_id}"), Some(&ada)),
    )
    .await;
    assert_eq!(body["status"], "pending_sent");

    let (_, pending) = send(&app, empty_request("GET", "/api/connections/requests", Some(&bob))).await;
    assert_eq!(pending[0]["sender"]["username"], "ada");

    let (status, _) = send(
        &app,
        empty_request(
            "PUT",
            &format!("/api/connections/accept/{invitation_id}"),
            Some(&bob),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, connections) = send(&app, empty_request("GET", "/api/connections", Some(&ada))).await;
    assert_eq!(connections[0]["username"], "bob");

    let (status, _) = send(
        &app,
        empty_request("DELETE", &format!("/api/connections/{bob_id}"), Some(&ada)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(
        &app,
        empty_request("GET", &format!("/api/connections/status/{ada_id}"), Some(&bob)),
    )
    .await;
    assert_eq!(body["status"], "none");
}

#[tokio::test]
async fn test_chat_is_shared_by_the_pair() {
    let app = app();
    let (ada_id, ada) = signup(&app, "ada").await;
    let (bob_id, bob) = signup(&app, "bob").await;
    let (_, eve) = signup(&app, "eve").await;

    let (status, first) = send(
        &app,
        json_request(
            "POST",
            "/api/chat/create",
            Some(&ada),
            json!({ "participantId": bob_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = send(
        &app,
        json_request(
            "POST",
            "/api/chat/create",
            Some(&bob),
            json!({ "participantId": ada_id }),
        ),
    )
    .await;
    assert_eq!(first["id"], second["id"]);
    let chat_id = first["id"].as_str().unwrap().to_string();
    let messages = format!("/api/chat/{chat_id}/messages");

    let (status, _) = send(
        &app,
        json_request("POST", &messages, Some(&ada), json!({ "content": "Hi Bob" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, list) = send(&app, empty_request("GET", &messages, Some(&bob))).await;
    assert_eq!(list[0]["content"], "Hi Bob");
    assert_eq!(list[0]["sender"]["username"], "ada");

    let (status, _) = send(&app, empty_request("GET", &messages, Some(&eve))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, chats) = send(&app, empty_request("GET", "/api/chat", Some(&bob))).await;
    assert_eq!(chats[0]["lastMessage"], "Hi Bob");
}

#[tokio::test]
async fn test_private_posts_cannot_be_saved_by_others() {
    let app = app();
    let (_, ada) = signup(&app, "ada").await;
    let (_, bob) = signup(&app, "bob").await;

    let (status, post) = send(
        &app,
        json_request(
            "POST",
            "/api/posts",
            Some(&ada),
            json!({ "description": "ada private diary", "visibility": "private" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let post_id = post["id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, empty_request("GET", &format!("/api/posts/{post_id}"), Some(&bob))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        empty_request("POST", &format!("/api/savedposts/toggle/{post_id}"), Some(&bob)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Post not found");

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/savedposts",
            Some(&bob),
            json!({ "postId": post_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, saved) = send(&app, empty_request("GET", "/api/savedposts", Some(&bob))).await;
    assert_eq!(saved, json!([]));

    // The author may keep their own private post.
    let (_, body) = send(
        &app,
        empty_request("POST", &format!("/api/savedposts/toggle/{post_id}"), Some(&ada)),
    )
    .await;
    assert_eq!(body["saved"], true);
    let (_, saved) = send(&app, empty_request("GET", "/api/savedposts", Some(&ada))).await;
    assert_eq!(saved[0]["description"], "ada private diary");
}

#[tokio::test]
async fn test_malformed_input_gets_json_error_body() {
    let app = app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("application/json"));
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["message"].as_str().unwrap().contains("JSON"));

    // Wrong field types are reported the same way.
    let (status, body) = send(
        &app,
        json_request("POST", "/api/auth/login", None, json!({ "email": 42, "password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());

    let (_, ada) = signup(&app, "ada").await;
    let (status, body) = send(
        &app,
        json_request(
            "PATCH",
            "/api/applications/app1/status",
            Some(&ada),
            json!({ "status": "not-a-status" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());

    let (status, body) = send(
        &app,
        empty_request("GET", "/api/jobs?includeClosed=maybe", None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_email_with_slash_cannot_claim_a_document() {
    let app = app();
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/signup",
            None,
            json!({
                "name": "Slash",
                "username": "slash",
                "email": "a/b@example.com",
                "password": "secret123",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "email": "a/b@example.com", "password": "secret123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid credentials");
}
