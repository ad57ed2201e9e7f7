//! Prometheus metrics for the API server.

use std::sync::LazyLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex::Regex;

/// Install the Prometheus recorder and return a handle for rendering.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "linkup_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "linkup_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "linkup_http_requests_in_flight";

    // Auth metrics
    pub const AUTH_REJECTIONS_TOTAL: &str = "linkup_auth_rejections_total";
    pub const SIGNUPS_TOTAL: &str = "linkup_signups_total";
    pub const LOGINS_TOTAL: &str = "linkup_logins_total";

    // Domain metrics
    pub const POSTS_CREATED_TOTAL: &str = "linkup_posts_created_total";
    pub const APPLICATIONS_TOTAL: &str = "linkup_applications_total";
    pub const MESSAGES_SENT_TOTAL: &str = "linkup_messages_sent_total";
    pub const NOTIFICATIONS_TOTAL: &str = "linkup_notifications_total";
    pub const NOTIFICATION_FAILURES_TOTAL: &str = "linkup_notification_failures_total";
    pub const EMAILS_FAILED_TOTAL: &str = "linkup_emails_failed_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "linkup_rate_limit_hits_total";
}

static UUID_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}(_[0-9a-f-]{36})?")
        .unwrap_or_else(|_| unreachable!())
});

static NUMERIC_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/[0-9]+(/|$)").unwrap_or_else(|_| unreachable!()));

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a rejected session, labelled by reason.
pub fn record_auth_rejection(reason: &str) {
    let labels = [("reason", reason.to_string())];
    counter!(names::AUTH_REJECTIONS_TOTAL, &labels).increment(1);
}

pub fn record_signup() {
    counter!(names::SIGNUPS_TOTAL).increment(1);
}

/// Record a login attempt.
pub fn record_login(success: bool) {
    let labels = [("outcome", if success { "success" } else { "failure" }.to_string())];
    counter!(names::LOGINS_TOTAL, &labels).increment(1);
}

pub fn record_post_created() {
    counter!(names::POSTS_CREATED_TOTAL).increment(1);
}

/// Record an application attempt; `outcome` is `created` or `duplicate`.
pub fn record_application(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::APPLICATIONS_TOTAL, &labels).increment(1);
}

pub fn record_message_sent() {
    counter!(names::MESSAGES_SENT_TOTAL).increment(1);
}

/// Record a notification write.
pub fn record_notification(kind: &str, success: bool) {
    let labels = [("type", kind.to_string())];
    if success {
        counter!(names::NOTIFICATIONS_TOTAL, &labels).increment(1);
    } else {
        counter!(names::NOTIFICATION_FAILURES_TOTAL, &labels).increment(1);
    }
}

/// Record an email that could not be delivered.
pub fn record_email_failure(template: &str) {
    let labels = [("template", template.to_string())];
    counter!(names::EMAILS_FAILED_TOTAL, &labels).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Replace document ids in a path so labels stay low-cardinality.
fn sanitize_path(path: &str) -> String {
    let path = UUID_SEGMENT.replace_all(path, ":id");
    let path = NUMERIC_SEGMENT.replace_all(&path, "/:id$1");
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
