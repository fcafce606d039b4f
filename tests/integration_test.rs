use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

use progresspath_backend::config::Config;
use progresspath_backend::embed::{self, EmbedSubject};

mod common;

fn subject() -> EmbedSubject {
    EmbedSubject {
        user_id: Uuid::from_u128(42),
        email: "learner@example.com".to_string(),
        full_name: Some("Camille Martin".to_string()),
    }
}

#[tokio::test]
async fn test_health_root_reports_degraded_without_database() {
    let (response, body) = common::send(common::create_test_app(), common::get("/health")).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database"], "disconnected");
}

#[tokio::test]
async fn test_health_live() {
    let app = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health/live")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_mounted_under_api() {
    let (response, body) = common::send(common::create_test_app(), common::get("/api/health/info")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body["service"], "progresspath-backend");
    assert_eq!(body["localMode"], true);
}

#[tokio::test]
async fn test_health_database_without_pool() {
    let (response, body) = common::send(common::create_test_app(), common::get("/health/database")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body["configured"], false);
    assert_eq!(body["healthy"], false);
}

#[tokio::test]
async fn test_404_not_found() {
    let (response, body) = common::send(common::create_test_app(), common::get("/nonexistent/path")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_verify_token_requires_token() {
    let (response, body) = common::send(common::create_test_app(), common::get("/api/embed/verify-token")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Token is required");
}

#[tokio::test]
async fn test_verify_token_rejects_garbage() {
    let (response, _) = common::send(
        common::create_test_app(),
        common::get("/api/embed/verify-token?token=not-a-jwt"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_verify_token_round_trip_via_query_and_body() {
    let issued = embed::issue(common::EMBED_SECRET, &subject(), Duration::hours(1), Utc::now()).unwrap();
    let encoded = urlencoding::encode(&issued.token).into_owned();

    let (response, body) = common::send(
        common::create_test_app(),
        common::get(&format!("/api/embed/verify-token?token={encoded}")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body.get("success").is_none());
    assert_eq!(body["valid"], true);
    assert_eq!(body["user"]["userId"], Uuid::from_u128(42).to_string());
    assert_eq!(body["user"]["permissions"], json!(["read"]));
    assert!(body["expiresAt"].is_string());

    let (response, body) = common::send(
        common::create_test_app(),
        common::post_json("/api/embed/verify-token", json!({ "token": issued.token })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["user"]["email"], "learner@example.com");
}

#[tokio::test]
async fn test_verify_token_rejects_expired() {
    let issued_at = Utc::now() - Duration::days(2);
    let issued = embed::issue(common::EMBED_SECRET, &subject(), Duration::days(1), issued_at).unwrap();

    let (response, _) = common::send(
        common::create_test_app(),
        common::post_json("/api/embed/verify-token", json!({ "token": issued.token })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_verify_token_rejects_other_secret() {
    let issued = embed::issue("some-other-secret", &subject(), Duration::hours(1), Utc::now()).unwrap();

    let (response, _) = common::send(
        common::create_test_app(),
        common::post_json("/api/embed/verify-token", json!({ "token": issued.token })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_verify_token_without_secret_is_server_error() {
    let app = common::create_app_with(Config::default());
    let (response, _) = common::send(app, common::get("/api/embed/verify-token?token=a.b.c")).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_embed_dashboard_needs_valid_token_before_database() {
    let (response, _) = common::send(
        common::create_test_app(),
        common::get("/api/embed/dashboard?token=bogus"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let issued = embed::issue(common::EMBED_SECRET, &subject(), Duration::hours(1), Utc::now()).unwrap();
    let (response, body) = common::send(
        common::create_test_app(),
        common::get(&format!("/api/embed/dashboard?token={}", urlencoding::encode(&issued.token))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["message"], "Database is not configured");
}

#[tokio::test]
async fn test_generate_token_rejects_foreign_user() {
    let (response, _) = common::send(
        common::create_test_app(),
        common::post_json(
            "/api/embed/generate-token",
            json!({ "userId": Uuid::from_u128(99).to_string() }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

fn raw_json_post(uri: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_generate_token_rejects_malformed_body() {
    let (response, body) = common::send(
        common::create_test_app(),
        raw_json_post("/api/embed/generate-token", "{\"duration\": "),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_generate_token_accepts_empty_body() {
    // Parsing succeeds, so the request reaches the profile lookup.
    let (response, body) = common::send(
        common::create_test_app(),
        raw_json_post("/api/embed/generate-token", ""),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn test_generate_token_requires_session() {
    let (response, body) = common::send(
        common::create_strict_app(),
        common::post_json("/api/embed/generate-token", json!({})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_dashboard_unauthorized_without_token() {
    let (response, _) = common::send(common::create_strict_app(), common::get("/api/dashboard/xp")).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_heatmap_days_validated_before_database() {
    let (response, body) = common::send(
        common::create_test_app(),
        common::get("/api/dashboard/heatmap?days=400"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let (response, _) = common::send(
        common::create_test_app(),
        common::get("/api/dashboard/heatmap?days=30"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_xp_rejects_unknown_period() {
    let (response, _) = common::send(
        common::create_test_app(),
        common::get("/api/dashboard/xp?period=hourly"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_session_without_database_returns_null_profile() {
    let (response, body) = common::send(
        common::create_test_app(),
        common::post_json("/api/auth/session", json!({})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body["data"]["user"]["email"], "local@localhost");
    assert!(body["data"]["profile"].is_null());
}

#[tokio::test]
async fn test_french_learning_rejects_invalid_id() {
    let app = common::create_test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/french-learning/not-a-uuid")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_quotes_daily_validates_date() {
    let (response, _) = common::send(
        common::create_test_app(),
        common::get("/api/quotes/daily?date=2026/04/02"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_quote_diagnostics_gated_by_secret() {
    let (response, _) = common::send(common::create_test_app(), common::get("/api/test/quotes")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let app = common::create_app_with(Config {
        cron_secret: Some("cron-secret".to_string()),
        ..Config::default()
    });
    let request = Request::builder()
        .uri("/api/test/quotes")
        .header("authorization", "Bearer wrong")
        .body(Body::empty())
        .unwrap();
    let (response, _) = common::send(app, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_french_learning_rejects_malformed_json() {
    let (response, body) = common::send(
        common::create_test_app(),
        raw_json_post("/api/french-learning", "{not json"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_french_learning_rejects_unparseable_limit() {
    let (response, body) = common::send(
        common::create_test_app(),
        common::get("/api/french-learning?limit=abc"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}
