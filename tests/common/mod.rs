#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use progresspath_backend::config::Config;
use progresspath_backend::state::AppState;

pub const EMBED_SECRET: &str = "integration-embed-secret";

/// App without a database, acting as the local user.
pub fn create_test_app() -> Router {
    create_app_with(Config {
        embed_secret: Some(EMBED_SECRET.to_string()),
        local_mode: true,
        ..Config::default()
    })
}

/// App that requires a real Supabase session on protected routes.
pub fn create_strict_app() -> Router {
    create_app_with(Config {
        embed_secret: Some(EMBED_SECRET.to_string()),
        ..Config::default()
    })
}

pub fn create_app_with(config: Config) -> Router {
    progresspath_backend::build_app(AppState::new(config, None))
}

pub async fn send(app: Router, request: Request<Body>) -> (Response<Body>, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let (parts, body) = response.into_parts();
    let bytes = body.collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (Response::from_parts(parts, Body::empty()), json)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
