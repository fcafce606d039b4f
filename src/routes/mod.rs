mod dashboard;
mod embed;
mod french_learning;
mod health;
mod profile;
mod quotes;
mod session;

use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde::Serialize;

use crate::middleware::auth::require_auth;
use crate::response::json_error;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub(crate) struct SuccessResponse<T> {
    success: bool,
    data: T,
}

impl<T> SuccessResponse<T> {
    pub(crate) fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let auth_layer = || middleware::from_fn_with_state(state.clone(), require_auth);

    let mut app = Router::new()
        .nest("/api/embed", embed::router(state.clone()))
        .nest("/api/dashboard", dashboard::router().route_layer(auth_layer()))
        .nest("/api/auth", session::router().route_layer(auth_layer()))
        .nest("/api/profile", profile::router().route_layer(auth_layer()))
        .nest(
            "/api/french-learning",
            french_learning::router().route_layer(auth_layer()),
        )
        .nest("/api/quotes", quotes::router())
        .nest("/api/test", quotes::test_router());

    for path in ["/health", "/api/health"] {
        app = app.nest(path, health::router());
    }

    app.fallback(fallback_handler).with_state(state)
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "Route not found").into_response()
}
