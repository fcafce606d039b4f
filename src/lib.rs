pub mod auth;
pub mod config;
pub mod db;
pub mod embed;
pub mod logging;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;

use std::sync::Arc;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::db::DatabaseProxy;
use crate::state::AppState;

/// Router with the request tracing and CORS layers every deployment uses.
pub fn build_app(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Builds the app from the environment, running without a database when
/// `DATABASE_URL` is absent or unreachable.
pub async fn create_app(config: Config) -> axum::Router {
    let db_proxy = connect_database().await;
    build_app(AppState::new(config, db_proxy))
}

pub async fn connect_database() -> Option<Arc<DatabaseProxy>> {
    match DatabaseProxy::from_env().await {
        Ok(proxy) => Some(proxy),
        Err(err) => {
            tracing::warn!(error = %err, "database proxy not initialized");
            None
        }
    }
}
