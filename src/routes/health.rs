use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

const SERVICE_NAME: &str = "progresspath-backend";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/info", get(info))
        .route("/live", get(live))
        .route("/database", get(database))
}

async fn root(State(state): State<AppState>) -> Response {
    let db_status = database_check(&state).await;
    let ok = matches!(db_status, DbCheckStatus::Connected);

    let response = HealthResponse {
        status: if ok { "ok" } else { "degraded" },
        database: match db_status {
            DbCheckStatus::Connected => "connected",
            DbCheckStatus::Timeout => "timeout",
            DbCheckStatus::Disconnected => "disconnected",
        },
        timestamp: now_iso(),
    };

    let status_code = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(response)).into_response()
}

async fn info(State(state): State<AppState>) -> Response {
    let response = HealthInfoResponse {
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        environment: std::env::var("APP_ENV")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "development".to_string()),
        local_mode: state.config().local_mode,
        start_time: system_time_iso(state.started_at_system()),
        uptime: state.uptime_seconds(),
    };

    Json(response).into_response()
}

async fn live(State(state): State<AppState>) -> Response {
    let response = LivenessResponse {
        status: "healthy",
        timestamp: now_iso(),
        uptime: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION"),
    };

    Json(response).into_response()
}

async fn database(State(state): State<AppState>) -> Response {
    let Some(proxy) = state.db_proxy() else {
        let response = DatabaseStatusResponse {
            configured: false,
            healthy: false,
            degraded: false,
            latency: None,
            consecutive_failures: 0,
            last_error: None,
            checked_at: None,
        };
        return (StatusCode::OK, Json(response)).into_response();
    };

    let snapshot = proxy.health_status().await;
    let response = DatabaseStatusResponse {
        configured: true,
        healthy: snapshot.healthy,
        degraded: snapshot.degraded,
        latency: snapshot.latency_ms,
        consecutive_failures: snapshot.consecutive_failures,
        last_error: snapshot.error,
        checked_at: snapshot.timestamp_ms.map(unix_ms_to_iso),
    };

    (StatusCode::OK, Json(response)).into_response()
}

#[derive(Debug)]
enum DbCheckStatus {
    Connected,
    Timeout,
    Disconnected,
}

async fn database_check(state: &AppState) -> DbCheckStatus {
    let Some(proxy) = state.db_proxy() else {
        return DbCheckStatus::Disconnected;
    };

    let snapshot = proxy.health_status().await;
    if snapshot.healthy {
        return DbCheckStatus::Connected;
    }

    // The monitor may not have ticked yet right after startup.
    if snapshot.timestamp_ms.is_none() {
        let probe = proxy.ping().await;
        if probe.healthy {
            return DbCheckStatus::Connected;
        }
        if probe.error.as_deref() == Some("timeout") {
            return DbCheckStatus::Timeout;
        }
        return DbCheckStatus::Disconnected;
    }

    if snapshot.error.as_deref() == Some("timeout") {
        tracing::debug!("database health probe timed out");
        return DbCheckStatus::Timeout;
    }
    DbCheckStatus::Disconnected
}

fn system_time_iso(time: std::time::SystemTime) -> String {
    let datetime: chrono::DateTime<chrono::Utc> = time.into();
    datetime.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn unix_ms_to_iso(ms: u64) -> String {
    system_time_iso(std::time::UNIX_EPOCH + std::time::Duration::from_millis(ms))
}

fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
    timestamp: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthInfoResponse {
    service: &'static str,
    version: &'static str,
    environment: String,
    local_mode: bool,
    start_time: String,
    uptime: u64,
}

#[derive(Serialize)]
struct LivenessResponse {
    status: &'static str,
    timestamp: String,
    uptime: u64,
    version: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DatabaseStatusResponse {
    configured: bool,
    healthy: bool,
    degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency: Option<u64>,
    consecutive_failures: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    checked_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_millis_render_as_utc() {
        assert_eq!(unix_ms_to_iso(0), "1970-01-01T00:00:00.000Z");
        assert_eq!(unix_ms_to_iso(1_500), "1970-01-01T00:00:01.500Z");
    }
}
