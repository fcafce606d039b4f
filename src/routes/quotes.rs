use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::db::operations::{quotes, DailyQuote};
use crate::response::{ApiQuery, AppError};
use crate::state::AppState;

use super::SuccessResponse;

#[derive(Debug, Deserialize)]
struct DailyQuery {
    language: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuoteDiagnostics {
    total_quotes: i64,
    latest_day_id: Option<String>,
    today: String,
    has_today: bool,
    today_quotes: Vec<DailyQuote>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/daily", get(daily))
}

pub fn test_router() -> Router<AppState> {
    Router::new().route("/quotes", get(diagnostics))
}

async fn daily(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DailyQuery>,
) -> Result<Json<SuccessResponse<DailyQuote>>, AppError> {
    let day_id = match query.date.as_deref() {
        Some(raw) => super::french_learning::parse_date(raw)?
            .format("%Y-%m-%d")
            .to_string(),
        None => today_id(),
    };
    let language = query
        .language
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let proxy = state.require_db()?;

    let quote = quotes::quotes_for_day(&proxy, &day_id, language)
        .await
        .map_err(AppError::database)?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::not_found(format!("No quote available for {day_id}")))?;

    Ok(Json(SuccessResponse::new(quote)))
}

async fn diagnostics(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse<QuoteDiagnostics>>, AppError> {
    authorize_automation(&state, &headers)?;
    let proxy = state.require_db()?;

    let today = today_id();
    let total_quotes = quotes::count_quotes(&proxy)
        .await
        .map_err(AppError::database)?;
    let latest_day_id = quotes::latest_day_id(&proxy)
        .await
        .map_err(AppError::database)?;
    let today_quotes = quotes::quotes_for_day(&proxy, &today, None)
        .await
        .map_err(AppError::database)?;

    Ok(Json(SuccessResponse::new(QuoteDiagnostics {
        total_quotes,
        latest_day_id,
        has_today: !today_quotes.is_empty(),
        today,
        today_quotes,
    })))
}

fn authorize_automation(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let secrets = state.config().automation_secrets();
    if secrets.is_empty() {
        return Err(AppError::internal("no CRON_SECRET or TEST_SECRET configured"));
    }

    let Some(presented) = crate::auth::extract_bearer(headers) else {
        return Err(AppError::unauthorized("Unauthorized"));
    };

    if secrets.iter().any(|secret| secrets_match(secret, &presented)) {
        Ok(())
    } else {
        tracing::warn!(
            token = %crate::auth::token_fingerprint(&presented),
            "rejected automation secret"
        );
        Err(AppError::unauthorized("Unauthorized"))
    }
}

type HmacSha256 = Hmac<Sha256>;

const SECRET_CHECK_LABEL: &[u8] = b"progresspath-automation";

/// Tags a fixed label with each secret and compares the tags in constant time.
fn secrets_match(expected: &str, presented: &str) -> bool {
    let Ok(mut presented_mac) = HmacSha256::new_from_slice(presented.as_bytes()) else {
        return false;
    };
    presented_mac.update(SECRET_CHECK_LABEL);
    let presented_tag = presented_mac.finalize().into_bytes();

    let Ok(mut expected_mac) = HmacSha256::new_from_slice(expected.as_bytes()) else {
        return false;
    };
    expected_mac.update(SECRET_CHECK_LABEL);
    expected_mac.verify_slice(&presented_tag).is_ok()
}

fn today_id() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}
