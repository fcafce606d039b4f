use axum::extract::State;
use axum::routing::get;
use axum::{Extension, Json, Router};
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::db::operations::activity;
use crate::response::{ApiQuery, AppError};
use crate::services::aggregation::{
    self, HeatmapCell, Overview, Period, StreakInfo, XpPoint, DEFAULT_HEATMAP_DAYS,
    MAX_HEATMAP_DAYS,
};
use crate::state::AppState;

use super::SuccessResponse;

#[derive(Debug, Deserialize)]
struct XpQuery {
    period: Option<String>,
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HeatmapQuery {
    days: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OverviewQuery {
    period: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreakQuery {
    language: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct XpResponse {
    period: Period,
    start_date: NaiveDate,
    end_date: NaiveDate,
    total_xp: i64,
    series: Vec<XpPoint>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HeatmapResponse {
    days: i64,
    cells: Vec<HeatmapCell>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/xp", get(xp))
        .route("/heatmap", get(heatmap))
        .route("/overview", get(overview))
        .route("/streak", get(streak))
}

pub(super) fn parse_period(raw: Option<&str>) -> Result<Period, AppError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(Period::default()),
        Some(value) => Period::parse(value).ok_or_else(|| {
            AppError::validation("period must be one of daily, weekly, monthly, yearly")
        }),
    }
}

fn parse_heatmap_days(raw: Option<&str>) -> Result<i64, AppError> {
    let Some(value) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(DEFAULT_HEATMAP_DAYS);
    };
    match value.parse::<i64>() {
        Ok(days) if (1..=MAX_HEATMAP_DAYS).contains(&days) => Ok(days),
        _ => Err(AppError::validation(format!(
            "days must be an integer between 1 and {MAX_HEATMAP_DAYS}"
        ))),
    }
}

fn normalize_language(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
        .map(str::to_lowercase)
}

async fn xp(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<XpQuery>,
) -> Result<Json<SuccessResponse<XpResponse>>, AppError> {
    let period = parse_period(query.period.as_deref())?;
    let language = normalize_language(query.language.as_deref());
    let proxy = state.require_db()?;

    let today = Utc::now().date_naive();
    let start_date = period.window_start(today);
    let rows = activity::list_activity_between(&proxy, user.id, start_date, today, language.as_deref())
        .await
        .map_err(AppError::database)?;
    let rows = aggregation::within(&rows, start_date, today);

    tracing::debug!(user_id = %user.id, ?period, rows = rows.len(), "xp series");

    Ok(Json(SuccessResponse::new(XpResponse {
        period,
        start_date,
        end_date: today,
        total_xp: aggregation::total_xp(&rows),
        series: aggregation::daily_xp(&rows),
    })))
}

async fn heatmap(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<HeatmapQuery>,
) -> Result<Json<SuccessResponse<HeatmapResponse>>, AppError> {
    let days = parse_heatmap_days(query.days.as_deref())?;
    let proxy = state.require_db()?;

    let today = Utc::now().date_naive();
    let since = today - Duration::days(days - 1);
    let rows = activity::list_activity_between(&proxy, user.id, since, today, None)
        .await
        .map_err(AppError::database)?;

    Ok(Json(SuccessResponse::new(HeatmapResponse {
        days,
        cells: aggregation::heatmap(&rows, today, days),
    })))
}

async fn overview(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<OverviewQuery>,
) -> Result<Json<SuccessResponse<Overview>>, AppError> {
    let period = parse_period(query.period.as_deref())?;
    let proxy = state.require_db()?;

    let today = Utc::now().date_naive();
    let rows = activity::list_activity_between(
        &proxy,
        user.id,
        Period::Yearly.window_start(today),
        today,
        None,
    )
    .await
    .map_err(AppError::database)?;

    Ok(Json(SuccessResponse::new(aggregation::overview(&rows, today, period))))
}

async fn streak(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<StreakQuery>,
) -> Result<Json<SuccessResponse<StreakInfo>>, AppError> {
    let language = normalize_language(query.language.as_deref());
    let proxy = state.require_db()?;

    let today = Utc::now().date_naive();
    let rows = activity::list_activity_between(
        &proxy,
        user.id,
        Period::Yearly.window_start(today),
        today,
        language.as_deref(),
    )
    .await
    .map_err(AppError::database)?;

    Ok(Json(SuccessResponse::new(aggregation::streak_info(&rows, today))))
}
