use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db::operations::{french, FrenchSession, FrenchSessionPatch, NewFrenchSession};
use crate::response::{ApiJson, ApiQuery, AppError};
use crate::services::french_stats::{self, FrenchStats};
use crate::state::AppState;

use super::SuccessResponse;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;
const MAX_MINUTES: i32 = 24 * 60;
const MAX_MOOD_LEN: usize = 50;
const MAX_NOTES_LEN: usize = 5000;

#[derive(Debug, Deserialize)]
struct ListQuery {
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionPayload {
    activity_type: Option<String>,
    duration_minutes: Option<i32>,
    total_time: Option<i32>,
    new_vocabulary: Option<Vec<String>>,
    practice_sentences: Option<Vec<String>>,
    mood: Option<String>,
    notes: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeletedResponse {
    id: Uuid,
    deleted: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sessions).post(create_session))
        .route("/stats", get(stats))
        .route("/:id", axum::routing::put(update_session).delete(delete_session))
}

async fn list_sessions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<SuccessResponse<Vec<FrenchSession>>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let proxy = state.require_db()?;

    let sessions = french::list_sessions(&proxy, user.id, limit)
        .await
        .map_err(AppError::database)?;

    Ok(Json(SuccessResponse::new(sessions)))
}

async fn create_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<SessionPayload>,
) -> Result<(StatusCode, Json<SuccessResponse<FrenchSession>>), AppError> {
    let session = validate_new(payload)?;
    let proxy = state.require_db()?;

    let created = french::insert_session(&proxy, user.id, &session)
        .await
        .map_err(AppError::database)?;

    tracing::info!(user_id = %user.id, session_id = %created.id, "french session created");

    Ok((StatusCode::CREATED, Json(SuccessResponse::new(created))))
}

async fn update_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<SessionPayload>,
) -> Result<Json<SuccessResponse<FrenchSession>>, AppError> {
    let id = parse_id(&id)?;
    let patch = validate_patch(payload)?;
    let proxy = state.require_db()?;

    let updated = french::update_session(&proxy, user.id, id, &patch)
        .await
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found("Session not found"))?;

    Ok(Json(SuccessResponse::new(updated)))
}

async fn delete_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse<DeletedResponse>>, AppError> {
    let id = parse_id(&id)?;
    let proxy = state.require_db()?;

    let deleted = french::delete_session(&proxy, user.id, id)
        .await
        .map_err(AppError::database)?;
    if !deleted {
        return Err(AppError::not_found("Session not found"));
    }

    Ok(Json(SuccessResponse::new(DeletedResponse { id, deleted })))
}

async fn stats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SuccessResponse<FrenchStats>>, AppError> {
    let proxy = state.require_db()?;

    let sessions = french::list_sessions(&proxy, user.id, i64::MAX)
        .await
        .map_err(AppError::database)?;

    Ok(Json(SuccessResponse::new(french_stats::summarize(&sessions))))
}

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::validation("id must be a UUID"))
}

fn validate_new(payload: SessionPayload) -> Result<NewFrenchSession, AppError> {
    let activity_type = payload
        .activity_type
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation("activityType is required"))?
        .to_string();

    let duration_minutes = payload.duration_minutes.unwrap_or(0);
    validate_minutes("durationMinutes", Some(duration_minutes))?;
    validate_minutes("totalTime", payload.total_time)?;
    validate_text("mood", payload.mood.as_deref(), MAX_MOOD_LEN)?;
    validate_text("notes", payload.notes.as_deref(), MAX_NOTES_LEN)?;

    let date = match payload.date.as_deref() {
        Some(raw) => parse_date(raw)?,
        None => Utc::now().date_naive(),
    };

    Ok(NewFrenchSession {
        activity_type,
        duration_minutes,
        total_time: payload.total_time,
        new_vocabulary: clean_list(payload.new_vocabulary.unwrap_or_default()),
        practice_sentences: clean_list(payload.practice_sentences.unwrap_or_default()),
        mood: non_blank(payload.mood),
        notes: payload.notes,
        date,
    })
}

fn validate_patch(payload: SessionPayload) -> Result<FrenchSessionPatch, AppError> {
    let activity_type = match payload.activity_type.as_deref().map(str::trim) {
        Some("") => return Err(AppError::validation("activityType cannot be empty")),
        other => other.map(str::to_string),
    };

    validate_minutes("durationMinutes", payload.duration_minutes)?;
    validate_minutes("totalTime", payload.total_time)?;
    validate_text("mood", payload.mood.as_deref(), MAX_MOOD_LEN)?;
    validate_text("notes", payload.notes.as_deref(), MAX_NOTES_LEN)?;

    let date = payload.date.as_deref().map(parse_date).transpose()?;

    Ok(FrenchSessionPatch {
        activity_type,
        duration_minutes: payload.duration_minutes,
        total_time: payload.total_time,
        new_vocabulary: payload.new_vocabulary.map(clean_list),
        practice_sentences: payload.practice_sentences.map(clean_list),
        mood: non_blank(payload.mood),
        notes: payload.notes,
        date,
    })
}

fn validate_minutes(field: &str, value: Option<i32>) -> Result<(), AppError> {
    match value {
        Some(v) if !(0..=MAX_MINUTES).contains(&v) => Err(AppError::validation(format!(
            "{field} must be between 0 and {MAX_MINUTES}"
        ))),
        _ => Ok(()),
    }
}

fn validate_text(field: &str, value: Option<&str>, max_chars: usize) -> Result<(), AppError> {
    match value {
        Some(v) if v.chars().count() > max_chars => Err(AppError::validation(format!(
            "{field} must be at most {max_chars} characters"
        ))),
        _ => Ok(()),
    }
}

pub(super) fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    let raw = raw.trim();
    if raw.len() != 10 {
        return Err(AppError::validation("date must be formatted as YYYY-MM-DD"));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::validation("date must be formatted as YYYY-MM-DD"))
}

/// Trims, mapping a blank value to `None` so an update keeps the stored one.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
