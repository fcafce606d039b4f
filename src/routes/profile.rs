use axum::extract::State;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::db::operations::{profiles, UserProfile};
use crate::response::{ApiJson, AppError};
use crate::state::AppState;

use super::SuccessResponse;

const MAX_DISPLAY_NAME_LEN: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileRequest {
    display_name: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_profile).put(update_profile))
}

async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SuccessResponse<UserProfile>>, AppError> {
    let proxy = state.require_db()?;

    let profile = profiles::get_profile(&proxy, user.id)
        .await
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found("User profile not found"))?;

    Ok(Json(SuccessResponse::new(profile)))
}

async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<UpdateProfileRequest>,
) -> Result<Json<SuccessResponse<UserProfile>>, AppError> {
    let display_name = validate_display_name(payload.display_name.as_deref())?;
    let proxy = state.require_db()?;

    let profile = profiles::update_display_name(&proxy, user.id, &display_name)
        .await
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found("User profile not found"))?;

    tracing::info!(user_id = %user.id, "display name updated");

    Ok(Json(SuccessResponse::new(profile)))
}

fn validate_display_name(raw: Option<&str>) -> Result<String, AppError> {
    let name = raw.map(str::trim).unwrap_or_default();
    let len = name.chars().count();
    if len == 0 || len > MAX_DISPLAY_NAME_LEN {
        return Err(AppError::validation(format!(
            "displayName must be between 1 and {MAX_DISPLAY_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}
