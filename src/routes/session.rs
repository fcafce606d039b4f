use axum::extract::State;
use axum::routing::post;
use axum::{Extension, Json, Router};
use serde::Serialize;

use crate::auth::AuthUser;
use crate::db::operations::UserProfile;
use crate::response::AppError;
use crate::services::profile_sync;
use crate::state::AppState;

use super::SuccessResponse;

#[derive(Debug, Serialize)]
struct SessionResponse {
    user: AuthUser,
    profile: Option<UserProfile>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/session", post(session))
}

/// Confirms the caller's session and lazily provisions their profile row.
async fn session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SuccessResponse<SessionResponse>>, AppError> {
    let profile = match state.db_proxy() {
        Some(proxy) => profile_sync::ensure_profile(&proxy, &user).await,
        None => {
            tracing::debug!(user_id = %user.id, "no database, skipping profile sync");
            None
        }
    };

    Ok(Json(SuccessResponse::new(SessionResponse { user, profile })))
}
