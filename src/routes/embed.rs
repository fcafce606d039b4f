use axum::extract::State;
use axum::middleware;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db::operations::{activity, profiles};
use crate::embed::{self, EmbedError, EmbedSubject, EmbedViewer};
use crate::middleware::auth::require_auth;
use crate::response::{ApiQuery, AppError, OptionalJson};
use crate::services::aggregation::{self, Overview, Period};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateTokenRequest {
    user_id: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateTokenResponse {
    token: String,
    embed_url: String,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenParams {
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbedDashboardQuery {
    token: Option<String>,
    period: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyTokenResponse {
    valid: bool,
    user: EmbedViewer,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedDashboardResponse {
    viewer: EmbedViewer,
    overview: Overview,
}

pub fn router(state: AppState) -> Router<AppState> {
    let issuing = Router::new()
        .route("/generate-token", post(generate_token))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/verify-token", get(verify_token_query).post(verify_token_body))
        .route("/dashboard", get(embed_dashboard))
        .merge(issuing)
}

async fn generate_token(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    OptionalJson(body): OptionalJson<GenerateTokenRequest>,
) -> Result<Json<GenerateTokenResponse>, AppError> {
    let request = body.unwrap_or_default();

    if let Some(target) = request.user_id.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        if Uuid::parse_str(target).ok() != Some(user.id) {
            return Err(AppError::forbidden("Embed tokens can only be issued for your own account"));
        }
    }

    let proxy = state.require_db()?;
    let profile = profiles::get_profile(&proxy, user.id)
        .await
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found("User profile not found"))?;

    let secret = state
        .config()
        .embed_secret
        .as_deref()
        .ok_or(EmbedError::MissingSecret)?;

    let lifetime = request
        .duration
        .as_deref()
        .map(embed::parse_duration)
        .unwrap_or_else(embed::default_lifetime);

    let subject = EmbedSubject {
        user_id: user.id,
        email: user.email.clone(),
        full_name: profile.display_name.clone().or_else(|| user.full_name.clone()),
    };

    let issued = embed::issue(secret, &subject, lifetime, Utc::now())?;

    tracing::info!(
        user_id = %user.id,
        token = %crate::auth::token_fingerprint(&issued.token),
        expires_at = %issued.expires_at,
        "embed token issued"
    );

    Ok(Json(GenerateTokenResponse {
        embed_url: embed::embed_url(&state.config().app_url, &issued.token),
        token: issued.token,
        user_id: user.id,
        expires_at: issued.expires_at,
    }))
}

async fn verify_token_query(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<TokenParams>,
) -> Result<Json<VerifyTokenResponse>, AppError> {
    verify_token(&state, params.token.as_deref())
}

async fn verify_token_body(
    State(state): State<AppState>,
    OptionalJson(body): OptionalJson<TokenParams>,
) -> Result<Json<VerifyTokenResponse>, AppError> {
    let params = body.unwrap_or_default();
    verify_token(&state, params.token.as_deref())
}

fn verify_token(
    state: &AppState,
    token: Option<&str>,
) -> Result<Json<VerifyTokenResponse>, AppError> {
    let viewer = verify_viewer(state, token)?;
    Ok(Json(VerifyTokenResponse {
        valid: true,
        expires_at: viewer.expires_at,
        user: viewer,
    }))
}

fn verify_viewer(state: &AppState, token: Option<&str>) -> Result<EmbedViewer, AppError> {
    let token = token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::bad_request("Token is required"))?;

    let secret = state
        .config()
        .embed_secret
        .as_deref()
        .ok_or(EmbedError::MissingSecret)?;

    embed::verify(secret, token, Utc::now()).map_err(|err| {
        tracing::debug!(
            token = %crate::auth::token_fingerprint(token),
            reason = %err,
            "embed token rejected"
        );
        AppError::from(err)
    })
}

async fn embed_dashboard(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<EmbedDashboardQuery>,
) -> Result<Json<EmbedDashboardResponse>, AppError> {
    let viewer = verify_viewer(&state, query.token.as_deref())?;
    let period = super::dashboard::parse_period(query.period.as_deref())?;

    let user_id = Uuid::parse_str(&viewer.user_id)
        .map_err(|_| AppError::unauthorized("Token does not identify a known user"))?;

    let proxy = state.require_db()?;
    let today = Utc::now().date_naive();
    let rows = activity::list_activity_between(
        &proxy,
        user_id,
        Period::Yearly.window_start(today),
        today,
        None,
    )
    .await
    .map_err(AppError::database)?;

    Ok(Json(EmbedDashboardResponse {
        overview: aggregation::overview(&rows, today, period),
        viewer,
    }))
}
