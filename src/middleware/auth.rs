use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::auth::{AuthError, AuthUser};
use crate::response::AppError;
use crate::state::AppState;

/// Resolves the Supabase user behind the request's bearer token.
pub async fn resolve_user(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, AppError> {
    if state.config().local_mode {
        return Ok(crate::auth::local_user());
    }

    let Some(token) = crate::auth::extract_bearer(headers) else {
        return Err(AppError::unauthorized("Missing or invalid authorization header"));
    };

    match state.supabase().verify(&token).await {
        Ok(user) => Ok(user),
        Err(AuthError::NotConfigured) => Err(AppError::internal("supabase auth is not configured")),
        Err(AuthError::InvalidToken) | Err(AuthError::MissingToken) => {
            tracing::debug!(token = %crate::auth::token_fingerprint(&token), "rejected session token");
            Err(AppError::unauthorized("Invalid or expired session"))
        }
        Err(err) => {
            tracing::warn!(error = %err, "session verification failed upstream");
            Err(AppError::internal(format!("session verification failed: {err}")))
        }
    }
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match resolve_user(&state, req.headers()).await {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(err) => err.into_response(),
    }
}
