use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing token")]
    MissingToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("supabase auth is not configured")]
    NotConfigured,
    #[error("auth request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("auth upstream returned HTTP {0}")]
    Upstream(reqwest::StatusCode),
}

pub fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Short digest for correlating a token in logs without exposing it.
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(digest)[..12].to_string()
}

pub fn local_user() -> AuthUser {
    AuthUser {
        id: Uuid::from_u128(1),
        email: "local@localhost".to_string(),
        full_name: Some("Local Learner".to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct SupabaseUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: serde_json::Value,
}

/// Validates Supabase access tokens against the GoTrue `/auth/v1/user` endpoint.
#[derive(Clone)]
pub struct SupabaseAuth {
    base_url: Option<String>,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl SupabaseAuth {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config
                .supabase_url
                .as_deref()
                .map(|url| url.trim_end_matches('/').to_string()),
            api_key: config.supabase_service_key.clone(),
            client: reqwest::Client::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some() && self.api_key.is_some()
    }

    pub async fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        let (Some(base_url), Some(api_key)) = (self.base_url.as_deref(), self.api_key.as_deref())
        else {
            return Err(AuthError::NotConfigured);
        };

        let response = self
            .client
            .get(format!("{base_url}/auth/v1/user"))
            .header("apikey", api_key)
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AuthError::InvalidToken);
        }
        if !status.is_success() {
            return Err(AuthError::Upstream(status));
        }

        let user: SupabaseUser = response.json().await?;
        Ok(AuthUser {
            id: user.id,
            email: user.email.unwrap_or_default(),
            full_name: metadata_full_name(&user.user_metadata),
        })
    }
}

fn metadata_full_name(metadata: &serde_json::Value) -> Option<String> {
    ["full_name", "name"]
        .iter()
        .filter_map(|key| metadata.get(*key).and_then(|v| v.as_str()))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}
