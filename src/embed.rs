//! Read-only embed tokens for showing a learner's dashboard inside third-party
//! pages (Notion and similar).
//!
//! Tokens are compact HS256 JWTs. The payload carries the learner identity and
//! a fixed `["read"]` permission set; verification never trusts anything that
//! is not covered by the signature.

use axum::http::StatusCode;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

use crate::response::{json_error, AppError};

type HmacSha256 = Hmac<Sha256>;

pub const TOKEN_TYPE: &str = "embed";
pub const READ_PERMISSION: &str = "read";
pub const DEFAULT_LIFETIME_DAYS: i64 = 7;
const MAX_LIFETIME_SECONDS: i64 = 100 * 365 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embed signing secret is not configured")]
    MissingSecret,
    #[error("token is malformed")]
    Malformed,
    #[error("unsupported token algorithm")]
    UnsupportedAlgorithm,
    #[error("token signature is invalid")]
    BadSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is not yet valid")]
    NotYetValid,
    #[error("token does not identify a user")]
    MissingUserId,
    #[error("token is not an embed token")]
    WrongType,
    #[error("token does not grant read access")]
    MissingPermission,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl EmbedError {
    pub fn status(&self) -> StatusCode {
        match self {
            EmbedError::Malformed
            | EmbedError::UnsupportedAlgorithm
            | EmbedError::BadSignature
            | EmbedError::Expired
            | EmbedError::NotYetValid
            | EmbedError::MissingUserId => StatusCode::UNAUTHORIZED,
            EmbedError::WrongType | EmbedError::MissingPermission => StatusCode::FORBIDDEN,
            EmbedError::MissingSecret | EmbedError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<EmbedError> for AppError {
    fn from(err: EmbedError) -> Self {
        match err.status() {
            StatusCode::UNAUTHORIZED => json_error(StatusCode::UNAUTHORIZED, "INVALID_TOKEN", err.to_string()),
            StatusCode::FORBIDDEN => json_error(StatusCode::FORBIDDEN, "FORBIDDEN", err.to_string()),
            _ => AppError::internal(err.to_string()),
        }
    }
}

/// Identity baked into an issued token.
#[derive(Debug, Clone)]
pub struct EmbedSubject {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Sanitized view of a verified token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedViewer {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub permissions: Vec<String>,
    #[serde(skip)]
    pub expires_at: DateTime<Utc>,
}

/// Parses `^\d+[smhd]$`; anything else falls back to seven days.
pub fn parse_duration(value: &str) -> Duration {
    parse_duration_strict(value).unwrap_or_else(default_lifetime)
}

pub fn default_lifetime() -> Duration {
    Duration::days(DEFAULT_LIFETIME_DAYS)
}

fn parse_duration_strict(value: &str) -> Option<Duration> {
    let unit = value.chars().last()?;
    let digits = &value[..value.len() - unit.len_utf8()];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let amount: i64 = digits.parse().ok()?;
    if amount == 0 {
        return None;
    }

    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 60 * 60,
        'd' => 24 * 60 * 60,
        _ => return None,
    };

    let seconds = amount.checked_mul(multiplier)?;
    if seconds > MAX_LIFETIME_SECONDS {
        return None;
    }
    Some(Duration::seconds(seconds))
}

pub fn issue(
    secret: &str,
    subject: &EmbedSubject,
    lifetime: Duration,
    now: DateTime<Utc>,
) -> Result<IssuedToken, EmbedError> {
    let expires_at = now
        .checked_add_signed(lifetime)
        .ok_or_else(|| EmbedError::Signing("expiration out of range".to_string()))?;

    let header_json = serde_json::json!({
        "alg": "HS256",
        "typ": "JWT",
    });

    let payload_json = serde_json::json!({
        "userId": subject.user_id.to_string(),
        "email": subject.email,
        "fullName": subject.full_name,
        "permissions": [READ_PERMISSION],
        "type": TOKEN_TYPE,
        "createdAt": now.to_rfc3339_opts(SecondsFormat::Millis, true),
        "iat": now.timestamp(),
        "exp": expires_at.timestamp(),
    });

    let header_bytes = serde_json::to_vec(&header_json).map_err(|e| EmbedError::Signing(e.to_string()))?;
    let payload_bytes = serde_json::to_vec(&payload_json).map_err(|e| EmbedError::Signing(e.to_string()))?;
    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_bytes),
        URL_SAFE_NO_PAD.encode(payload_bytes)
    );

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| EmbedError::Signing(e.to_string()))?;
    mac.update(signing_input.as_bytes());
    let sig_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(IssuedToken {
        token: format!("{signing_input}.{sig_b64}"),
        issued_at: now,
        expires_at,
    })
}

pub fn verify(secret: &str, token: &str, now: DateTime<Utc>) -> Result<EmbedViewer, EmbedError> {
    let mut parts = token.trim().split('.');
    let header_b64 = parts.next().ok_or(EmbedError::Malformed)?;
    let payload_b64 = parts.next().ok_or(EmbedError::Malformed)?;
    let sig_b64 = parts.next().ok_or(EmbedError::Malformed)?;
    if parts.next().is_some() {
        return Err(EmbedError::Malformed);
    }

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header_b64.as_bytes())
        .map_err(|_| EmbedError::Malformed)?;
    let header_json: serde_json::Value =
        serde_json::from_slice(&header_bytes).map_err(|_| EmbedError::Malformed)?;
    let alg = header_json
        .get("alg")
        .and_then(|value| value.as_str())
        .ok_or(EmbedError::Malformed)?;
    if alg != "HS256" {
        return Err(EmbedError::UnsupportedAlgorithm);
    }

    let sig_bytes = URL_SAFE_NO_PAD
        .decode(sig_b64.as_bytes())
        .map_err(|_| EmbedError::Malformed)?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| EmbedError::BadSignature)?;
    mac.update(format!("{header_b64}.{payload_b64}").as_bytes());
    mac.verify_slice(&sig_bytes)
        .map_err(|_| EmbedError::BadSignature)?;

    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload_b64.as_bytes())
        .map_err(|_| EmbedError::Malformed)?;
    let payload: serde_json::Value =
        serde_json::from_slice(&payload_bytes).map_err(|_| EmbedError::Malformed)?;

    let exp = payload
        .get("exp")
        .and_then(|value| value.as_i64())
        .ok_or(EmbedError::Malformed)?;
    if now.timestamp() >= exp {
        return Err(EmbedError::Expired);
    }
    if let Some(nbf) = payload.get("nbf").and_then(|value| value.as_i64()) {
        if now.timestamp() < nbf {
            return Err(EmbedError::NotYetValid);
        }
    }

    let user_id = payload
        .get("userId")
        .and_then(|value| value.as_str())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(EmbedError::MissingUserId)?
        .to_string();

    if let Some(token_type) = payload.get("type") {
        if token_type.as_str() != Some(TOKEN_TYPE) {
            return Err(EmbedError::WrongType);
        }
    }

    let permissions = match payload.get("permissions") {
        Some(value) => {
            let list: Vec<String> = value
                .as_array()
                .ok_or(EmbedError::MissingPermission)?
                .iter()
                .filter_map(|p| p.as_str().map(str::to_string))
                .collect();
            if !list.iter().any(|p| p == READ_PERMISSION) {
                return Err(EmbedError::MissingPermission);
            }
            list
        }
        None => vec![READ_PERMISSION.to_string()],
    };

    let expires_at = Utc
        .timestamp_opt(exp, 0)
        .single()
        .ok_or(EmbedError::Malformed)?;

    Ok(EmbedViewer {
        user_id,
        email: string_claim(&payload, "email"),
        full_name: string_claim(&payload, "fullName"),
        permissions,
        expires_at,
    })
}

pub fn embed_url(app_url: &str, token: &str) -> String {
    format!(
        "{}/embed?token={}",
        app_url.trim_end_matches('/'),
        urlencoding::encode(token)
    )
}

fn string_claim(payload: &serde_json::Value, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(|value| value.as_str())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SECRET: &str = "embed-test-secret";

    fn subject() -> EmbedSubject {
        EmbedSubject {
            user_id: Uuid::parse_str("6f1c1a6e-2f7e-4c5d-9a55-0d6c3c1f0b2a").unwrap(),
            email: "learner@example.com".to_string(),
            full_name: Some("Camille Martin".to_string()),
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap()
    }

    /// Signs an arbitrary payload the same way `issue` does.
    fn sign_raw(header: serde_json::Value, payload: serde_json::Value, secret: &str) -> String {
        let input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).unwrap()),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload).unwrap())
        );
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(input.as_bytes());
        format!("{input}.{}", URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn issued_token_verifies_with_same_user() {
        let now = fixed_now();
        let issued = issue(SECRET, &subject(), parse_duration("2h"), now).unwrap();
        assert_eq!(issued.expires_at - now, Duration::hours(2));

        let viewer = verify(SECRET, &issued.token, now + Duration::minutes(5)).unwrap();
        assert_eq!(viewer.user_id, subject().user_id.to_string());
        assert_eq!(viewer.email.as_deref(), Some("learner@example.com"));
        assert_eq!(viewer.full_name.as_deref(), Some("Camille Martin"));
        assert_eq!(viewer.permissions, vec!["read".to_string()]);
        assert_eq!(viewer.expires_at, issued.expires_at);
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = fixed_now();
        let issued = issue(SECRET, &subject(), Duration::seconds(30), now).unwrap();
        let err = verify(SECRET, &issued.token, now + Duration::seconds(30)).unwrap_err();
        assert!(matches!(err, EmbedError::Expired));
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn other_secret_is_rejected() {
        let now = fixed_now();
        let issued = issue(SECRET, &subject(), default_lifetime(), now).unwrap();
        let err = verify("another-secret", &issued.token, now).unwrap_err();
        assert!(matches!(err, EmbedError::BadSignature));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let now = fixed_now();
        let issued = issue(SECRET, &subject(), default_lifetime(), now).unwrap();
        let forged = URL_SAFE_NO_PAD.encode(br#"{"userId":"someone-else","exp":9999999999}"#);
        let mut parts: Vec<&str> = issued.token.split('.').collect();
        parts[1] = &forged;
        let err = verify(SECRET, &parts.join("."), now).unwrap_err();
        assert!(matches!(err, EmbedError::BadSignature));
    }

    #[test]
    fn only_hs256_is_accepted() {
        let token = sign_raw(
            serde_json::json!({ "alg": "HS512", "typ": "JWT" }),
            serde_json::json!({ "userId": "u1", "exp": fixed_now().timestamp() + 60 }),
            SECRET,
        );
        assert!(matches!(
            verify(SECRET, &token, fixed_now()),
            Err(EmbedError::UnsupportedAlgorithm)
        ));

        let none_alg = sign_raw(
            serde_json::json!({ "alg": "none" }),
            serde_json::json!({ "userId": "u1", "exp": fixed_now().timestamp() + 60 }),
            SECRET,
        );
        assert!(verify(SECRET, &none_alg, fixed_now()).is_err());
    }

    #[test]
    fn wrong_type_is_forbidden() {
        let token = sign_raw(
            serde_json::json!({ "alg": "HS256", "typ": "JWT" }),
            serde_json::json!({ "userId": "u1", "type": "session", "exp": fixed_now().timestamp() + 60 }),
            SECRET,
        );
        let err = verify(SECRET, &token, fixed_now()).unwrap_err();
        assert!(matches!(err, EmbedError::WrongType));
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn missing_read_permission_is_forbidden() {
        let token = sign_raw(
            serde_json::json!({ "alg": "HS256" }),
            serde_json::json!({ "userId": "u1", "permissions": ["write"], "exp": fixed_now().timestamp() + 60 }),
            SECRET,
        );
        assert!(matches!(
            verify(SECRET, &token, fixed_now()),
            Err(EmbedError::MissingPermission)
        ));
    }

    #[test]
    fn untyped_token_with_user_is_accepted() {
        let token = sign_raw(
            serde_json::json!({ "alg": "HS256" }),
            serde_json::json!({ "userId": "u1", "exp": fixed_now().timestamp() + 60 }),
            SECRET,
        );
        let viewer = verify(SECRET, &token, fixed_now()).unwrap();
        assert_eq!(viewer.user_id, "u1");
        assert_eq!(viewer.permissions, vec!["read".to_string()]);
    }

    #[test]
    fn missing_user_id_is_unauthorized() {
        let token = sign_raw(
            serde_json::json!({ "alg": "HS256" }),
            serde_json::json!({ "userId": "", "type": "embed", "exp": fixed_now().timestamp() + 60 }),
            SECRET,
        );
        let err = verify(SECRET, &token, fixed_now()).unwrap_err();
        assert!(matches!(err, EmbedError::MissingUserId));
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn garbage_is_malformed() {
        for token in ["", "abc", "a.b", "a.b.c.d", "!!.??.**"] {
            assert!(verify(SECRET, token, fixed_now()).is_err(), "{token}");
        }
    }

    #[test]
    fn duration_units() {
        assert_eq!(parse_duration("45s"), Duration::seconds(45));
        assert_eq!(parse_duration("15m"), Duration::minutes(15));
        assert_eq!(parse_duration("12h"), Duration::hours(12));
        assert_eq!(parse_duration("30d"), Duration::days(30));
    }

    #[test]
    fn invalid_durations_fall_back_to_seven_days() {
        for raw in ["", "d", "7", "7w", "-1d", "1.5h", " 7d", "7d ", "0d", "99999999999999999999d", "7D"] {
            assert_eq!(parse_duration(raw), Duration::days(7), "{raw:?}");
        }
    }

    #[test]
    fn embed_url_encodes_token() {
        assert_eq!(
            embed_url("https://progress.example.com/", "a.b+c"),
            "https://progress.example.com/embed?token=a.b%2Bc"
        );
    }

    proptest! {
        #[test]
        fn non_matching_durations_fall_back(raw in "\\PC*") {
            let bytes = raw.as_bytes();
            let strict = bytes.len() >= 2
                && bytes[..bytes.len() - 1].iter().all(|b| b.is_ascii_digit())
                && matches!(bytes[bytes.len() - 1], b's' | b'm' | b'h' | b'd');
            prop_assume!(!strict);
            prop_assert_eq!(parse_duration(&raw), Duration::days(7));
        }

        #[test]
        fn matching_durations_scale(amount in 1i64..30_000, unit in prop::sample::select(vec!['s', 'm', 'h', 'd'])) {
            let expected = match unit {
                's' => Duration::seconds(amount),
                'm' => Duration::minutes(amount),
                'h' => Duration::hours(amount),
                _ => Duration::days(amount),
            };
            prop_assert_eq!(parse_duration(&format!("{amount}{unit}")), expected);
        }
    }
}
