use std::future::Future;
use std::time::Duration;

use crate::auth::AuthUser;
use crate::db::operations::profiles;
use crate::db::operations::UserProfile;
use crate::db::DatabaseProxy;

pub const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY: Duration = Duration::from_millis(200);

/// Runs `op` up to `max_attempts` times, doubling the delay after each failure.
pub async fn retry_with_backoff<T, E, F, Fut>(
    max_attempts: u32,
    base_delay: Duration,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_attempts => {
                let delay = base_delay * 2u32.pow(attempt - 1);
                tracing::warn!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Lazily creates the caller's `user_profiles` row. Returns `None` once all
/// attempts have failed.
pub async fn ensure_profile(proxy: &DatabaseProxy, user: &AuthUser) -> Option<UserProfile> {
    let display_name = user
        .full_name
        .clone()
        .or_else(|| user.email.split('@').next().map(str::to_string))
        .filter(|name| !name.is_empty());

    let result = retry_with_backoff(MAX_ATTEMPTS, BASE_DELAY, |_| {
        profiles::insert_profile_if_missing(proxy, user.id, display_name.as_deref())
    })
    .await;

    match result {
        Ok(profile) => Some(profile),
        Err(err) => {
            tracing::error!(user_id = %user.id, error = %err, "profile sync gave up");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, String> = retry_with_backoff(3, Duration::from_millis(1), |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(format!("attempt {attempt} failed"))
                } else {
                    Ok("profile")
                }
            }
        })
        .await;
        assert_eq!(result, Ok("profile"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = retry_with_backoff(3, Duration::from_millis(1), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("connection reset".to_string()) }
        })
        .await;
        assert_eq!(result, Err("connection reset".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn first_success_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<u8, String> = retry_with_backoff(3, Duration::from_millis(1), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(7) }
        })
        .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
