use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::db::DatabaseProxy;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            display_name: row.try_get("display_name")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

pub async fn get_profile(
    proxy: &DatabaseProxy,
    user_id: Uuid,
) -> Result<Option<UserProfile>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, display_name, created_at, updated_at
        FROM user_profiles
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(proxy.pool())
    .await?;

    row.as_ref().map(UserProfile::from_row).transpose()
}

/// Creates the profile row on first sync; an existing row is left untouched.
pub async fn insert_profile_if_missing(
    proxy: &DatabaseProxy,
    user_id: Uuid,
    display_name: Option<&str>,
) -> Result<UserProfile, sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO user_profiles (id, display_name, created_at, updated_at)
        VALUES ($1, $2, NOW(), NOW())
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(display_name)
    .execute(proxy.pool())
    .await?;

    get_profile(proxy, user_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

pub async fn update_display_name(
    proxy: &DatabaseProxy,
    user_id: Uuid,
    display_name: &str,
) -> Result<Option<UserProfile>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        UPDATE user_profiles
        SET display_name = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING id, display_name, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(display_name)
    .fetch_optional(proxy.pool())
    .await?;

    row.as_ref().map(UserProfile::from_row).transpose()
}
