use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::db::DatabaseProxy;

const SESSION_COLUMNS: &str = r#"
    id, user_id, activity_type,
    COALESCE(duration_minutes, 0)::int4 AS duration_minutes,
    total_time::int4 AS total_time,
    COALESCE(new_vocabulary, ARRAY[]::text[]) AS new_vocabulary,
    COALESCE(practice_sentences, ARRAY[]::text[]) AS practice_sentences,
    mood, notes, date, created_at
"#;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrenchSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub activity_type: String,
    pub duration_minutes: i32,
    pub total_time: Option<i32>,
    pub new_vocabulary: Vec<String>,
    pub practice_sentences: Vec<String>,
    pub mood: Option<String>,
    pub notes: Option<String>,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl FrenchSession {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            activity_type: row.try_get("activity_type")?,
            duration_minutes: row.try_get("duration_minutes")?,
            total_time: row.try_get("total_time")?,
            new_vocabulary: row.try_get("new_vocabulary")?,
            practice_sentences: row.try_get("practice_sentences")?,
            mood: row.try_get("mood")?,
            notes: row.try_get("notes")?,
            date: row.try_get("date")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewFrenchSession {
    pub activity_type: String,
    pub duration_minutes: i32,
    pub total_time: Option<i32>,
    pub new_vocabulary: Vec<String>,
    pub practice_sentences: Vec<String>,
    pub mood: Option<String>,
    pub notes: Option<String>,
    pub date: NaiveDate,
}

/// Fields left as `None` keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct FrenchSessionPatch {
    pub activity_type: Option<String>,
    pub duration_minutes: Option<i32>,
    pub total_time: Option<i32>,
    pub new_vocabulary: Option<Vec<String>>,
    pub practice_sentences: Option<Vec<String>>,
    pub mood: Option<String>,
    pub notes: Option<String>,
    pub date: Option<NaiveDate>,
}

pub async fn list_sessions(
    proxy: &DatabaseProxy,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<FrenchSession>, sqlx::Error> {
    let sql = format!(
        "SELECT {SESSION_COLUMNS} FROM french_learning WHERE user_id = $1 \
         ORDER BY date DESC, created_at DESC LIMIT $2"
    );
    let rows = sqlx::query(&sql)
        .bind(user_id)
        .bind(limit)
        .fetch_all(proxy.pool())
        .await?;

    rows.iter().map(FrenchSession::from_row).collect()
}

pub async fn insert_session(
    proxy: &DatabaseProxy,
    user_id: Uuid,
    session: &NewFrenchSession,
) -> Result<FrenchSession, sqlx::Error> {
    let sql = format!(
        "INSERT INTO french_learning \
           (id, user_id, activity_type, duration_minutes, total_time, new_vocabulary, \
            practice_sentences, mood, notes, date, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW()) \
         RETURNING {SESSION_COLUMNS}"
    );
    let row = sqlx::query(&sql)
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&session.activity_type)
        .bind(session.duration_minutes)
        .bind(session.total_time)
        .bind(&session.new_vocabulary)
        .bind(&session.practice_sentences)
        .bind(session.mood.as_deref())
        .bind(session.notes.as_deref())
        .bind(session.date)
        .fetch_one(proxy.pool())
        .await?;

    FrenchSession::from_row(&row)
}

pub async fn update_session(
    proxy: &DatabaseProxy,
    user_id: Uuid,
    id: Uuid,
    patch: &FrenchSessionPatch,
) -> Result<Option<FrenchSession>, sqlx::Error> {
    let sql = format!(
        "UPDATE french_learning SET \
           activity_type = COALESCE($3, activity_type), \
           duration_minutes = COALESCE($4, duration_minutes), \
           total_time = COALESCE($5, total_time), \
           new_vocabulary = COALESCE($6, new_vocabulary), \
           practice_sentences = COALESCE($7, practice_sentences), \
           mood = COALESCE($8, mood), \
           notes = COALESCE($9, notes), \
           date = COALESCE($10, date) \
         WHERE id = $1 AND user_id = $2 \
         RETURNING {SESSION_COLUMNS}"
    );
    let row = sqlx::query(&sql)
        .bind(id)
        .bind(user_id)
        .bind(patch.activity_type.as_deref())
        .bind(patch.duration_minutes)
        .bind(patch.total_time)
        .bind(patch.new_vocabulary.clone())
        .bind(patch.practice_sentences.clone())
        .bind(patch.mood.as_deref())
        .bind(patch.notes.as_deref())
        .bind(patch.date)
        .fetch_optional(proxy.pool())
        .await?;

    row.as_ref().map(FrenchSession::from_row).transpose()
}

pub async fn delete_session(
    proxy: &DatabaseProxy,
    user_id: Uuid,
    id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM french_learning WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(proxy.pool())
        .await?;
    Ok(result.rows_affected() > 0)
}
