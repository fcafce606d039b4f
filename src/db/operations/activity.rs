use chrono::NaiveDate;
use serde::Serialize;
use sqlx::Row;
use uuid::Uuid;

use crate::db::DatabaseProxy;

/// One `duolingo_activity` row, reduced to the columns the dashboard aggregates.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRow {
    pub date: NaiveDate,
    pub language: String,
    pub xp_gained: i64,
    pub lessons_completed: i64,
    pub time_spent_minutes: i64,
    pub streak_count: i64,
    pub level: Option<i64>,
}

/// Rows dated `since..=until`, optionally for a single language.
pub async fn list_activity_between(
    proxy: &DatabaseProxy,
    user_id: Uuid,
    since: NaiveDate,
    until: NaiveDate,
    language: Option<&str>,
) -> Result<Vec<ActivityRow>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT
          date,
          COALESCE(language, '') AS language,
          COALESCE(xp_gained, 0)::bigint AS xp_gained,
          COALESCE(lessons_completed, 0)::bigint AS lessons_completed,
          COALESCE(time_spent_minutes, 0)::bigint AS time_spent_minutes,
          COALESCE(streak_count, 0)::bigint AS streak_count,
          level::bigint AS level
        FROM duolingo_activity
        WHERE user_id = $1
          AND date >= $2
          AND date <= $3
          AND ($4::text IS NULL OR LOWER(language) = LOWER($4))
        ORDER BY date ASC
        "#,
    )
    .bind(user_id)
    .bind(since)
    .bind(until)
    .bind(language)
    .fetch_all(proxy.pool())
    .await?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(ActivityRow {
            date: row.try_get("date")?,
            language: row.try_get("language")?,
            xp_gained: row.try_get("xp_gained")?,
            lessons_completed: row.try_get("lessons_completed")?,
            time_spent_minutes: row.try_get("time_spent_minutes")?,
            streak_count: row.try_get("streak_count")?,
            level: row.try_get("level")?,
        });
    }
    Ok(out)
}
