use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::db::DatabaseProxy;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyQuote {
    pub id: String,
    pub quote: String,
    pub author: Option<String>,
    pub language: String,
    pub translation: Option<String>,
    pub day_id: String,
}

impl DailyQuote {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            quote: row.try_get("quote")?,
            author: row.try_get("author")?,
            language: row.try_get("language")?,
            translation: row.try_get("translation")?,
            day_id: row.try_get("day_id")?,
        })
    }
}

pub async fn quotes_for_day(
    proxy: &DatabaseProxy,
    day_id: &str,
    language: Option<&str>,
) -> Result<Vec<DailyQuote>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id::text AS id, quote, author, COALESCE(language, '') AS language, translation, day_id
        FROM daily_quotes
        WHERE day_id = $1
          AND ($2::text IS NULL OR LOWER(language) = LOWER($2))
        ORDER BY language ASC, id ASC
        "#,
    )
    .bind(day_id)
    .bind(language)
    .fetch_all(proxy.pool())
    .await?;

    rows.iter().map(DailyQuote::from_row).collect()
}

pub async fn count_quotes(proxy: &DatabaseProxy) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM daily_quotes")
        .fetch_one(proxy.pool())
        .await
}

pub async fn latest_day_id(proxy: &DatabaseProxy) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT MAX(day_id) FROM daily_quotes")
        .fetch_one(proxy.pool())
        .await
}
