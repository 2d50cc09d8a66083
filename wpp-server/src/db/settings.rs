//! Key/value settings

use std::collections::HashMap;

use shared::models::Setting;
use sqlx::PgPool;

pub async fn get(pool: &PgPool, context: &str, name: &str) -> Result<Option<String>, sqlx::Error> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT value FROM settings WHERE context = $1 AND name = $2")
            .bind(context)
            .bind(name)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(|(v,)| v))
}

/// All settings of a context, keyed by name
pub async fn get_context(
    pool: &PgPool,
    context: &str,
) -> Result<HashMap<String, String>, sqlx::Error> {
    let rows: Vec<Setting> = sqlx::query_as(
        "SELECT context, name, value, updated_at FROM settings WHERE context = $1",
    )
    .bind(context)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|s| (s.name, s.value)).collect())
}

pub async fn upsert(pool: &PgPool, context: &str, name: &str, value: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO settings (context, name, value, updated_at) VALUES ($1, $2, $3, $4)
         ON CONFLICT (context, name) DO UPDATE SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at",
    )
    .bind(context)
    .bind(name)
    .bind(value)
    .bind(shared::util::now_millis())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete(pool: &PgPool, context: &str, name: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM settings WHERE context = $1 AND name = $2")
        .bind(context)
        .bind(name)
        .execute(pool)
        .await?;
    Ok(())
}
