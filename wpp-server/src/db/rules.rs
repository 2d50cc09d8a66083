//! Auto-response rule CRUD

use shared::models::{AutoResponseRule, RuleCreate, RuleUpdate};
use sqlx::PgPool;

use crate::error::BoxError;

const COLUMNS: &str = "id, label, trigger, is_regex, response, priority, is_active, \
                       active_from, active_to, created_at, updated_at";

/// Default priority for rules created without one
pub const DEFAULT_PRIORITY: i32 = 100;

pub async fn list(pool: &PgPool) -> Result<Vec<AutoResponseRule>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM bot_auto_response_rules ORDER BY priority, id"
    ))
    .fetch_all(pool)
    .await
}

pub async fn list_active(pool: &PgPool) -> Result<Vec<AutoResponseRule>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM bot_auto_response_rules WHERE is_active = TRUE ORDER BY priority, id"
    ))
    .fetch_all(pool)
    .await
}

pub async fn find(pool: &PgPool, id: i64) -> Result<Option<AutoResponseRule>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM bot_auto_response_rules WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn create(pool: &PgPool, data: &RuleCreate) -> Result<AutoResponseRule, sqlx::Error> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query_as(&format!(
        r#"
        INSERT INTO bot_auto_response_rules
            (id, label, trigger, is_regex, response, priority, is_active,
             active_from, active_to, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(data.label.trim())
    .bind(data.trigger.trim())
    .bind(data.is_regex)
    .bind(&data.response)
    .bind(data.priority.unwrap_or(DEFAULT_PRIORITY))
    .bind(data.is_active.unwrap_or(true))
    .bind(data.active_from)
    .bind(data.active_to)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn update(
    pool: &PgPool,
    id: i64,
    data: &RuleUpdate,
) -> Result<AutoResponseRule, BoxError> {
    let now = shared::util::now_millis();
    let row: Option<AutoResponseRule> = sqlx::query_as(&format!(
        r#"
        UPDATE bot_auto_response_rules SET
            label = COALESCE($1, label),
            trigger = COALESCE($2, trigger),
            is_regex = COALESCE($3, is_regex),
            response = COALESCE($4, response),
            priority = COALESCE($5, priority),
            is_active = COALESCE($6, is_active),
            active_from = CASE WHEN $9 THEN NULL ELSE COALESCE($7, active_from) END,
            active_to = CASE WHEN $9 THEN NULL ELSE COALESCE($8, active_to) END,
            updated_at = $10
        WHERE id = $11
        RETURNING {COLUMNS}
        "#
    ))
    .bind(data.label.as_deref().map(str::trim))
    .bind(data.trigger.as_deref().map(str::trim))
    .bind(data.is_regex)
    .bind(&data.response)
    .bind(data.priority)
    .bind(data.is_active)
    .bind(data.active_from)
    .bind(data.active_to)
    .bind(data.clear_window)
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.ok_or_else(|| "Rule not found".into())
}

/// Returns `false` when no row matched
pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let rows = sqlx::query("DELETE FROM bot_auto_response_rules WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(rows > 0)
}
