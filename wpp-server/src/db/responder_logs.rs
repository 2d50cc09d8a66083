//! Auto-responder decision log

use shared::models::ResponderLog;
use sqlx::PgPool;

pub struct NewResponderLog<'a> {
    pub session_key: &'a str,
    pub from_phone: &'a str,
    pub to_phone: Option<&'a str>,
    pub body: &'a str,
    pub matched_rule_id: Option<i64>,
    pub reply: Option<&'a str>,
    pub delivered: bool,
}

pub async fn insert(pool: &PgPool, log: &NewResponderLog<'_>) -> Result<i64, sqlx::Error> {
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO bot_auto_responder_logs
            (id, session_key, from_phone, to_phone, body, matched_rule_id, reply, delivered, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(id)
    .bind(log.session_key)
    .bind(log.from_phone)
    .bind(log.to_phone)
    .bind(log.body)
    .bind(log.matched_rule_id)
    .bind(log.reply)
    .bind(log.delivered)
    .bind(shared::util::now_millis())
    .execute(pool)
    .await?;
    Ok(id)
}

pub async fn list_recent(
    pool: &PgPool,
    session_key: Option<&str>,
    limit: i64,
) -> Result<Vec<ResponderLog>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, session_key, from_phone, to_phone, body, matched_rule_id, reply, delivered, created_at
         FROM bot_auto_responder_logs
         WHERE ($1::TEXT IS NULL OR session_key = $1)
         ORDER BY created_at DESC
         LIMIT $2",
    )
    .bind(session_key)
    .bind(limit)
    .fetch_all(pool)
    .await
}
