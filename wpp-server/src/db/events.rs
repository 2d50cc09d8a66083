//! Raw webhook audit trail

use sqlx::PgPool;

pub struct NewEvent<'a> {
    pub provider: &'a str,
    pub session_key: Option<&'a str>,
    pub event_type: &'a str,
    pub phone: Option<&'a str>,
    pub direction: Option<&'a str>,
    /// Serialized payload, already truncated for storage
    pub payload: &'a str,
}

pub async fn insert(pool: &PgPool, event: &NewEvent<'_>) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO wpp_events (id, provider, session_key, event_type, phone, direction, payload, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(shared::util::snowflake_id())
    .bind(event.provider)
    .bind(event.session_key)
    .bind(event.event_type)
    .bind(event.phone)
    .bind(event.direction)
    .bind(event.payload)
    .bind(shared::util::now_millis())
    .execute(pool)
    .await?;
    Ok(())
}
