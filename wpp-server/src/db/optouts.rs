//! Opt-out registry

use sqlx::PgPool;

pub async fn upsert(pool: &PgPool, phone: &str, reason: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO wpp_optouts (phone, reason, created_at) VALUES ($1, $2, $3)
         ON CONFLICT (phone) DO UPDATE SET reason = EXCLUDED.reason, created_at = EXCLUDED.created_at",
    )
    .bind(phone)
    .bind(reason)
    .bind(shared::util::now_millis())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn is_opted_out(pool: &PgPool, phone: &str) -> Result<bool, sqlx::Error> {
    let found: Option<(String,)> = sqlx::query_as("SELECT phone FROM wpp_optouts WHERE phone = $1")
        .bind(phone)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}
