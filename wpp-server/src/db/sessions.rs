//! WhatsApp session persistence

use shared::models::{SessionStatus, SessionWrite, WppSession};
use sqlx::PgPool;

#[derive(sqlx::FromRow)]
struct SessionRow {
    session_key: String,
    status: String,
    qrcode: Option<String>,
    last_error: Option<String>,
    version: i64,
    updated_at: i64,
}

impl From<SessionRow> for WppSession {
    fn from(row: SessionRow) -> Self {
        let status = SessionStatus::from_db(&row.status).unwrap_or_else(|| {
            tracing::warn!(session = %row.session_key, status = %row.status, "Unknown stored session status");
            SessionStatus::Error
        });
        WppSession {
            session_key: row.session_key,
            status,
            qrcode: row.qrcode,
            last_error: row.last_error,
            version: row.version,
            updated_at: row.updated_at,
        }
    }
}

pub async fn list(pool: &PgPool) -> Result<Vec<WppSession>, sqlx::Error> {
    let rows: Vec<SessionRow> = sqlx::query_as(
        "SELECT session_key, status, qrcode, last_error, version, updated_at
         FROM wpp_sessions ORDER BY session_key",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn find(pool: &PgPool, session_key: &str) -> Result<Option<WppSession>, sqlx::Error> {
    let row: Option<SessionRow> = sqlx::query_as(
        "SELECT session_key, status, qrcode, last_error, version, updated_at
         FROM wpp_sessions WHERE session_key = $1",
    )
    .bind(session_key)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Into::into))
}

/// Optimistic upsert: a write older than the stored row is dropped.
/// Returns `true` when the write was applied.
pub async fn upsert(pool: &PgPool, write: &SessionWrite) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO wpp_sessions (session_key, status, qrcode, last_error, version, updated_at)
        VALUES ($1, $2, $3, $4, 1, $5)
        ON CONFLICT (session_key)
        DO UPDATE SET status = EXCLUDED.status, qrcode = EXCLUDED.qrcode,
                      last_error = EXCLUDED.last_error,
                      version = wpp_sessions.version + 1,
                      updated_at = EXCLUDED.updated_at
        WHERE wpp_sessions.updated_at <= EXCLUDED.updated_at
        "#,
    )
    .bind(&write.session_key)
    .bind(write.status.as_db())
    .bind(&write.qrcode)
    .bind(&write.last_error)
    .bind(write.updated_at)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
