//! Session status bookkeeping
//!
//! Folds provider events into the stored session row.

use shared::models::{SessionEvent, SessionStatus, SessionWrite, WppSession};
use sqlx::PgPool;

use crate::db;

/// Compute the row to write after `event`
///
/// The QR code is kept only while the session waits for a scan; errors are
/// kept only in the `error` state.
pub fn next_write(
    session_key: &str,
    current: Option<&WppSession>,
    event: SessionEvent,
    qrcode: Option<String>,
    last_error: Option<String>,
    now: i64,
) -> SessionWrite {
    let from = current.map(|s| s.status).unwrap_or_default();
    let status = from.apply(event);
    let qrcode = match status {
        SessionStatus::Qrcode => qrcode.or_else(|| current.and_then(|s| s.qrcode.clone())),
        _ => None,
    };
    let last_error = match status {
        SessionStatus::Error => last_error.or_else(|| current.and_then(|s| s.last_error.clone())),
        _ => None,
    };
    // Never write a timestamp behind the stored one for our own transitions
    let updated_at = current.map_or(now, |s| now.max(s.updated_at));
    SessionWrite {
        session_key: session_key.to_string(),
        status,
        qrcode,
        last_error,
        updated_at,
    }
}

/// Apply an event to the stored session and return the resulting row
pub async fn record_event(
    pool: &PgPool,
    session_key: &str,
    event: SessionEvent,
    qrcode: Option<String>,
    last_error: Option<String>,
) -> Result<WppSession, sqlx::Error> {
    let current = db::sessions::find(pool, session_key).await?;
    let write = next_write(
        session_key,
        current.as_ref(),
        event,
        qrcode,
        last_error,
        shared::util::now_millis(),
    );
    let applied = db::sessions::upsert(pool, &write).await?;
    if applied {
        tracing::info!(
            session = session_key,
            status = write.status.as_db(),
            ?event,
            "Session status updated"
        );
    } else {
        tracing::debug!(session = session_key, "Stale session write ignored");
    }
    let stored = db::sessions::find(pool, session_key).await?;
    Ok(stored.unwrap_or(WppSession {
        session_key: write.session_key,
        status: write.status,
        qrcode: write.qrcode,
        last_error: write.last_error,
        version: 1,
        updated_at: write.updated_at,
    }))
}
