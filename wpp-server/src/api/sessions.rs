//! WhatsApp session management (WPPConnect)

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::error::{AppError, ErrorCode};
use shared::models::{Direction, SessionEvent, WppSession};

use crate::error::internal;
use crate::provider::ProviderError;
use crate::state::AppState;
use crate::validation::validate_session_key;
use crate::{db, session};

use super::ApiResult;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/sessions", get(list_sessions))
        .route("/api/admin/sessions/{key}", get(get_session))
        .route("/api/admin/sessions/{key}/start", post(start_session))
        .route("/api/admin/sessions/{key}/refresh", post(refresh_session))
        .route("/api/admin/sessions/{key}/qrcode", post(fetch_qrcode))
        .route("/api/admin/sessions/{key}/logout", post(logout_session))
        .route("/api/admin/sessions/{key}/send", post(send_message))
}

/// Stored session plus the provider's raw answer
#[derive(Debug, Serialize)]
pub struct SessionActionResult {
    pub session: WppSession,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub phone: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct QrCodeResult {
    pub session: String,
    pub qrcode: String,
}

pub async fn list_sessions(State(state): State<AppState>) -> ApiResult<Vec<WppSession>> {
    let sessions = db::sessions::list(&state.pool).await.map_err(internal)?;
    Ok(Json(sessions))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<WppSession> {
    validate_session_key(&key)?;
    let session = db::sessions::find(&state.pool, &key)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            AppError::new(ErrorCode::SessionNotFound).with_detail("session", key.as_str())
        })?;
    Ok(Json(session))
}

/// Record a provider failure on the session before returning it
async fn record_failure(state: &AppState, key: &str, err: ProviderError) -> AppError {
    tracing::warn!(session = key, error = %err, "WPPConnect call failed");
    if let Err(e) = session::record_event(
        &state.pool,
        key,
        SessionEvent::Failed,
        None,
        Some(err.to_string()),
    )
    .await
    {
        tracing::error!(error = %e, session = key, "Failed to store session error");
    }
    err.into()
}

pub async fn start_session(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<SessionActionResult> {
    validate_session_key(&key)?;
    session::record_event(&state.pool, &key, SessionEvent::Start, None, None)
        .await
        .map_err(internal)?;

    let snapshot = match state.wpp.start_session(&key).await {
        Ok(s) => s,
        Err(e) => return Err(record_failure(&state, &key, e).await),
    };
    let event = match (snapshot.event, &snapshot.qrcode) {
        (Some(event), _) => event,
        (None, Some(_)) => SessionEvent::QrIssued,
        (None, None) => SessionEvent::Start,
    };
    let stored = session::record_event(&state.pool, &key, event, snapshot.qrcode, None)
        .await
        .map_err(internal)?;
    Ok(Json(SessionActionResult {
        session: stored,
        provider: Some(snapshot.raw),
    }))
}

pub async fn refresh_session(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<SessionActionResult> {
    validate_session_key(&key)?;
    let snapshot = match state.wpp.status(&key).await {
        Ok(s) => s,
        Err(e) => return Err(record_failure(&state, &key, e).await),
    };

    let stored = match snapshot.event {
        Some(event) => session::record_event(&state.pool, &key, event, snapshot.qrcode, None)
            .await
            .map_err(internal)?,
        None => {
            tracing::debug!(session = %key, "Unrecognized status answer, keeping stored state");
            db::sessions::find(&state.pool, &key)
                .await
                .map_err(internal)?
                .ok_or_else(|| AppError::new(ErrorCode::SessionNotFound))?
        }
    };
    Ok(Json(SessionActionResult {
        session: stored,
        provider: Some(snapshot.raw),
    }))
}

pub async fn fetch_qrcode(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<QrCodeResult> {
    validate_session_key(&key)?;
    let qrcode = state.wpp.qrcode(&key).await?;
    session::record_event(
        &state.pool,
        &key,
        SessionEvent::QrIssued,
        Some(qrcode.clone()),
        None,
    )
    .await
    .map_err(internal)?;
    Ok(Json(QrCodeResult {
        session: key,
        qrcode,
    }))
}

pub async fn logout_session(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<SessionActionResult> {
    validate_session_key(&key)?;
    let raw = state.wpp.logout(&key).await?;
    let stored = session::record_event(&state.pool, &key, SessionEvent::LoggedOut, None, None)
        .await
        .map_err(internal)?;
    Ok(Json(SessionActionResult {
        session: stored,
        provider: Some(raw),
    }))
}

pub async fn send_message(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<SendRequest>,
) -> ApiResult<Value> {
    validate_session_key(&key)?;
    let result = state
        .wpp
        .send_message(&key, &req.phone, &req.message)
        .await?;

    if let Some(phone) = shared::phone::normalize_phone(&req.phone)
        && let Err(e) = db::engagement::touch(
            &state.pool,
            &phone,
            Direction::Outbound,
            shared::util::now_millis(),
        )
        .await
    {
        tracing::error!(error = %e, "Failed to update engagement after send");
    }
    tracing::info!(session = %key, "Admin message sent");
    Ok(Json(result))
}
