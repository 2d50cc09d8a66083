//! WPPConnect webhook
//!
//! POST /api/wpp/webhook: messages and session status callbacks.
//! Everything after authentication and JSON parsing is best effort: the
//! provider always gets an ACK so it does not retry.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderValue, header::ALLOW};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router, middleware};
use serde::Deserialize;
use serde_json::{Value, json};
use shared::error::{AppError, ErrorCode};
use shared::models::{Direction, InboundMessage, SessionEvent, WebhookEvent};

use crate::auth::rate_limit::wpp_webhook_rate_limit;
use crate::auth::webhook_secret::webhook_secret_middleware;
use crate::db;
use crate::responder::{OPT_OUT_REASON, is_opt_out_keyword};
use crate::state::AppState;
use crate::webhook::normalize_wppconnect;
use crate::{crm, session};

const PROVIDER: &str = "wppconnect";
const CRM_SOURCE: &str = "wppconnect-webhook";

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new().route(
        "/api/wpp/webhook",
        post(handle_webhook)
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                webhook_secret_middleware,
            ))
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                wpp_webhook_rate_limit,
            ))
            .fallback(method_not_allowed),
    )
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookQuery {
    pub session: Option<String>,
}

fn ack() -> Response {
    Json(json!({ "ok": true })).into_response()
}

pub async fn method_not_allowed() -> Response {
    let mut response = AppError::new(ErrorCode::MethodNotAllowed).into_response();
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static("POST"));
    response
}

pub async fn handle_webhook(
    State(state): State<AppState>,
    Query(query): Query<WebhookQuery>,
    body: Bytes,
) -> Response {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(%e, "Failed to parse WPPConnect webhook JSON");
            return AppError::with_message(ErrorCode::InvalidFormat, "Invalid JSON body")
                .into_response();
        }
    };

    let session_hint = query
        .session
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(&state.config.wpp_default_session);

    let event = normalize_wppconnect(session_hint, &payload);
    let raw_event = payload
        .get("event")
        .and_then(Value::as_str)
        .unwrap_or("");
    tracing::info!(
        kind = event.kind(),
        event = raw_event,
        "Received WPPConnect webhook"
    );

    match &event {
        WebhookEvent::Message(message) => process_message(&state, message, &payload).await,
        WebhookEvent::Status {
            session,
            event,
            qrcode,
        } => process_status(&state, session, *event, qrcode.clone(), &payload).await,
        WebhookEvent::Ignored { reason } => {
            tracing::debug!(reason = %reason, "WPPConnect webhook ignored");
        }
    }

    ack()
}

async fn process_message(state: &AppState, message: &InboundMessage, payload: &Value) {
    match state.responder.handle(message).await {
        Ok(outcome) => tracing::debug!(?outcome, "Auto-responder finished"),
        Err(e) => {
            let e = AppError::from(e);
            tracing::warn!(code = ?e.code, message = %e.message, "Auto-responder failed");
        }
    }

    let direction = message.direction();
    let phone = message.counterpart();

    super::audit(
        state,
        PROVIDER,
        Some(&message.session),
        "message",
        phone,
        Some(direction),
        payload,
    )
    .await;

    let Some(phone) = phone else {
        return;
    };

    if let Err(e) =
        db::engagement::touch(&state.pool, phone, direction, shared::util::now_millis()).await
    {
        tracing::error!(error = %e, phone, "Failed to update engagement");
    }

    if direction == Direction::Inbound && message.text().is_some_and(is_opt_out_keyword) {
        match db::optouts::upsert(&state.pool, phone, OPT_OUT_REASON).await {
            Ok(()) => tracing::info!(phone, "Contact opted out"),
            Err(e) => tracing::error!(error = %e, phone, "Failed to record opt-out"),
        }
    }

    let name = match direction {
        Direction::Inbound => message.contact_name.as_deref(),
        Direction::Outbound => None,
    };
    if let Err(e) = crm::sync_contact(
        &state.pool,
        phone,
        name,
        crm::event_type(direction),
        CRM_SOURCE,
        payload,
    )
    .await
    {
        tracing::error!(error = %e, phone, "CRM sync failed");
    }
}

async fn process_status(
    state: &AppState,
    session_key: &str,
    event: SessionEvent,
    qrcode: Option<String>,
    payload: &Value,
) {
    super::audit(state, PROVIDER, Some(session_key), "status", None, None, payload).await;

    let last_error = (event == SessionEvent::Failed)
        .then(|| {
            ["status", "state", "event"]
                .iter()
                .find_map(|k| payload.get(*k).and_then(Value::as_str))
                .map(str::to_string)
        })
        .flatten();

    if let Err(e) = session::record_event(
        &state.pool,
        session_key,
        event,
        qrcode,
        last_error,
    )
    .await
    {
        tracing::error!(error = %e, session = session_key, "Failed to store session status");
    }
}
