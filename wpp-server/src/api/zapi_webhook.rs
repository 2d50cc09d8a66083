//! Z-API webhooks
//!
//! POST /webhooks/zapi/received, POST /webhooks/zapi/disconnected.
//! Z-API retries on non-2xx, so even unreadable bodies are ACKed.

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::post;
use axum::{Json, Router, middleware};
use serde_json::{Value, json};
use shared::models::WebhookEvent;

use crate::auth::rate_limit::zapi_webhook_rate_limit;
use crate::state::AppState;
use crate::webhook::{LOG_PREVIEW_BYTES, ZapiEventKind, normalize_zapi, payload_preview};
use crate::{crm, session};

const PROVIDER: &str = "zapi";
const CRM_SOURCE: &str = "zapi-webhook";
/// Session name when neither payload nor config names the instance
const FALLBACK_SESSION: &str = "zapi";
pub const MAX_BODY_BYTES: usize = 256 * 1024;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/webhooks/zapi/received", post(received))
        .route("/webhooks/zapi/disconnected", post(disconnected))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            zapi_webhook_rate_limit,
        ))
}

pub async fn received(State(state): State<AppState>, body: Bytes) -> Json<Value> {
    handle(&state, ZapiEventKind::Received, &body).await
}

pub async fn disconnected(State(state): State<AppState>, body: Bytes) -> Json<Value> {
    handle(&state, ZapiEventKind::Disconnected, &body).await
}

async fn handle(state: &AppState, kind: ZapiEventKind, body: &[u8]) -> Json<Value> {
    let payload: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(%e, event = kind.as_str(), bytes = body.len(), "Invalid Z-API webhook JSON");
            return Json(json!({ "ok": true, "ignored": "invalid json" }));
        }
    };

    let normalized = normalize_zapi(kind, &payload);
    tracing::info!(
        event = kind.as_str(),
        phone = normalized.phone.as_deref().unwrap_or(""),
        instance = normalized.instance_id.as_deref().unwrap_or(""),
        message_type = normalized.message_type.as_deref().unwrap_or(""),
        payload = %payload_preview(&payload, LOG_PREVIEW_BYTES),
        "Received Z-API webhook"
    );

    let session = normalized
        .instance_id
        .clone()
        .or_else(|| state.config.zapi_instance_id.clone())
        .unwrap_or_else(|| FALLBACK_SESSION.to_string());

    match normalized.into_event(&session, shared::util::now_millis()) {
        WebhookEvent::Message(message) => {
            let direction = message.direction();
            let phone = message.from.as_deref();
            super::audit(
                state,
                PROVIDER,
                Some(&session),
                "message",
                phone,
                Some(direction),
                &payload,
            )
            .await;

            let Some(phone) = phone else {
                return Json(json!({ "ok": true, "event": kind, "crm": null }));
            };
            let name = message.contact_name.as_deref().filter(|_| !message.from_me);
            let sync = match crm::sync_contact(
                &state.pool,
                phone,
                name,
                crm::event_type(direction),
                CRM_SOURCE,
                &payload,
            )
            .await
            {
                Ok(sync) => sync,
                Err(e) => {
                    tracing::error!(error = %e, phone, "Z-API CRM sync failed");
                    None
                }
            };
            Json(json!({ "ok": true, "event": kind, "crm": sync }))
        }
        WebhookEvent::Status {
            session: instance,
            event,
            ..
        } => {
            super::audit(state, PROVIDER, Some(&instance), "status", None, None, &payload).await;
            tracing::warn!(instance = %instance, "Z-API instance disconnected");
            if let Err(e) = session::record_event(&state.pool, &instance, event, None, None).await {
                tracing::error!(error = %e, instance = %instance, "Failed to store Z-API status");
            }
            Json(json!({ "ok": true, "event": kind }))
        }
        WebhookEvent::Ignored { reason } => Json(json!({ "ok": true, "ignored": reason })),
    }
}
