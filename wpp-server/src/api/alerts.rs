//! Alert test and quick reply

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use crate::alerts::{AlertReport, QuickReplyRequest, QuickReplyResult};
use crate::state::AppState;

use super::ApiResult;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/alerts/test", post(send_test))
        .route("/api/admin/alerts/quick-reply", post(quick_reply))
}

#[derive(Debug, Default, Deserialize)]
pub struct AlertTestRequest {
    pub error: Option<String>,
}

/// Send the alert now, ignoring (and not arming) the cooldown
pub async fn send_test(
    State(state): State<AppState>,
    body: Option<Json<AlertTestRequest>>,
) -> ApiResult<AlertReport> {
    let error = body
        .and_then(|Json(b)| b.error)
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| "Teste manual de alerta".to_string());
    let report = state
        .alerts
        .notify(&state.config.public_menu_url, &error, true)
        .await;
    Ok(Json(report))
}

pub async fn quick_reply(
    State(state): State<AppState>,
    Json(req): Json<QuickReplyRequest>,
) -> ApiResult<QuickReplyResult> {
    let result = state.alerts.quick_reply(&req).await?;
    Ok(Json(result))
}
