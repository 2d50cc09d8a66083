//! Bot switch, fallback reply and responder logs

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use shared::models::{BotSettings, ResponderLog};

use crate::db;
use crate::error::internal;
use crate::responder::{load_bot_settings, save_bot_settings};
use crate::state::AppState;
use crate::validation::{MAX_MESSAGE_LEN, validate_optional_text};

use super::ApiResult;

const DEFAULT_LOG_LIMIT: i64 = 50;
const MAX_LOG_LIMIT: i64 = 500;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/bot/settings", get(get_settings).put(update_settings))
        .route("/api/admin/responder/logs", get(list_logs))
}

pub async fn get_settings(State(state): State<AppState>) -> ApiResult<BotSettings> {
    let settings = load_bot_settings(&state.pool).await.map_err(internal)?;
    Ok(Json(settings))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Json(data): Json<BotSettings>,
) -> ApiResult<BotSettings> {
    validate_optional_text(&data.fallback_reply, "fallback_reply", MAX_MESSAGE_LEN)?;
    save_bot_settings(&state.pool, &data)
        .await
        .map_err(internal)?;
    tracing::info!(enabled = data.enabled, "Bot settings updated");
    let settings = load_bot_settings(&state.pool).await.map_err(internal)?;
    Ok(Json(settings))
}

#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    pub session: Option<String>,
    pub limit: Option<i64>,
}

impl LogQuery {
    fn limit(&self) -> i64 {
        self.limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_LOG_LIMIT)
            .min(MAX_LOG_LIMIT)
    }
}

pub async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> ApiResult<Vec<ResponderLog>> {
    let session = query.session.as_deref().filter(|s| !s.trim().is_empty());
    let logs = db::responder_logs::list_recent(&state.pool, session, query.limit())
        .await
        .map_err(internal)?;
    Ok(Json(logs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_limit_is_clamped() {
        let q = |limit| LogQuery {
            session: None,
            limit,
        };
        assert_eq!(q(None).limit(), DEFAULT_LOG_LIMIT);
        assert_eq!(q(Some(0)).limit(), DEFAULT_LOG_LIMIT);
        assert_eq!(q(Some(10)).limit(), 10);
        assert_eq!(q(Some(10_000)).limit(), MAX_LOG_LIMIT);
    }
}
