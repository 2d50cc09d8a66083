//! Auto-response rule CRUD and dry-run

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use shared::error::{AppError, ErrorCode};
use shared::models::{AutoResponseRule, RuleCreate, RuleTestRequest, RuleTestResult, RuleUpdate};

use crate::db;
use crate::error::internal;
use crate::responder::{RuleSet, decide_reply, load_bot_settings};
use crate::state::AppState;
use crate::validation::{validate_merged_rule, validate_rule_create, validate_rule_update};

use super::ApiResult;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/rules", get(list_rules).post(create_rule))
        .route("/api/admin/rules/test", post(test_rules))
        .route("/api/admin/rules/{id}", put(update_rule).delete(delete_rule))
}

fn rule_not_found(id: i64) -> AppError {
    AppError::new(ErrorCode::RuleNotFound).with_detail("id", id)
}

pub async fn list_rules(State(state): State<AppState>) -> ApiResult<Vec<AutoResponseRule>> {
    let rules = db::rules::list(&state.pool).await.map_err(internal)?;
    Ok(Json(rules))
}

pub async fn create_rule(
    State(state): State<AppState>,
    Json(data): Json<RuleCreate>,
) -> ApiResult<AutoResponseRule> {
    validate_rule_create(&data)?;
    let rule = db::rules::create(&state.pool, &data)
        .await
        .map_err(internal)?;
    tracing::info!(rule_id = rule.id, label = %rule.label, "Rule created");
    Ok(Json(rule))
}

pub async fn update_rule(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(data): Json<RuleUpdate>,
) -> ApiResult<AutoResponseRule> {
    validate_rule_update(&data)?;
    let current = db::rules::find(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| rule_not_found(id))?;

    let (active_from, active_to) = if data.clear_window {
        (None, None)
    } else {
        (
            data.active_from.or(current.active_from),
            data.active_to.or(current.active_to),
        )
    };
    validate_merged_rule(
        data.trigger.as_deref().unwrap_or(&current.trigger),
        data.is_regex.unwrap_or(current.is_regex),
        active_from,
        active_to,
    )?;

    let rule = db::rules::update(&state.pool, id, &data)
        .await
        .map_err(internal)?;
    tracing::info!(rule_id = id, "Rule updated");
    Ok(Json(rule))
}

pub async fn delete_rule(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<bool> {
    let deleted = db::rules::delete(&state.pool, id).await.map_err(internal)?;
    if !deleted {
        return Err(rule_not_found(id));
    }
    tracing::info!(rule_id = id, "Rule deleted");
    Ok(Json(true))
}

/// Run the matcher on a text without sending anything
pub async fn test_rules(
    State(state): State<AppState>,
    Json(req): Json<RuleTestRequest>,
) -> ApiResult<RuleTestResult> {
    let rules = db::rules::list_active(&state.pool)
        .await
        .map_err(internal)?;
    let settings = load_bot_settings(&state.pool).await.map_err(internal)?;
    let decision = decide_reply(
        &RuleSet::new(rules),
        &req.text,
        req.at.unwrap_or_else(shared::util::now_millis),
        settings.fallback_reply.as_deref(),
    );
    Ok(Json(RuleTestResult {
        matched_rule_id: decision.matched_rule_id,
        reply: decision.reply,
    }))
}
