//! Input validation helpers
//!
//! Text length limits for admin input. WhatsApp caps a text message at
//! 4096 characters, which bounds replies and fallbacks.

use shared::error::{AppError, ErrorCode};
use shared::models::{RuleCreate, RuleUpdate};

use crate::responder::matcher::validate_trigger;

// ── Text length limits ──────────────────────────────────────────────

/// Rule labels
pub const MAX_LABEL_LEN: usize = 200;

/// Rule triggers (literal text or regex source)
pub const MAX_TRIGGER_LEN: usize = 500;

/// Anything sent through WhatsApp
pub const MAX_MESSAGE_LEN: usize = 4096;

/// Session keys end up in provider URLs
pub const MAX_SESSION_KEY_LEN: usize = 64;

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    validate_len(value, field, max_len)
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    if let Some(v) = value {
        validate_len(v, field, max_len)?;
    }
    Ok(())
}

fn validate_len(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    let chars = value.chars().count();
    if chars > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({chars} chars, max {max_len})"
        )));
    }
    Ok(())
}

/// `[A-Za-z0-9_-]`, 1..=64 chars
pub fn validate_session_key(key: &str) -> Result<(), AppError> {
    let valid = !key.is_empty()
        && key.len() <= MAX_SESSION_KEY_LEN
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(AppError::validation("Invalid session key").with_detail("session", key))
    }
}

/// Active window bounds must not be inverted
pub fn validate_window(from: Option<i64>, to: Option<i64>) -> Result<(), AppError> {
    match (from, to) {
        (Some(from), Some(to)) if from > to => Err(AppError::with_message(
            ErrorCode::RuleInvalidWindow,
            "active_from must not be after active_to",
        )),
        _ => Ok(()),
    }
}

fn check_trigger(trigger: &str, is_regex: bool) -> Result<(), AppError> {
    validate_trigger(trigger, is_regex).map_err(|e| {
        AppError::with_message(ErrorCode::RuleInvalidRegex, "Trigger is not a valid regex")
            .with_detail("reason", e.to_string())
    })
}

pub fn validate_rule_create(data: &RuleCreate) -> Result<(), AppError> {
    validate_required_text(&data.label, "label", MAX_LABEL_LEN)?;
    validate_required_text(&data.trigger, "trigger", MAX_TRIGGER_LEN)?;
    validate_required_text(&data.response, "response", MAX_MESSAGE_LEN)?;
    check_trigger(&data.trigger, data.is_regex)?;
    validate_window(data.active_from, data.active_to)
}

/// Validate the patch alone; the merged rule is re-checked against the stored one by the caller
pub fn validate_rule_update(data: &RuleUpdate) -> Result<(), AppError> {
    if let Some(label) = &data.label {
        validate_required_text(label, "label", MAX_LABEL_LEN)?;
    }
    if let Some(trigger) = &data.trigger {
        validate_required_text(trigger, "trigger", MAX_TRIGGER_LEN)?;
    }
    if let Some(response) = &data.response {
        validate_required_text(response, "response", MAX_MESSAGE_LEN)?;
    }
    Ok(())
}

/// Check trigger and window of a rule after applying a patch
pub fn validate_merged_rule(
    trigger: &str,
    is_regex: bool,
    active_from: Option<i64>,
    active_to: Option<i64>,
) -> Result<(), AppError> {
    check_trigger(trigger, is_regex)?;
    validate_window(active_from, active_to)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(trigger: &str, is_regex: bool) -> RuleCreate {
        RuleCreate {
            label: "Horário".into(),
            trigger: trigger.into(),
            is_regex,
            response: "Abrimos às 18h".into(),
            priority: None,
            is_active: None,
            active_from: None,
            active_to: None,
        }
    }

    #[test]
    fn required_text() {
        assert!(validate_required_text("  ", "label", 10).is_err());
        assert!(validate_required_text("ação", "label", 4).is_ok());
        assert!(validate_required_text("abcde", "label", 4).is_err());
        assert!(validate_optional_text(&None, "x", 1).is_ok());
        assert!(validate_optional_text(&Some("ab".into()), "x", 1).is_err());
    }

    #[test]
    fn session_keys() {
        assert!(validate_session_key("loja-centro_1").is_ok());
        assert!(validate_session_key("").is_err());
        assert!(validate_session_key("../etc").is_err());
        assert!(validate_session_key(&"a".repeat(65)).is_err());
    }

    #[test]
    fn rule_regex_and_window() {
        assert!(validate_rule_create(&create("horario", false)).is_ok());
        assert_eq!(
            validate_rule_create(&create("hora(rio", true)).unwrap_err().code,
            ErrorCode::RuleInvalidRegex
        );
        let mut inverted = create("horario", false);
        inverted.active_from = Some(200);
        inverted.active_to = Some(100);
        assert_eq!(
            validate_rule_create(&inverted).unwrap_err().code,
            ErrorCode::RuleInvalidWindow
        );
        assert!(validate_window(Some(100), Some(100)).is_ok());
    }
}
