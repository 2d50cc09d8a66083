//! Auto-response rule models

use serde::{Deserialize, Serialize};

/// Auto-response rule entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct AutoResponseRule {
    pub id: i64,
    pub label: String,
    /// Literal substring or regex pattern, see `is_regex`
    pub trigger: String,
    pub is_regex: bool,
    pub response: String,
    /// Lower number wins
    pub priority: i32,
    pub is_active: bool,
    /// Epoch millis, inclusive
    pub active_from: Option<i64>,
    /// Epoch millis, inclusive
    pub active_to: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create rule payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleCreate {
    pub label: String,
    pub trigger: String,
    #[serde(default)]
    pub is_regex: bool,
    pub response: String,
    pub priority: Option<i32>,
    pub is_active: Option<bool>,
    pub active_from: Option<i64>,
    pub active_to: Option<i64>,
}

/// Update rule payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleUpdate {
    pub label: Option<String>,
    pub trigger: Option<String>,
    pub is_regex: Option<bool>,
    pub response: Option<String>,
    pub priority: Option<i32>,
    pub is_active: Option<bool>,
    pub active_from: Option<i64>,
    pub active_to: Option<i64>,
    /// Clear both window bounds
    #[serde(default)]
    pub clear_window: bool,
}

/// Dry-run request for the matcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleTestRequest {
    pub text: String,
    /// Evaluate windows at this instant instead of now
    pub at: Option<i64>,
}

/// Dry-run result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleTestResult {
    pub matched_rule_id: Option<i64>,
    pub reply: Option<String>,
}

/// Bot-wide settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotSettings {
    pub enabled: bool,
    /// Sent when no rule matches; `None` means stay silent
    pub fallback_reply: Option<String>,
}

/// Auto-responder log row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ResponderLog {
    pub id: i64,
    pub session_key: String,
    pub from_phone: String,
    pub to_phone: Option<String>,
    pub body: String,
    pub matched_rule_id: Option<i64>,
    pub reply: Option<String>,
    pub delivered: bool,
    pub created_at: i64,
}
