//! Key/value settings grouped by context

use serde::{Deserialize, Serialize};

/// Setting row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Setting {
    pub context: String,
    pub name: String,
    pub value: String,
    pub updated_at: i64,
}

/// Parse a stored flag (`true`, `1`, `yes`, `on`, case-insensitive)
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}
