//! Menu, engagement and margin models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Menu item entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct MenuItem {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_visible: bool,
    pub sort_order: i32,
    /// Ingredient + packaging cost, used for margins
    pub cost_amount: Option<Decimal>,
}

/// Price variation (size, portion...) of a menu item
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct MenuItemPrice {
    pub id: i64,
    pub menu_item_id: i64,
    pub label: String,
    pub amount: Decimal,
    pub sort_order: i32,
}

/// Public menu listing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItemView {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub prices: Vec<MenuItemPrice>,
    pub likes: i64,
    pub shares: i64,
}

/// Like or share
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngagementKind {
    Like,
    Share,
}

impl EngagementKind {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Share => "share",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "like" => Some(Self::Like),
            "share" => Some(Self::Share),
            _ => None,
        }
    }

    /// Setting name holding the on/off flag
    pub fn setting_name(&self) -> &'static str {
        match self {
            Self::Like => "likes-enabled",
            Self::Share => "shares-enabled",
        }
    }
}

/// Like/share request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementRequest {
    pub client_id: Option<String>,
}

/// Like/share outcome
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngagementResult {
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub disabled: bool,
    pub count: i64,
    /// `false` when the call was a no-op (cooldown or rate limit)
    pub recorded: bool,
}

impl EngagementResult {
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            count: 0,
            recorded: false,
        }
    }
}

/// Margin tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarginTier {
    Excellent,
    Healthy,
    Sensitive,
    BelowIdeal,
}

/// Badge colour of a tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeTone {
    Good,
    Warn,
    Bad,
}

/// KPI colour of a tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KpiTone {
    Positive,
    Neutral,
    Negative,
}

/// Classified contribution margin
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarginStatus {
    pub tier: MarginTier,
    pub label: &'static str,
    pub note: &'static str,
    pub badge_tone: BadgeTone,
    pub kpi_tone: KpiTone,
}

/// Admin menu entry with margins per price
#[derive(Debug, Clone, Serialize)]
pub struct AdminMenuItemView {
    pub id: i64,
    pub name: String,
    pub is_visible: bool,
    pub cost_amount: Option<Decimal>,
    pub prices: Vec<PriceWithMargin>,
}

/// Price variation with its margin
#[derive(Debug, Clone, Serialize)]
pub struct PriceWithMargin {
    pub label: String,
    pub amount: Decimal,
    pub margin_percent: Option<f64>,
    pub margin: Option<MarginStatus>,
}
