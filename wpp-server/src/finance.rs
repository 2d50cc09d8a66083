//! Contribution-margin classification for menu prices

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use shared::models::{BadgeTone, KpiTone, MarginStatus, MarginTier};

/// Classify a contribution margin percentage; `None` for missing or NaN
pub fn margin_status(percent: Option<f64>) -> Option<MarginStatus> {
    let percent = percent.filter(|p| !p.is_nan())?;

    let status = if percent > 60.0 {
        MarginStatus {
            tier: MarginTier::Excellent,
            label: "Excelente",
            note: "Excelente",
            badge_tone: BadgeTone::Good,
            kpi_tone: KpiTone::Positive,
        }
    } else if percent >= 50.0 {
        MarginStatus {
            tier: MarginTier::Healthy,
            label: "Zona saudável",
            note: "Zona saudável",
            badge_tone: BadgeTone::Good,
            kpi_tone: KpiTone::Positive,
        }
    } else if percent >= 45.0 {
        MarginStatus {
            tier: MarginTier::Sensitive,
            label: "Operação sensível",
            note: "Operação sensível - promoções e descontos são arriscados",
            badge_tone: BadgeTone::Warn,
            kpi_tone: KpiTone::Neutral,
        }
    } else {
        MarginStatus {
            tier: MarginTier::BelowIdeal,
            label: "Abaixo do ideal",
            note: "Abaixo do ideal",
            badge_tone: BadgeTone::Bad,
            kpi_tone: KpiTone::Negative,
        }
    };
    Some(status)
}

/// `(price - cost) / price * 100`, two decimals; `None` without a cost or a positive price
pub fn contribution_margin_percent(price: Decimal, cost: Option<Decimal>) -> Option<f64> {
    let cost = cost?;
    if price <= Decimal::ZERO {
        return None;
    }
    let percent = (price - cost) / price * Decimal::ONE_HUNDRED;
    percent.round_dp(2).to_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_boundaries() {
        let tier = |p: f64| margin_status(Some(p)).map(|s| s.tier);
        assert_eq!(tier(60.01), Some(MarginTier::Excellent));
        assert_eq!(tier(60.0), Some(MarginTier::Healthy));
        assert_eq!(tier(50.0), Some(MarginTier::Healthy));
        assert_eq!(tier(49.99), Some(MarginTier::Sensitive));
        assert_eq!(tier(45.0), Some(MarginTier::Sensitive));
        assert_eq!(tier(44.99), Some(MarginTier::BelowIdeal));
        assert_eq!(tier(-10.0), Some(MarginTier::BelowIdeal));
    }

    #[test]
    fn missing_or_nan_is_unclassified() {
        assert!(margin_status(None).is_none());
        assert!(margin_status(Some(f64::NAN)).is_none());
    }

    #[test]
    fn sensitive_tier_warns() {
        let s = margin_status(Some(47.0)).unwrap();
        assert_eq!(s.badge_tone, BadgeTone::Warn);
        assert_eq!(s.kpi_tone, KpiTone::Neutral);
        assert!(s.note.contains("promoções"));
    }

    #[test]
    fn margin_from_decimals() {
        let price = Decimal::new(5990, 2);
        let cost = Decimal::new(2100, 2);
        assert_eq!(contribution_margin_percent(price, Some(cost)), Some(64.94));
        assert_eq!(contribution_margin_percent(price, None), None);
        assert_eq!(contribution_margin_percent(Decimal::ZERO, Some(cost)), None);
    }
}
