//! Outbound WhatsApp alerts
//!
//! The public menu calls [`AlertNotifier::notify`] when it fails to load;
//! staff receive one text per configured phone, at most once per cooldown.
//! Quick replies to customers waiting for an answer live here too since
//! they share the same sender.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::error::{AppError, ErrorCode};
use shared::models::setting::parse_flag;
use shared::phone::{normalize_phone, normalize_phone_e164_br, parse_phone_list};
use sqlx::PgPool;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::db;
use crate::error::ServiceResult;
use crate::provider::MessageSender;

pub const ALERT_SETTINGS_CONTEXT: &str = "alerts";
const ENABLED_SETTING: &str = "whatsapp-alert.enabled";
const PHONES_SETTING: &str = "whatsapp-alert.phones";
const COOLDOWN_SETTING: &str = "whatsapp-alert.cooldown-seconds";
const MESSAGE_SETTING: &str = "whatsapp-alert.message";
pub const DEFAULT_COOLDOWN_SECS: u64 = 300;

const QUICK_REPLY_CONTEXT: &str = "whatsapp-no-response";
const QUICK_REPLY_LEGACY_CONTEXT: &str = "admin-wpp-alert-panel";
const QUICK_REPLY_SETTING: &str = "quick-reply-message";
pub const QUICK_REPLY_DEFAULT: &str =
    "Recebemos sua mensagem e vamos te responder em instantes. Obrigado pela paciencia.";
const QUICK_REPLY_SOURCE: &str = "admin-alert-panel";

/// Alert settings as stored in context `alerts`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertSettings {
    pub enabled: bool,
    pub phones: Vec<String>,
    pub cooldown: Duration,
    pub message: Option<String>,
}

impl AlertSettings {
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        Self {
            enabled: map.get(ENABLED_SETTING).is_some_and(|v| parse_flag(v)),
            phones: map
                .get(PHONES_SETTING)
                .map(|v| parse_phone_list(v))
                .unwrap_or_default(),
            cooldown: Duration::from_secs(parse_cooldown(map.get(COOLDOWN_SETTING).map(String::as_str))),
            message: map
                .get(MESSAGE_SETTING)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        }
    }
}

/// Cooldown seconds: default when unset or unparsable, never below 1
pub fn parse_cooldown(raw: Option<&str>) -> u64 {
    match raw.map(str::trim).map(str::parse::<f64>) {
        Some(Ok(v)) if v.is_finite() => v.floor().max(1.0) as u64,
        _ => DEFAULT_COOLDOWN_SECS,
    }
}

pub fn default_message(now_ms: i64, url: &str, error: &str) -> String {
    [
        "ALERTA DE CONTINGENCIA DO CARDAPIO".to_string(),
        format!("Horario: {}", shared::util::format_br_datetime(now_ms)),
        format!("URL: {url}"),
        format!("Erro: {error}"),
    ]
    .join("\n")
}

/// What happened to one alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertReport {
    pub sent: usize,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<&'static str>,
}

impl AlertReport {
    fn skipped(reason: &'static str) -> Self {
        Self {
            sent: 0,
            total: 0,
            skipped: Some(reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuickReplyIntent {
    QuickReply,
    Ignore,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickReplyRequest {
    pub intent: QuickReplyIntent,
    pub customer_id: i64,
    #[serde(default)]
    pub phone_e164: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickReplyResult {
    pub customer_id: i64,
    pub intent: QuickReplyIntent,
}

#[derive(Clone)]
pub struct AlertNotifier {
    pool: PgPool,
    sender: Arc<dyn MessageSender>,
    session: String,
    /// Alerts are suppressed until this instant
    cooldown_until: Arc<Mutex<Option<Instant>>>,
}

impl AlertNotifier {
    pub fn new(pool: PgPool, sender: Arc<dyn MessageSender>, session: impl Into<String>) -> Self {
        Self {
            pool,
            sender,
            session: session.into(),
            cooldown_until: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn load_settings(&self) -> Result<AlertSettings, sqlx::Error> {
        let map = db::settings::get_context(&self.pool, ALERT_SETTINGS_CONTEXT).await?;
        Ok(AlertSettings::from_map(&map))
    }

    /// Load settings and send; failures are logged, never returned
    pub async fn notify(&self, url: &str, error: &str, ignore_cooldown: bool) -> AlertReport {
        match self.load_settings().await {
            Ok(settings) => self.dispatch(&settings, url, error, ignore_cooldown).await,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load alert settings");
                AlertReport::skipped("settings unavailable")
            }
        }
    }

    /// Send the alert to every configured phone
    pub async fn dispatch(
        &self,
        settings: &AlertSettings,
        url: &str,
        error: &str,
        ignore_cooldown: bool,
    ) -> AlertReport {
        if !settings.enabled {
            return AlertReport::skipped("disabled");
        }
        if settings.phones.is_empty() {
            return AlertReport::skipped("no phones");
        }

        // Held across the send so concurrent failures produce one alert
        let mut cooldown = self.cooldown_until.lock().await;
        if !ignore_cooldown && matches!(*cooldown, Some(until) if Instant::now() < until) {
            tracing::debug!("Alert suppressed by cooldown");
            return AlertReport::skipped("cooldown");
        }

        let message = settings
            .message
            .clone()
            .unwrap_or_else(|| default_message(shared::util::now_millis(), url, error));

        let results = join_all(
            settings
                .phones
                .iter()
                .map(|phone| self.sender.send_text(&self.session, phone, &message)),
        )
        .await;

        let total = results.len();
        let mut sent = 0;
        for (phone, result) in settings.phones.iter().zip(&results) {
            match result {
                Ok(_) => sent += 1,
                Err(e) => tracing::warn!(phone = %phone, error = %e, "Alert delivery failed"),
            }
        }

        if sent > 0 && !ignore_cooldown {
            *cooldown = Some(Instant::now() + settings.cooldown);
        }
        if sent != total {
            tracing::warn!(sent, total, "Alert partially failed");
        } else {
            tracing::info!(sent, "Alert sent");
        }

        AlertReport {
            sent,
            total,
            skipped: None,
        }
    }

    async fn quick_reply_message(&self) -> Result<String, sqlx::Error> {
        for context in [QUICK_REPLY_CONTEXT, QUICK_REPLY_LEGACY_CONTEXT] {
            if let Some(value) = db::settings::get(&self.pool, context, QUICK_REPLY_SETTING).await?
                && !value.trim().is_empty()
            {
                return Ok(value.trim().to_string());
            }
        }
        Ok(QUICK_REPLY_DEFAULT.to_string())
    }

    /// Answer (or dismiss) a customer waiting for a human reply
    pub async fn quick_reply(&self, req: &QuickReplyRequest) -> ServiceResult<QuickReplyResult> {
        let customer = db::crm::find(&self.pool, req.customer_id)
            .await?
            .ok_or_else(|| AppError::validation("Customer not found"))?;

        let raw_phone = if customer.phone_e164.trim().is_empty() {
            req.phone_e164.as_deref().unwrap_or_default()
        } else {
            customer.phone_e164.as_str()
        };
        let phone = normalize_phone(raw_phone)
            .ok_or_else(|| AppError::new(ErrorCode::InvalidPhone))?;
        let correlation_id = format!("{}-{}", shared::util::now_millis(), customer.id);

        match req.intent {
            QuickReplyIntent::Ignore => {
                let payload = json!({
                    "action": "whatsapp_alert_ignored",
                    "phone": phone,
                    "phone_e164": normalize_phone_e164_br(&phone),
                    "correlationId": correlation_id,
                });
                db::crm::insert_event(
                    &self.pool,
                    customer.id,
                    "WHATSAPP_ALERT_IGNORED",
                    QUICK_REPLY_SOURCE,
                    &payload,
                )
                .await?;
            }
            QuickReplyIntent::QuickReply => {
                let message = self.quick_reply_message().await?;
                let response = self.sender.send_text(&self.session, &phone, &message).await?;
                let payload = json!({
                    "action": "whatsapp_sent",
                    "channel": "admin-alert-quick-reply",
                    "phone": phone,
                    "phone_e164": normalize_phone_e164_br(&phone),
                    "messageText": message,
                    "wppResponse": response,
                    "correlationId": correlation_id,
                });
                db::crm::insert_event(
                    &self.pool,
                    customer.id,
                    "WHATSAPP_SENT",
                    QUICK_REPLY_SOURCE,
                    &payload,
                )
                .await?;
            }
        }

        tracing::info!(customer_id = customer.id, intent = ?req.intent, "Quick reply handled");
        Ok(QuickReplyResult {
            customer_id: customer.id,
            intent: req.intent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockSender;

    fn notifier(sender: Arc<MockSender>) -> AlertNotifier {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        AlertNotifier::new(pool, sender, "default")
    }

    fn settings(phones: &[&str]) -> AlertSettings {
        AlertSettings {
            enabled: true,
            phones: phones.iter().map(|p| p.to_string()).collect(),
            cooldown: Duration::from_secs(300),
            message: None,
        }
    }

    #[test]
    fn settings_from_map() {
        let map: HashMap<String, String> = [
            (ENABLED_SETTING, "yes"),
            (PHONES_SETTING, "5511999998888\n5511999998888; 5521988887777, lixo"),
            (COOLDOWN_SETTING, "0.5"),
            (MESSAGE_SETTING, "  "),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let s = AlertSettings::from_map(&map);
        assert!(s.enabled);
        assert_eq!(s.phones, vec!["5511999998888", "5521988887777"]);
        assert_eq!(s.cooldown, Duration::from_secs(1));
        assert_eq!(s.message, None);
    }

    #[test]
    fn cooldown_parsing() {
        assert_eq!(parse_cooldown(None), DEFAULT_COOLDOWN_SECS);
        assert_eq!(parse_cooldown(Some("abc")), DEFAULT_COOLDOWN_SECS);
        assert_eq!(parse_cooldown(Some("90.9")), 90);
        assert_eq!(parse_cooldown(Some("-5")), 1);
    }

    #[test]
    fn default_message_lines() {
        let msg = default_message(0, "https://cardapio.example.com", "db down");
        let lines: Vec<&str> = msg.lines().collect();
        assert_eq!(lines[0], "ALERTA DE CONTINGENCIA DO CARDAPIO");
        assert_eq!(lines[1], "Horario: 31/12/1969 21:00:00");
        assert_eq!(lines[2], "URL: https://cardapio.example.com");
        assert_eq!(lines[3], "Erro: db down");
    }

    #[tokio::test]
    async fn success_arms_cooldown() {
        let sender = Arc::new(MockSender::default());
        let n = notifier(sender.clone());
        let s = settings(&["5511999998888", "5521988887777"]);

        let first = n.dispatch(&s, "/api/menu", "boom", false).await;
        assert_eq!((first.sent, first.total), (2, 2));
        assert_eq!(sender.sent().len(), 2);

        let second = n.dispatch(&s, "/api/menu", "boom", false).await;
        assert_eq!(second.skipped, Some("cooldown"));
        assert_eq!(sender.sent().len(), 2);
    }

    #[tokio::test]
    async fn ignore_cooldown_sends_without_arming() {
        let sender = Arc::new(MockSender::default());
        let n = notifier(sender.clone());
        let s = settings(&["5511999998888"]);

        n.dispatch(&s, "/api/menu", "boom", true).await;
        let next = n.dispatch(&s, "/api/menu", "boom", false).await;
        assert_eq!(next.sent, 1);
        assert_eq!(sender.sent().len(), 2);
    }

    #[tokio::test]
    async fn total_failure_does_not_arm_cooldown() {
        let sender = Arc::new(MockSender::failing_for(&["5511999998888"]));
        let n = notifier(sender.clone());
        let s = settings(&["5511999998888"]);

        let report = n.dispatch(&s, "/api/menu", "boom", false).await;
        assert_eq!((report.sent, report.total), (0, 1));
        let again = n.dispatch(&s, "/api/menu", "boom", false).await;
        assert_eq!(again.skipped, None);
    }

    #[tokio::test]
    async fn disabled_or_empty_settings_skip() {
        let sender = Arc::new(MockSender::default());
        let n = notifier(sender.clone());
        let mut s = settings(&["5511999998888"]);
        s.enabled = false;
        assert_eq!(n.dispatch(&s, "u", "e", false).await.skipped, Some("disabled"));
        assert_eq!(
            n.dispatch(&settings(&[]), "u", "e", false).await.skipped,
            Some("no phones")
        );
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn custom_message_is_sent_verbatim() {
        let sender = Arc::new(MockSender::default());
        let n = notifier(sender.clone());
        let mut s = settings(&["5511999998888"]);
        s.message = Some("Cardapio fora do ar".into());
        n.dispatch(&s, "u", "e", false).await;
        assert_eq!(sender.sent()[0].2, "Cardapio fora do ar");
    }

    #[test]
    fn quick_reply_request_shape() {
        let req: QuickReplyRequest = serde_json::from_value(json!({
            "intent": "quick-reply",
            "customerId": 42
        }))
        .unwrap();
        assert_eq!(req.intent, QuickReplyIntent::QuickReply);
        assert_eq!(req.customer_id, 42);
        assert!(serde_json::from_value::<QuickReplyRequest>(json!({
            "intent": "archive",
            "customerId": 1
        }))
        .is_err());
    }
}
