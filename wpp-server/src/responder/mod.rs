//! WhatsApp auto-responder
//!
//! One inbound message produces at most one reply. The decision itself is
//! pure ([`matcher::decide_reply`]); [`AutoResponder`] adds the bot switch,
//! opt-outs, delivery and the decision log around it.

pub mod matcher;
pub mod text;

pub use matcher::{Decision, RuleSet, decide_reply};

use std::sync::{Arc, LazyLock};

use regex::Regex;
use shared::models::{BotSettings, InboundMessage, setting::parse_flag};
use sqlx::PgPool;

use crate::db;
use crate::db::responder_logs::NewResponderLog;
use crate::error::ServiceResult;
use crate::provider::MessageSender;

/// Settings context of the bot switch and fallback text
pub const BOT_SETTINGS_CONTEXT: &str = "bot";
const ENABLED_SETTING: &str = "enabled";
const FALLBACK_SETTING: &str = "fallback-reply";

/// Reason stored for keyword opt-outs
pub const OPT_OUT_REASON: &str = "keyword";

static OPT_OUT_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    regex::RegexBuilder::new(r"(parar|remover|cancelar|sair)")
        .case_insensitive(true)
        .build()
        .ok()
});

/// Whether the text asks to stop receiving messages
pub fn is_opt_out_keyword(text: &str) -> bool {
    OPT_OUT_PATTERN
        .as_ref()
        .is_some_and(|re| re.is_match(text.trim()))
}

/// What the responder did with a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Skipped(&'static str),
    /// No rule matched and no fallback is configured
    Silent,
    Replied {
        matched_rule_id: Option<i64>,
        delivered: bool,
    },
}

pub async fn load_bot_settings(pool: &PgPool) -> Result<BotSettings, sqlx::Error> {
    let map = db::settings::get_context(pool, BOT_SETTINGS_CONTEXT).await?;
    Ok(BotSettings {
        enabled: map.get(ENABLED_SETTING).is_some_and(|v| parse_flag(v)),
        fallback_reply: map
            .get(FALLBACK_SETTING)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()),
    })
}

pub async fn save_bot_settings(pool: &PgPool, settings: &BotSettings) -> Result<(), sqlx::Error> {
    db::settings::upsert(
        pool,
        BOT_SETTINGS_CONTEXT,
        ENABLED_SETTING,
        if settings.enabled { "true" } else { "false" },
    )
    .await?;
    match settings.fallback_reply.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => {
            db::settings::upsert(pool, BOT_SETTINGS_CONTEXT, FALLBACK_SETTING, text).await
        }
        _ => db::settings::delete(pool, BOT_SETTINGS_CONTEXT, FALLBACK_SETTING).await,
    }
}

/// Quick check before touching storage; `None` means the message is eligible
pub fn precheck(message: &InboundMessage) -> Option<&'static str> {
    if message.from_me {
        return Some("outbound message");
    }
    if message.from.is_none() {
        return Some("no sender phone");
    }
    match message.text() {
        None => Some("empty body"),
        Some(text) if is_opt_out_keyword(text) => Some("opt-out keyword"),
        Some(_) => None,
    }
}

/// Stored state one reply decision depends on
#[derive(Debug, Clone, Default)]
pub struct ReplyContext {
    pub settings: BotSettings,
    pub opted_out: bool,
    pub rules: RuleSet,
}

/// Apply the bot switch and opt-out gates, then decide and deliver.
///
/// Returns the outcome and, when a decision was taken, the decision to log.
pub async fn respond(
    sender: &dyn MessageSender,
    message: &InboundMessage,
    from: &str,
    text: &str,
    ctx: &ReplyContext,
    now_ms: i64,
) -> (Outcome, Option<Decision>) {
    if !ctx.settings.enabled {
        return (Outcome::Skipped("bot disabled"), None);
    }
    if ctx.opted_out {
        return (Outcome::Skipped("opted out"), None);
    }

    let decision = decide_reply(&ctx.rules, text, now_ms, ctx.settings.fallback_reply.as_deref());
    let Some(reply) = decision.reply.as_deref() else {
        tracing::debug!(session = %message.session, from, "No rule matched");
        return (Outcome::Silent, Some(decision));
    };

    let delivered = match sender.send_text(&message.session, from, reply).await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(session = %message.session, from, error = %e, "Auto-reply delivery failed");
            false
        }
    };
    tracing::info!(
        session = %message.session,
        from,
        rule = ?decision.matched_rule_id,
        delivered,
        "Auto-reply processed"
    );
    let outcome = Outcome::Replied {
        matched_rule_id: decision.matched_rule_id,
        delivered,
    };
    (outcome, Some(decision))
}

#[derive(Clone)]
pub struct AutoResponder {
    pool: PgPool,
    sender: Arc<dyn MessageSender>,
}

impl AutoResponder {
    pub fn new(pool: PgPool, sender: Arc<dyn MessageSender>) -> Self {
        Self { pool, sender }
    }

    /// Decide and deliver the reply for one inbound message.
    ///
    /// Delivery failures are logged and recorded, never returned.
    pub async fn handle(&self, message: &InboundMessage) -> ServiceResult<Outcome> {
        if let Some(reason) = precheck(message) {
            return Ok(Outcome::Skipped(reason));
        }
        let (Some(from), Some(text)) = (message.from.as_deref(), message.text()) else {
            return Ok(Outcome::Skipped("incomplete message"));
        };

        let ctx = self.load_context(from).await?;
        let (outcome, decision) = respond(
            self.sender.as_ref(),
            message,
            from,
            text,
            &ctx,
            shared::util::now_millis(),
        )
        .await;

        if let Some(decision) = decision {
            let delivered = matches!(outcome, Outcome::Replied { delivered: true, .. });
            self.log(message, from, text, &decision, delivered).await;
        }
        Ok(outcome)
    }

    /// Stops at the first closed gate so a disabled bot costs one query
    async fn load_context(&self, from: &str) -> Result<ReplyContext, sqlx::Error> {
        let settings = load_bot_settings(&self.pool).await?;
        if !settings.enabled {
            return Ok(ReplyContext {
                settings,
                ..ReplyContext::default()
            });
        }
        if db::optouts::is_opted_out(&self.pool, from).await? {
            return Ok(ReplyContext {
                settings,
                opted_out: true,
                rules: RuleSet::default(),
            });
        }
        let rules = RuleSet::new(db::rules::list_active(&self.pool).await?);
        Ok(ReplyContext {
            settings,
            opted_out: false,
            rules,
        })
    }

    async fn log(
        &self,
        message: &InboundMessage,
        from: &str,
        body: &str,
        decision: &Decision,
        delivered: bool,
    ) {
        let entry = NewResponderLog {
            session_key: &message.session,
            from_phone: from,
            to_phone: message.to.as_deref(),
            body,
            matched_rule_id: decision.matched_rule_id,
            reply: decision.reply.as_deref(),
            delivered,
        };
        if let Err(e) = db::responder_logs::insert(&self.pool, &entry).await {
            tracing::error!(error = %e, "Failed to write responder log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockSender;
    use shared::models::{AutoResponseRule, Provider};

    const PHONE: &str = "5511999998888";

    fn inbound(from_me: bool, from: Option<&str>, body: Option<&str>) -> InboundMessage {
        InboundMessage {
            provider: Provider::Wppconnect,
            session: "loja".into(),
            from: from.map(str::to_string),
            to: None,
            body: body.map(str::to_string),
            message_type: None,
            instance_id: None,
            contact_name: None,
            from_me,
            received_at: 0,
        }
    }

    #[test]
    fn opt_out_keywords() {
        assert!(is_opt_out_keyword("PARAR"));
        assert!(is_opt_out_keyword("quero sair da lista"));
        assert!(is_opt_out_keyword("Remover"));
        assert!(!is_opt_out_keyword("qual o cardápio?"));
    }

    #[test]
    fn precheck_filters_ineligible_messages() {
        assert_eq!(
            precheck(&inbound(true, Some("5511999998888"), Some("oi"))),
            Some("outbound message")
        );
        assert_eq!(precheck(&inbound(false, None, Some("oi"))), Some("no sender phone"));
        assert_eq!(
            precheck(&inbound(false, Some("5511999998888"), Some("  "))),
            Some("empty body")
        );
        assert_eq!(
            precheck(&inbound(false, Some("5511999998888"), Some("cancelar"))),
            Some("opt-out keyword")
        );
        assert_eq!(precheck(&inbound(false, Some("5511999998888"), Some("oi"))), None);
    }

    #[tokio::test]
    async fn outbound_messages_never_reach_storage_or_sender() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        let sender = Arc::new(MockSender::default());
        let responder = AutoResponder::new(pool, sender.clone());

        let outcome = responder
            .handle(&inbound(true, Some("5511999998888"), Some("oi")))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Skipped("outbound message"));
        assert!(sender.sent().is_empty());
    }

    fn menu_rule() -> AutoResponseRule {
        AutoResponseRule {
            id: 7,
            label: "cardápio".into(),
            trigger: "cardapio".into(),
            is_regex: false,
            response: "Veja o cardápio: https://cardapio.example.com".into(),
            priority: 1,
            is_active: true,
            active_from: None,
            active_to: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn enabled_context() -> ReplyContext {
        ReplyContext {
            settings: BotSettings {
                enabled: true,
                fallback_reply: None,
            },
            opted_out: false,
            rules: RuleSet::new(vec![menu_rule()]),
        }
    }

    #[tokio::test]
    async fn matched_rule_is_sent() {
        let sender = MockSender::default();
        let message = inbound(false, Some(PHONE), Some("Qual o cardápio?"));
        let (outcome, decision) =
            respond(&sender, &message, PHONE, "Qual o cardápio?", &enabled_context(), 0).await;
        assert_eq!(
            outcome,
            Outcome::Replied {
                matched_rule_id: Some(7),
                delivered: true
            }
        );
        assert_eq!(decision.and_then(|d| d.matched_rule_id), Some(7));
        let sent = sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "loja");
        assert_eq!(sent[0].1, PHONE);
    }

    #[tokio::test]
    async fn failed_delivery_is_recorded_not_returned() {
        let sender = MockSender::failing_for(&[PHONE]);
        let message = inbound(false, Some(PHONE), Some("cardapio"));
        let (outcome, decision) =
            respond(&sender, &message, PHONE, "cardapio", &enabled_context(), 0).await;
        assert_eq!(
            outcome,
            Outcome::Replied {
                matched_rule_id: Some(7),
                delivered: false
            }
        );
        assert!(decision.is_some_and(|d| d.reply.is_some()));
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn disabled_bot_skips_without_sending() {
        let sender = MockSender::default();
        let mut ctx = enabled_context();
        ctx.settings.enabled = false;
        let message = inbound(false, Some(PHONE), Some("cardapio"));
        let (outcome, decision) = respond(&sender, &message, PHONE, "cardapio", &ctx, 0).await;
        assert_eq!(outcome, Outcome::Skipped("bot disabled"));
        assert!(decision.is_none());
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn opted_out_contact_is_skipped() {
        let sender = MockSender::default();
        let mut ctx = enabled_context();
        ctx.opted_out = true;
        let message = inbound(false, Some(PHONE), Some("cardapio"));
        let (outcome, decision) = respond(&sender, &message, PHONE, "cardapio", &ctx, 0).await;
        assert_eq!(outcome, Outcome::Skipped("opted out"));
        assert!(decision.is_none());
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn no_match_without_fallback_stays_silent() {
        let sender = MockSender::default();
        let message = inbound(false, Some(PHONE), Some("bom dia"));
        let (outcome, decision) =
            respond(&sender, &message, PHONE, "bom dia", &enabled_context(), 0).await;
        assert_eq!(outcome, Outcome::Silent);
        assert_eq!(decision.and_then(|d| d.reply), None);
        assert!(sender.sent().is_empty());

        let mut ctx = enabled_context();
        ctx.settings.fallback_reply = Some("Desculpe, não entendi.".into());
        let (outcome, _) = respond(&sender, &message, PHONE, "bom dia", &ctx, 0).await;
        assert_eq!(
            outcome,
            Outcome::Replied {
                matched_rule_id: None,
                delivered: true
            }
        );
    }
}
