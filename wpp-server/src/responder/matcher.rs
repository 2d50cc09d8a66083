//! Rule-priority matcher
//!
//! Rules are compiled once per batch, sorted by ascending priority (ties by
//! id) and evaluated in order; the first rule whose window contains `now`
//! and whose trigger matches wins.

use regex::{Regex, RegexBuilder};
use shared::models::AutoResponseRule;

use super::text::fold;

/// Compiled trigger
#[derive(Debug, Clone)]
pub enum Trigger {
    /// Folded (accent-stripped, lowercased) needle
    Literal(String),
    Regex(Regex),
}

impl Trigger {
    /// Compile a stored trigger; `None` for blank or invalid patterns
    pub fn compile(trigger: &str, is_regex: bool) -> Option<Trigger> {
        let trigger = trigger.trim();
        if trigger.is_empty() {
            return None;
        }
        if !is_regex {
            return Some(Trigger::Literal(fold(trigger)));
        }
        match RegexBuilder::new(trigger)
            .case_insensitive(true)
            .unicode(true)
            .build()
        {
            Ok(re) => Some(Trigger::Regex(re)),
            Err(e) => {
                tracing::warn!(pattern = trigger, error = %e, "Skipping rule with invalid regex");
                None
            }
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        match self {
            Trigger::Literal(needle) => fold(text).contains(needle.as_str()),
            Trigger::Regex(re) => re.is_match(text),
        }
    }
}

/// Check that a stored trigger compiles, for admin validation
pub fn validate_trigger(trigger: &str, is_regex: bool) -> Result<(), regex::Error> {
    if is_regex {
        RegexBuilder::new(trigger.trim())
            .case_insensitive(true)
            .unicode(true)
            .build()?;
    }
    Ok(())
}

/// Optional activity window, epoch millis, both bounds inclusive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActiveWindow {
    pub from: Option<i64>,
    pub to: Option<i64>,
}

impl ActiveWindow {
    pub fn contains(&self, now_ms: i64) -> bool {
        if self.from.is_some_and(|from| now_ms < from) {
            return false;
        }
        if self.to.is_some_and(|to| now_ms > to) {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub id: i64,
    pub priority: i32,
    pub trigger: Trigger,
    pub window: ActiveWindow,
    pub response: String,
}

/// Active rules in evaluation order
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<AutoResponseRule>) -> Self {
        let mut compiled: Vec<CompiledRule> = rules
            .into_iter()
            .filter(|r| r.is_active)
            .filter_map(|r| {
                let trigger = Trigger::compile(&r.trigger, r.is_regex)?;
                Some(CompiledRule {
                    id: r.id,
                    priority: r.priority,
                    trigger,
                    window: ActiveWindow {
                        from: r.active_from,
                        to: r.active_to,
                    },
                    response: r.response,
                })
            })
            .collect();
        compiled.sort_by_key(|r| (r.priority, r.id));
        Self { rules: compiled }
    }

    pub fn find_match(&self, text: &str, now_ms: i64) -> Option<&CompiledRule> {
        self.rules
            .iter()
            .find(|r| r.window.contains(now_ms) && r.trigger.matches(text))
    }
}

/// What to answer to one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub reply: Option<String>,
    pub matched_rule_id: Option<i64>,
}

/// Matched rule's response, else the fallback, else silence
pub fn decide_reply(rules: &RuleSet, text: &str, now_ms: i64, fallback: Option<&str>) -> Decision {
    if let Some(rule) = rules.find_match(text, now_ms) {
        return Decision {
            reply: Some(rule.response.clone()),
            matched_rule_id: Some(rule.id),
        };
    }
    Decision {
        reply: fallback
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string),
        matched_rule_id: None,
    }
}
