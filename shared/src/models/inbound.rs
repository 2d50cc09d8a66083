//! Canonical inbound message
//!
//! Provider webhooks are normalized into [`WebhookEvent`] before anything
//! else looks at them, so matching and storage never see provider JSON.

use super::session::SessionEvent;
use serde::{Deserialize, Serialize};

/// Which WhatsApp gateway delivered the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Wppconnect,
    Zapi,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wppconnect => "wppconnect",
            Self::Zapi => "zapi",
        }
    }
}

/// Message direction relative to the restaurant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    pub fn from_me(from_me: bool) -> Self {
        if from_me { Self::Outbound } else { Self::Inbound }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }
}

/// Provider-independent message record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub provider: Provider,
    pub session: String,
    /// Sender digits (JID suffix removed)
    pub from: Option<String>,
    pub to: Option<String>,
    pub body: Option<String>,
    pub message_type: Option<String>,
    pub instance_id: Option<String>,
    pub contact_name: Option<String>,
    pub from_me: bool,
    pub received_at: i64,
}

impl InboundMessage {
    pub fn direction(&self) -> Direction {
        Direction::from_me(self.from_me)
    }

    /// The customer's number: sender for inbound, recipient for outbound
    pub fn counterpart(&self) -> Option<&str> {
        match self.direction() {
            Direction::Inbound => self.from.as_deref(),
            Direction::Outbound => self.to.as_deref(),
        }
    }

    /// Non-blank body text
    pub fn text(&self) -> Option<&str> {
        self.body.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Normalized webhook outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WebhookEvent {
    Message(InboundMessage),
    /// Session callback, carried as the event so the stored status decides
    /// the transition
    Status {
        session: String,
        event: SessionEvent,
        qrcode: Option<String>,
    },
    Ignored {
        reason: String,
    },
}

impl WebhookEvent {
    pub fn ignored(reason: impl Into<String>) -> Self {
        Self::Ignored {
            reason: reason.into(),
        }
    }

    /// Short name for audit rows and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::Status { .. } => "status",
            Self::Ignored { .. } => "ignored",
        }
    }
}
