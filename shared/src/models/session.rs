//! WhatsApp session model
//!
//! A session walks `pending → qrcode → connected` and drops to `logout`
//! or `error`. Provider callbacks are mapped to [`SessionEvent`]s and
//! folded into the stored status with [`SessionStatus::apply`].

use serde::{Deserialize, Serialize};

/// Persisted session status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Created or starting, no QR yet
    #[default]
    Pending,
    /// Waiting for the QR code to be scanned
    Qrcode,
    /// Paired and able to send
    Connected,
    /// Logged out by the user or the phone
    Logout,
    /// Provider reported an unrecoverable failure
    Error,
}

/// Something that happened to a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEvent {
    Start,
    QrIssued,
    Connected,
    Disconnected,
    LoggedOut,
    Failed,
}

impl SessionStatus {
    /// Parse from database string value (lowercase)
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "qrcode" => Some(Self::Qrcode),
            "connected" => Some(Self::Connected),
            "logout" => Some(Self::Logout),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Database string representation (lowercase)
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Qrcode => "qrcode",
            Self::Connected => "connected",
            Self::Logout => "logout",
            Self::Error => "error",
        }
    }

    /// Transition function
    pub fn apply(self, event: SessionEvent) -> SessionStatus {
        match (self, event) {
            (Self::Connected, SessionEvent::Start) => Self::Connected,
            (_, SessionEvent::Start) => Self::Pending,
            (Self::Connected, SessionEvent::QrIssued) => Self::Connected,
            (_, SessionEvent::QrIssued) => Self::Qrcode,
            (_, SessionEvent::Connected) => Self::Connected,
            (Self::Connected | Self::Qrcode, SessionEvent::Disconnected) => Self::Pending,
            (current, SessionEvent::Disconnected) => current,
            (_, SessionEvent::LoggedOut) => Self::Logout,
            (_, SessionEvent::Failed) => Self::Error,
        }
    }

}

impl SessionEvent {
    /// Map a raw provider state string (WPPConnect `status-find` values,
    /// `check-connection-session` answers, Z-API callbacks) to an event
    pub fn from_provider(raw: &str) -> Option<Self> {
        let event = match raw.trim() {
            "CONNECTED" | "connected" | "inChat" | "isLogged" | "qrReadSuccess"
            | "successChat" | "chatsAvailable" => Self::Connected,
            "notLogged" | "qrcode" | "QRCODE" | "qrRead" => Self::QrIssued,
            "desconnectedMobile" | "disconnected" | "DISCONNECTED" | "phoneNotConnected" => {
                Self::Disconnected
            }
            "browserClose" | "CLOSED" | "logout" | "LOGOUT" | "deleteToken" => Self::LoggedOut,
            "autocloseCalled" | "qrReadError" | "qrReadFail" | "serverClose" | "ERROR" => {
                Self::Failed
            }
            "STARTING" | "starting" | "initializing" | "INITIALIZING" | "OPENING" => Self::Start,
            _ => return None,
        };
        Some(event)
    }
}

/// WhatsApp session entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WppSession {
    pub session_key: String,
    pub status: SessionStatus,
    /// Data-URL of the last QR code, cleared once connected
    pub qrcode: Option<String>,
    pub last_error: Option<String>,
    pub version: i64,
    pub updated_at: i64,
}

/// Status write for a session (optimistic upsert input)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionWrite {
    pub session_key: String,
    pub status: SessionStatus,
    pub qrcode: Option<String>,
    pub last_error: Option<String>,
    pub updated_at: i64,
}
