//! Outbound WhatsApp providers
//!
//! Two HTTP gateways are supported: a self-hosted WPPConnect server and the
//! Z-API SaaS. Both sit behind [`MessageSender`] so the auto-responder and
//! the alert notifier never know which one delivers.

pub mod wppconnect;
pub mod zapi;

pub use wppconnect::WppConnectClient;
pub use zapi::ZApiClient;

use async_trait::async_trait;
use shared::error::{AppError, ErrorCode};
use thiserror::Error;

/// Provider call failure
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request timed out")]
    Timeout,
    #[error("provider returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("provider did not issue a token: {0}")]
    Token(String),
    #[error("provider request failed: {0}")]
    Transport(String),
    #[error("provider not configured: {0}")]
    NotConfigured(&'static str),
    #[error("provider returned no QR code")]
    NoQrCode,
    #[error("Invalid phone. Use E.164 digits without '+'")]
    InvalidPhone,
    #[error("Message cannot be empty")]
    EmptyMessage,
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else {
            ProviderError::Transport(e.to_string())
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(e: ProviderError) -> Self {
        let code = match &e {
            ProviderError::Timeout => ErrorCode::ProviderTimeout,
            ProviderError::Status { .. } | ProviderError::Transport(_) => ErrorCode::ProviderError,
            ProviderError::Token(_) => ErrorCode::TokenUnavailable,
            ProviderError::NotConfigured(_) => ErrorCode::ConfigError,
            ProviderError::NoQrCode => ErrorCode::QrCodeUnavailable,
            ProviderError::InvalidPhone => ErrorCode::InvalidPhone,
            ProviderError::EmptyMessage => ErrorCode::EmptyMessage,
        };
        let err = AppError::with_message(code, e.to_string());
        match e {
            ProviderError::Status { status, .. } => err.with_detail("upstream_status", status),
            _ => err,
        }
    }
}

/// Something that can deliver a WhatsApp text
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send `text` to `phone` through `session`; returns the provider's JSON answer
    async fn send_text(
        &self,
        session: &str,
        phone: &str,
        text: &str,
    ) -> Result<serde_json::Value, ProviderError>;
}

/// Validate an outbound message: normalized digits and non-blank trimmed text
pub fn validate_outbound(phone: &str, text: &str) -> Result<(String, String), ProviderError> {
    let phone = shared::phone::normalize_phone(phone).ok_or(ProviderError::InvalidPhone)?;
    let text = text.trim();
    if text.is_empty() {
        return Err(ProviderError::EmptyMessage);
    }
    Ok((phone, text.to_string()))
}

/// Pick a human-readable error from a provider JSON body:
/// `message`, then `error`, then the HTTP status text
pub(crate) fn error_message(body: &serde_json::Value, status: reqwest::StatusCode) -> String {
    let from_body = |key: &str| {
        body.get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    from_body("message")
        .or_else(|| from_body("error"))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        })
}
