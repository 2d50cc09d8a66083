//! WPPConnect server client
//!
//! Every session needs a bearer token from
//! `POST /api/{session}/{secret}/generate-token`. Tokens are cached per
//! session and evicted when the server answers 401.

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};
use shared::models::SessionEvent;

use super::{MessageSender, ProviderError, error_message, validate_outbound};
use crate::webhook::qr::{pick_qr_deep, to_data_url};

/// Outcome of a start/refresh call
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// Event implied by the provider answer, if recognizable
    pub event: Option<SessionEvent>,
    /// Data-URL QR, when the provider returned one
    pub qrcode: Option<String>,
    pub raw: Value,
}

pub struct WppConnectClient {
    http: reqwest::Client,
    base_url: String,
    secret: String,
    tokens: DashMap<String, String>,
}

impl WppConnectClient {
    pub fn new(http: reqwest::Client, base_url: &str, secret: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret: secret.to_string(),
            tokens: DashMap::new(),
        }
    }

    fn session_url(&self, session: &str, tail: &str) -> String {
        format!("{}/api/{}/{}", self.base_url, encode_segment(session), tail)
    }

    /// Ask the server for a fresh token and cache it
    pub async fn generate_token(&self, session: &str) -> Result<String, ProviderError> {
        if self.secret.is_empty() {
            return Err(ProviderError::NotConfigured("WPP_SECRET"));
        }
        let url = format!(
            "{}/api/{}/{}/generate-token",
            self.base_url,
            encode_segment(session),
            encode_segment(&self.secret)
        );
        let res = self.http.post(&url).json(&json!({})).send().await?;
        let status = res.status();
        let body: Value = res.json().await.unwrap_or(Value::Null);

        let token = body
            .get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty());
        match token {
            Some(token) if status.is_success() => {
                self.tokens.insert(session.to_string(), token.to_string());
                tracing::debug!(session, "Generated WPPConnect token");
                Ok(token.to_string())
            }
            _ => {
                let message = body
                    .get("message")
                    .or_else(|| body.get("error"))
                    .and_then(Value::as_str)
                    .unwrap_or("NO_TOKEN");
                Err(ProviderError::Token(message.to_string()))
            }
        }
    }

    async fn token(&self, session: &str) -> Result<String, ProviderError> {
        if let Some(token) = self.cached_token(session) {
            return Ok(token);
        }
        self.generate_token(session).await
    }

    fn cached_token(&self, session: &str) -> Option<String> {
        self.tokens.get(session).map(|t| t.clone())
    }

    /// Authenticated request; a 401 evicts the token and retries once
    async fn call(
        &self,
        method: Method,
        session: &str,
        tail: &str,
        body: Option<&Value>,
    ) -> Result<Value, ProviderError> {
        let url = self.session_url(session, tail);
        let mut retried = false;
        loop {
            let token = self.token(session).await?;
            let mut req = self.http.request(method.clone(), &url).bearer_auth(&token);
            if let Some(body) = body {
                req = req.json(body);
            }
            let res = req.send().await?;
            let status = res.status();
            let json: Value = res.json().await.unwrap_or(Value::Null);

            if status == StatusCode::UNAUTHORIZED {
                self.tokens.remove(session);
                if !retried {
                    retried = true;
                    tracing::info!(session, "WPPConnect token rejected, regenerating");
                    continue;
                }
            }
            if !status.is_success() {
                return Err(ProviderError::Status {
                    status: status.as_u16(),
                    message: error_message(&json, status),
                });
            }
            return Ok(json);
        }
    }

    /// Start (or resume) a session, waiting for the QR code
    pub async fn start_session(&self, session: &str) -> Result<SessionSnapshot, ProviderError> {
        let raw = self
            .call(
                Method::POST,
                session,
                "start-session",
                Some(&json!({ "waitQrCode": true })),
            )
            .await?;
        Ok(snapshot(raw))
    }

    /// Poll connection state
    pub async fn status(&self, session: &str) -> Result<SessionSnapshot, ProviderError> {
        let raw = self
            .call(Method::GET, session, "check-connection-session", None)
            .await?;
        Ok(snapshot(raw))
    }

    /// Fetch the current QR code as a data URL
    pub async fn qrcode(&self, session: &str) -> Result<String, ProviderError> {
        let raw = self
            .call(Method::GET, session, "qrcode-session", None)
            .await?;
        pick_qr_deep(&raw)
            .map(to_data_url)
            .ok_or(ProviderError::NoQrCode)
    }

    pub async fn logout(&self, session: &str) -> Result<Value, ProviderError> {
        let raw = self
            .call(Method::POST, session, "logout-session", Some(&json!({})))
            .await?;
        self.tokens.remove(session);
        Ok(raw)
    }

    pub async fn send_message(
        &self,
        session: &str,
        phone: &str,
        message: &str,
    ) -> Result<Value, ProviderError> {
        let (phone, message) = validate_outbound(phone, message)?;
        self.call(
            Method::POST,
            session,
            "send-message",
            Some(&json!({
                "phone": phone,
                "message": message,
                "isGroup": false,
                "isNewsletter": false,
                "isLid": false,
            })),
        )
        .await
    }
}

#[async_trait]
impl MessageSender for WppConnectClient {
    async fn send_text(&self, session: &str, phone: &str, text: &str) -> Result<Value, ProviderError> {
        self.send_message(session, phone, text).await
    }
}

/// Interpret a start/status answer
///
/// `start-session` answers `{status: "QRCODE", qrcode}`;
/// `check-connection-session` answers `{status: bool, message: "Connected"}`.
pub fn snapshot(raw: Value) -> SessionSnapshot {
    let event = match raw.get("status") {
        Some(Value::Bool(true)) => Some(SessionEvent::Connected),
        Some(Value::Bool(false)) => raw
            .get("message")
            .and_then(Value::as_str)
            .and_then(SessionEvent::from_provider)
            .or(Some(SessionEvent::Disconnected)),
        Some(Value::String(s)) => SessionEvent::from_provider(s),
        _ => raw
            .get("state")
            .and_then(Value::as_str)
            .and_then(SessionEvent::from_provider),
    };
    let qrcode = ["qrcode", "urlcode", "base64"]
        .iter()
        .find_map(|k| raw.get(*k).and_then(Value::as_str))
        .filter(|s| !s.trim().is_empty())
        .map(to_data_url);
    SessionSnapshot { event, qrcode, raw }
}

/// Percent-encode a single path segment
fn encode_segment(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_from_start_session() {
        let snap = snapshot(json!({"status": "QRCODE", "qrcode": "iVBORw0KGgo="}));
        assert_eq!(snap.event, Some(SessionEvent::QrIssued));
        assert_eq!(
            snap.qrcode.as_deref(),
            Some("data:image/png;base64,iVBORw0KGgo=")
        );
    }

    #[test]
    fn snapshot_from_connection_check() {
        assert_eq!(
            snapshot(json!({"status": true, "message": "Connected"})).event,
            Some(SessionEvent::Connected)
        );
        assert_eq!(
            snapshot(json!({"status": false, "message": "Disconnected"})).event,
            Some(SessionEvent::Disconnected)
        );
        assert_eq!(
            snapshot(json!({"status": false, "message": "browserClose"})).event,
            Some(SessionEvent::LoggedOut)
        );
        assert_eq!(snapshot(json!({"foo": 1})).event, None);
    }

    #[test]
    fn path_segments_are_encoded() {
        assert_eq!(encode_segment("loja 1/a"), "loja%201%2Fa");
        assert_eq!(encode_segment("main-session_2"), "main-session_2");
    }

    #[tokio::test]
    async fn missing_secret_is_a_config_error() {
        let client = WppConnectClient::new(reqwest::Client::new(), "http://127.0.0.1:9/", "");
        assert!(matches!(
            client.generate_token("main").await,
            Err(ProviderError::NotConfigured("WPP_SECRET"))
        ));
        assert!(client.cached_token("main").is_none());
    }

    #[tokio::test]
    async fn send_validates_before_calling_out() {
        let client = WppConnectClient::new(reqwest::Client::new(), "http://127.0.0.1:9", "s");
        assert!(matches!(
            client.send_message("main", "12", "oi").await,
            Err(ProviderError::InvalidPhone)
        ));
    }
}
