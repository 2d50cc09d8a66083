//! Z-API client

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{MessageSender, ProviderError, validate_outbound};

/// Max chars of an upstream error body echoed in errors
const ERROR_BODY_PREVIEW: usize = 400;

pub struct ZApiClient {
    http: reqwest::Client,
    base_url: String,
    instance_id: String,
    instance_token: String,
    client_token: String,
    timeout: Duration,
}

impl ZApiClient {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        instance_id: &str,
        instance_token: &str,
        client_token: &str,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            instance_id: instance_id.to_string(),
            instance_token: instance_token.to_string(),
            client_token: client_token.to_string(),
            timeout,
        }
    }

    fn instance_url(&self, tail: &str) -> String {
        format!(
            "{}/instances/{}/token/{}/{}",
            self.base_url, self.instance_id, self.instance_token, tail
        )
    }

    pub async fn send_text(&self, phone: &str, message: &str) -> Result<Value, ProviderError> {
        let (phone, message) = validate_outbound(phone, message)?;
        let res = self
            .http
            .post(self.instance_url("send-text"))
            .header("Client-Token", &self.client_token)
            .timeout(self.timeout)
            .json(&json!({ "phone": phone, "message": message }))
            .send()
            .await?;

        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            let preview = if text.is_empty() {
                "no body".to_string()
            } else {
                text.chars().take(ERROR_BODY_PREVIEW).collect()
            };
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message: format!("Z-API request failed ({}): {preview}", status.as_u16()),
            });
        }
        if text.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}

#[async_trait]
impl MessageSender for ZApiClient {
    async fn send_text(&self, _session: &str, phone: &str, text: &str) -> Result<Value, ProviderError> {
        ZApiClient::send_text(self, phone, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ZApiClient {
        ZApiClient::new(
            reqwest::Client::new(),
            "https://api.z-api.io/",
            "INST",
            "TOK",
            "CT",
            Duration::from_millis(50),
        )
    }

    #[test]
    fn builds_instance_path() {
        assert_eq!(
            client().instance_url("send-text"),
            "https://api.z-api.io/instances/INST/token/TOK/send-text"
        );
    }

    #[tokio::test]
    async fn rejects_blank_message() {
        assert!(matches!(
            client().send_text("5511999998888", " ").await,
            Err(ProviderError::EmptyMessage)
        ));
    }
}
