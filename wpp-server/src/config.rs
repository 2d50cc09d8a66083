//! Server configuration

use std::time::Duration;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// Shared secret expected on the WPPConnect webhook
    pub wpp_webhook_secret: String,
    /// Header carrying the webhook secret
    pub wpp_webhook_secret_header: String,
    /// Admin API key (`x-api-key`)
    pub api_key: String,
    /// WPPConnect server base URL
    pub wpp_base_url: String,
    /// WPPConnect server secret (token generation)
    pub wpp_secret: String,
    /// Session used for alerts and quick replies
    pub wpp_default_session: String,
    /// Z-API base URL
    pub zapi_base_url: String,
    pub zapi_instance_id: Option<String>,
    pub zapi_instance_token: Option<String>,
    pub zapi_client_token: Option<String>,
    /// Z-API request timeout
    pub zapi_timeout: Duration,
    /// Webhook requests per IP per minute
    pub webhook_rate_limit_per_minute: u32,
    /// Origins allowed to like/share; empty allows all
    pub allowed_origins: Vec<String>,
    /// Public menu URL quoted in alerts
    pub public_menu_url: String,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    fn optional(name: &str) -> Option<String> {
        std::env::var(name)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            wpp_webhook_secret: Self::require_secret("WPP_WEBHOOK_SECRET", &environment)?,
            wpp_webhook_secret_header: Self::optional("WPP_WEBHOOK_SECRET_HEADER")
                .map(|h| h.to_ascii_lowercase())
                .unwrap_or_else(|| "x-wpp-webhook-secret".into()),
            api_key: Self::require_secret("API_KEY", &environment)?,
            wpp_base_url: Self::optional("WPP_BASE_URL")
                .unwrap_or_else(|| "http://localhost:21465".into()),
            wpp_secret: Self::require_secret("WPP_SECRET", &environment)?,
            wpp_default_session: Self::optional("WPP_DEFAULT_SESSION")
                .unwrap_or_else(|| "default".into()),
            zapi_base_url: Self::optional("ZAPI_BASE_URL")
                .unwrap_or_else(|| "https://api.z-api.io".into()),
            zapi_instance_id: Self::optional("ZAPI_INSTANCE_ID"),
            zapi_instance_token: Self::optional("ZAPI_INSTANCE_TOKEN"),
            zapi_client_token: Self::optional("ZAPI_CLIENT_TOKEN"),
            zapi_timeout: Duration::from_millis(
                std::env::var("ZAPI_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(15_000),
            ),
            webhook_rate_limit_per_minute: std::env::var("WEBHOOK_RATE_LIMIT_PER_MINUTE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(60),
            allowed_origins: Self::optional("ALLOWED_ORIGINS")
                .map(|v| parse_origin_list(&v))
                .unwrap_or_default(),
            public_menu_url: Self::optional("PUBLIC_MENU_URL")
                .unwrap_or_else(|| "http://localhost:8080/api/menu".into()),
            environment,
        })
    }

    /// Configuration for router tests
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: "postgres://localhost/wpp_test".into(),
            http_port: 0,
            environment: "development".into(),
            wpp_webhook_secret: "test-webhook-secret".into(),
            wpp_webhook_secret_header: "x-wpp-webhook-secret".into(),
            api_key: "test-api-key".into(),
            wpp_base_url: "http://127.0.0.1:9".into(),
            wpp_secret: "test-wpp-secret".into(),
            wpp_default_session: "default".into(),
            zapi_base_url: "http://127.0.0.1:9".into(),
            zapi_instance_id: None,
            zapi_instance_token: None,
            zapi_client_token: None,
            zapi_timeout: Duration::from_millis(200),
            webhook_rate_limit_per_minute: 2,
            allowed_origins: vec!["https://cardapio.example.com".into()],
            public_menu_url: "https://cardapio.example.com".into(),
        }
    }
}

/// Split a comma separated origin list, dropping blanks and trailing slashes
pub fn parse_origin_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/').to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
