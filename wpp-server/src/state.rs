//! Application state

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::alerts::AlertNotifier;
use crate::auth::RateLimiter;
use crate::config::Config;
use crate::error::BoxError;
use crate::provider::{MessageSender, WppConnectClient, ZApiClient};
use crate::responder::AutoResponder;

/// Default timeout of the shared HTTP client
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: PgPool,
    pub config: Arc<Config>,
    /// Per-IP limits for webhooks and engagement
    pub rate_limiter: RateLimiter,
    /// WPPConnect server client (sessions and replies)
    pub wpp: Arc<WppConnectClient>,
    pub responder: AutoResponder,
    pub alerts: AlertNotifier,
}

impl AppState {
    /// Connect, migrate and wire the providers
    pub async fn new(config: Config) -> Result<Self, BoxError> {
        let pool = PgPool::connect(&config.database_url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");

        Self::with_pool(config, pool)
    }

    /// Build the state around an existing pool
    pub fn with_pool(config: Config, pool: PgPool) -> Result<Self, BoxError> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        let wpp = Arc::new(WppConnectClient::new(
            http.clone(),
            &config.wpp_base_url,
            &config.wpp_secret,
        ));

        let alert_sender: Arc<dyn MessageSender> = match zapi_client(&config, http) {
            Some(zapi) => {
                tracing::info!("Alerts delivered through Z-API");
                Arc::new(zapi)
            }
            None => {
                tracing::info!(
                    session = %config.wpp_default_session,
                    "Z-API not configured, alerts delivered through WPPConnect"
                );
                wpp.clone()
            }
        };

        Ok(Self {
            responder: AutoResponder::new(pool.clone(), wpp.clone()),
            alerts: AlertNotifier::new(
                pool.clone(),
                alert_sender,
                config.wpp_default_session.clone(),
            ),
            pool,
            config: Arc::new(config),
            rate_limiter: RateLimiter::new(),
            wpp,
        })
    }

    /// State with a lazy pool and the given sender for replies and alerts
    #[cfg(test)]
    pub fn for_tests(sender: Arc<dyn MessageSender>) -> Self {
        let config = Config::for_tests();
        let pool = sqlx::postgres::PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy(&config.database_url)
            .expect("lazy pool");
        let wpp = Arc::new(WppConnectClient::new(
            reqwest::Client::new(),
            &config.wpp_base_url,
            &config.wpp_secret,
        ));
        Self {
            responder: AutoResponder::new(pool.clone(), sender.clone()),
            alerts: AlertNotifier::new(pool.clone(), sender, config.wpp_default_session.clone()),
            pool,
            config: Arc::new(config),
            rate_limiter: RateLimiter::new(),
            wpp,
        }
    }
}

/// Z-API client when instance id, token and client token are all set
fn zapi_client(config: &Config, http: reqwest::Client) -> Option<ZApiClient> {
    let (Some(id), Some(token), Some(client_token)) = (
        config.zapi_instance_id.as_deref(),
        config.zapi_instance_token.as_deref(),
        config.zapi_client_token.as_deref(),
    ) else {
        return None;
    };
    Some(ZApiClient::new(
        http,
        &config.zapi_base_url,
        id,
        token,
        client_token,
        config.zapi_timeout,
    ))
}
