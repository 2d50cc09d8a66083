//! Application-layer rate limiting for webhooks and menu engagement

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared::error::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::extract_ip;
use crate::state::AppState;

/// Bucket for Z-API callbacks
pub const ZAPI_WEBHOOK_BUCKET: &str = "zapi-webhook";
/// Bucket for WPPConnect callbacks
pub const WPP_WEBHOOK_BUCKET: &str = "wpp-webhook";

/// Entries idle longer than this are dropped by `cleanup`
const MAX_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

struct Entry {
    count: u32,
    window_start: Instant,
    window: Duration,
}

/// Outcome of one rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// Seconds until the window resets (0 when allowed)
    pub retry_after_secs: u64,
}

/// One bucket to consume in [`RateLimiter::consume_all`]
#[derive(Debug, Clone)]
pub struct RateKey {
    pub bucket: &'static str,
    pub key: String,
    pub limit: u32,
    pub window: Duration,
}

#[derive(Clone, Default)]
pub struct RateLimiter {
    /// bucket name -> (key -> entry)
    inner: Arc<Mutex<HashMap<&'static str, HashMap<String, Entry>>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request for `key` in `bucket`
    pub async fn check(
        &self,
        bucket: &'static str,
        key: &str,
        limit: u32,
        window: Duration,
    ) -> RateDecision {
        let mut map = self.inner.lock().await;
        consume(map.entry(bucket).or_default(), key, limit, window, Instant::now())
    }

    /// Consume several buckets in order, stopping at the first denial
    pub async fn consume_all(&self, keys: &[RateKey]) -> RateDecision {
        let mut map = self.inner.lock().await;
        let now = Instant::now();
        let mut last = RateDecision {
            allowed: true,
            remaining: u32::MAX,
            retry_after_secs: 0,
        };
        for k in keys {
            let decision = consume(map.entry(k.bucket).or_default(), &k.key, k.limit, k.window, now);
            if !decision.allowed {
                return decision;
            }
            last.remaining = last.remaining.min(decision.remaining);
        }
        last
    }

    /// Remove entries whose window has expired
    pub async fn cleanup(&self) {
        let mut map = self.inner.lock().await;
        let now = Instant::now();

        for bucket in map.values_mut() {
            bucket.retain(|_, entry| {
                let age = now.duration_since(entry.window_start);
                age < entry.window && age < MAX_WINDOW
            });
        }

        // Remove empty buckets
        map.retain(|_, bucket| !bucket.is_empty());
    }

    #[cfg(test)]
    async fn tracked_keys(&self) -> usize {
        self.inner.lock().await.values().map(HashMap::len).sum()
    }
}

fn consume(
    bucket: &mut HashMap<String, Entry>,
    key: &str,
    limit: u32,
    window: Duration,
    now: Instant,
) -> RateDecision {
    let entry = bucket.entry(key.to_owned()).or_insert_with(|| Entry {
        count: 0,
        window_start: now,
        window,
    });

    // Reset window if expired
    if now.duration_since(entry.window_start) >= entry.window {
        entry.count = 0;
        entry.window_start = now;
        entry.window = window;
    }

    if entry.count >= limit {
        let elapsed = now.duration_since(entry.window_start);
        let left = entry.window.saturating_sub(elapsed);
        return RateDecision {
            allowed: false,
            remaining: 0,
            retry_after_secs: left.as_secs_f64().ceil().max(1.0) as u64,
        };
    }

    entry.count += 1;
    RateDecision {
        allowed: true,
        remaining: limit - entry.count,
        retry_after_secs: 0,
    }
}

async fn webhook_limit(
    state: &AppState,
    bucket: &'static str,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let ip = extract_ip(&request);
    let decision = state
        .rate_limiter
        .check(
            bucket,
            &ip,
            state.config.webhook_rate_limit_per_minute,
            Duration::from_secs(60),
        )
        .await;
    if !decision.allowed {
        tracing::warn!(bucket, ip = %ip, "Webhook rate limit exceeded");
        return Err(AppError::too_many_requests(decision.retry_after_secs).into_response());
    }
    Ok(next.run(request).await)
}

/// Rate limit middleware for Z-API callbacks (per IP per minute)
pub async fn zapi_webhook_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    webhook_limit(&state, ZAPI_WEBHOOK_BUCKET, request, next).await
}

/// Rate limit middleware for WPPConnect callbacks (per IP per minute)
pub async fn wpp_webhook_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    webhook_limit(&state, WPP_WEBHOOK_BUCKET, request, next).await
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn allows_up_to_limit_then_denies() {
        let limiter = RateLimiter::new();
        let first = limiter.check("t", "1.1.1.1", 2, MINUTE).await;
        assert!(first.allowed);
        assert_eq!(first.remaining, 1);
        assert!(limiter.check("t", "1.1.1.1", 2, MINUTE).await.allowed);

        let denied = limiter.check("t", "1.1.1.1", 2, MINUTE).await;
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert!(denied.retry_after_secs >= 1 && denied.retry_after_secs <= 60);
    }

    #[tokio::test]
    async fn buckets_and_keys_are_independent() {
        let limiter = RateLimiter::new();
        assert!(limiter.check("a", "ip", 1, MINUTE).await.allowed);
        assert!(limiter.check("b", "ip", 1, MINUTE).await.allowed);
        assert!(limiter.check("a", "other", 1, MINUTE).await.allowed);
        assert!(!limiter.check("a", "ip", 1, MINUTE).await.allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn window_resets_after_expiry() {
        let limiter = RateLimiter::new();
        assert!(limiter.check("t", "ip", 1, MINUTE).await.allowed);
        assert!(!limiter.check("t", "ip", 1, MINUTE).await.allowed);
        tokio::time::advance(MINUTE).await;
        assert!(limiter.check("t", "ip", 1, MINUTE).await.allowed);
    }

    #[tokio::test]
    async fn consume_all_stops_at_first_denied_bucket() {
        let limiter = RateLimiter::new();
        let day = Duration::from_secs(86_400);
        let keys = vec![
            RateKey {
                bucket: "item",
                key: "1:ip:rid".into(),
                limit: 1,
                window: day,
            },
            RateKey {
                bucket: "client",
                key: "ip:rid".into(),
                limit: 20,
                window: day,
            },
        ];
        assert!(limiter.consume_all(&keys).await.allowed);
        assert!(!limiter.consume_all(&keys).await.allowed);

        // The denied call must not have consumed the second bucket
        let client = limiter.check("client", "ip:rid", 20, day).await;
        assert_eq!(client.remaining, 18);
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_drops_expired_entries() {
        let limiter = RateLimiter::new();
        limiter.check("short", "ip", 5, MINUTE).await;
        limiter.check("long", "ip", 5, Duration::from_secs(3600)).await;
        tokio::time::advance(Duration::from_secs(120)).await;
        limiter.cleanup().await;
        assert_eq!(limiter.tracked_keys().await, 1);
    }
}
