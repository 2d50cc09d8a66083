//! Request guards: webhook secret, admin API key, origin, rate limits

pub mod api_key;
pub mod client_id;
pub mod origin;
pub mod rate_limit;
pub mod webhook_secret;

pub use client_id::{ClientId, ClientIp};
pub use rate_limit::{RateKey, RateLimiter};

use axum::extract::{ConnectInfo, Request};
use std::net::SocketAddr;
use subtle::ConstantTimeEq;

/// Client IP placeholder when no header or peer address is available
pub const UNKNOWN_IP: &str = "unknown";

/// Headers consulted after `x-forwarded-for`, in order
const SINGLE_IP_HEADERS: [&str; 3] = ["x-real-ip", "cf-connecting-ip", "fly-client-ip"];

/// Extract client IP from request (proxy headers, then peer address)
pub fn extract_ip(request: &Request) -> String {
    let headers = request.headers();
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(first) = header("x-forwarded-for")
        .and_then(|xff| xff.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return first.to_string();
    }
    if let Some(ip) = SINGLE_IP_HEADERS.iter().find_map(|name| header(name)) {
        return ip.to_string();
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_IP.to_string())
}

/// Constant-time string comparison for shared secrets
pub fn secret_matches(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}
