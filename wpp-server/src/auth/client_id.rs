//! Anonymous `rate_limit_id` cookie identifying a browser

use axum::{extract::Request, middleware::Next, response::Response};
use http::HeaderValue;
use http::header::{COOKIE, SET_COOKIE};

pub const COOKIE_NAME: &str = "rate_limit_id";
const MAX_AGE_SECS: u64 = 30 * 24 * 60 * 60;

/// Client id from the cookie, inserted as a request extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId(pub String);

/// Caller IP as seen by [`super::extract_ip`], inserted alongside [`ClientId`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

/// Value of the `rate_limit_id` cookie, if any
pub fn from_cookie_header(cookie: &str) -> Option<String> {
    cookie.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == COOKIE_NAME && !value.trim().is_empty()).then(|| value.trim().to_string())
    })
}

pub fn set_cookie_value(id: &str) -> String {
    format!("{COOKIE_NAME}={id}; Path=/; Max-Age={MAX_AGE_SECS}; HttpOnly; SameSite=Lax; Secure")
}

/// Attach [`ClientId`] and [`ClientIp`] to the request, issuing a new cookie when absent
pub async fn client_id_middleware(mut request: Request, next: Next) -> Response {
    let existing = request
        .headers()
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(from_cookie_header);

    let (id, issued) = match existing {
        Some(id) => (id, false),
        None => (uuid::Uuid::new_v4().to_string(), true),
    };
    let ip = super::extract_ip(&request);
    request.extensions_mut().insert(ClientId(id.clone()));
    request.extensions_mut().insert(ClientIp(ip));

    let mut response = next.run(request).await;
    if issued && let Ok(value) = HeaderValue::from_str(&set_cookie_value(&id)) {
        response.headers_mut().append(SET_COOKIE, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_cookie_among_others() {
        assert_eq!(
            from_cookie_header("theme=dark; rate_limit_id=abc-123; x=1").as_deref(),
            Some("abc-123")
        );
        assert_eq!(from_cookie_header("rate_limit_id=; theme=dark"), None);
        assert_eq!(from_cookie_header("other=1"), None);
    }

    #[test]
    fn cookie_attributes() {
        let v = set_cookie_value("id-1");
        assert!(v.starts_with("rate_limit_id=id-1;"));
        for attr in ["HttpOnly", "SameSite=Lax", "Secure", "Path=/", "Max-Age=2592000"] {
            assert!(v.contains(attr), "missing {attr}");
        }
    }
}
