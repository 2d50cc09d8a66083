//! Origin allow-list for browser-facing engagement endpoints

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http::header::{ORIGIN, REFERER};
use shared::error::{AppError, ErrorCode};

use crate::state::AppState;

/// Scheme and host of a URL, lowercased, without path
fn origin_of(url: &str) -> Option<String> {
    let url = url.trim();
    let (scheme, rest) = url.split_once("://")?;
    let host = rest.split(['/', '?', '#']).next().filter(|h| !h.is_empty())?;
    Some(format!("{}://{}", scheme.to_ascii_lowercase(), host.to_ascii_lowercase()))
}

/// Whether `origin` (or `referer` when no origin is sent) is allowed.
///
/// An empty allow-list allows everything; a request with neither header passes.
pub fn is_allowed(allowed: &[String], origin: Option<&str>, referer: Option<&str>) -> bool {
    if allowed.is_empty() {
        return true;
    }
    let Some(source) = origin.or(referer) else {
        return true;
    };
    origin_of(source).is_some_and(|o| allowed.iter().any(|a| *a == o))
}

pub async fn origin_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let headers = request.headers();
    let origin = headers.get(ORIGIN).and_then(|v| v.to_str().ok());
    let referer = headers.get(REFERER).and_then(|v| v.to_str().ok());

    if !is_allowed(&state.config.allowed_origins, origin, referer) {
        tracing::warn!(origin, referer, "Origin not allowed");
        return Err(AppError::new(ErrorCode::OriginNotAllowed).into_response());
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        vec!["https://cardapio.example.com".into()]
    }

    #[test]
    fn empty_list_allows_all() {
        assert!(is_allowed(&[], Some("https://evil.test"), None));
    }

    #[test]
    fn origin_must_be_listed() {
        assert!(is_allowed(&allowed(), Some("https://Cardapio.example.com"), None));
        assert!(!is_allowed(&allowed(), Some("https://evil.test"), None));
    }

    #[test]
    fn referer_is_used_without_origin() {
        assert!(is_allowed(
            &allowed(),
            None,
            Some("https://cardapio.example.com/menu?x=1")
        ));
        assert!(!is_allowed(&allowed(), None, Some("http://cardapio.example.com/")));
        assert!(!is_allowed(&allowed(), None, Some("garbage")));
    }
}
