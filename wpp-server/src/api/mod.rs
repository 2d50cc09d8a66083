//! API routes for wpp-server

pub mod alerts;
pub mod bot;
pub mod export;
pub mod health;
pub mod menu;
pub mod rules;
pub mod sessions;
pub mod wpp_webhook;
pub mod zapi_webhook;

use axum::routing::get;
use axum::{Json, Router, middleware};
use http::{HeaderName, HeaderValue};
use serde_json::Value;
use shared::error::AppError;
use shared::models::Direction;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::auth::api_key::api_key_middleware;
use crate::db;
use crate::db::events::NewEvent;
use crate::state::AppState;
use crate::webhook::{LOG_PREVIEW_BYTES, payload_preview};

pub(crate) type ApiResult<T> = Result<Json<T>, AppError>;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Create the combined router
pub fn router(state: AppState) -> Router {
    // Admin API (x-api-key)
    let admin = Router::new()
        .merge(sessions::router())
        .merge(rules::router())
        .merge(bot::router())
        .merge(alerts::router())
        .merge(menu::admin_router())
        .merge(export::router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api_key_middleware,
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(wpp_webhook::router(&state))
        .merge(zapi_webhook::router(&state))
        .merge(menu::public_router(&state))
        .merge(admin)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        // Set must wrap Propagate so the id exists before it is copied out
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            REQUEST_ID_HEADER,
        )))
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
            XRequestId,
        ))
        .with_state(state)
}

/// Write a raw webhook audit row; failures are logged
pub(crate) async fn audit(
    state: &AppState,
    provider: &str,
    session_key: Option<&str>,
    event_type: &str,
    phone: Option<&str>,
    direction: Option<Direction>,
    payload: &Value,
) {
    let preview = payload_preview(payload, LOG_PREVIEW_BYTES);
    let event = NewEvent {
        provider,
        session_key,
        event_type,
        phone,
        direction: direction.map(|d| d.as_str()),
        payload: &preview,
    };
    if let Err(e) = db::events::insert(&state.pool, &event).await {
        tracing::error!(error = %e, provider, event_type, "Failed to write webhook audit row");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockSender;
    use axum::body::Body;
    use http::{Method, Request, StatusCode, header};
    use std::sync::Arc;
    use tower::ServiceExt;

    const SECRET: &str = "test-webhook-secret";
    const API_KEY: &str = "test-api-key";

    fn app() -> Router {
        router(AppState::for_tests(Arc::new(MockSender::default())))
    }

    async fn body_json(res: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn wpp_post(secret: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/api/wpp/webhook")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(secret) = secret {
            builder = builder.header("x-wpp-webhook-secret", secret);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let res = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key(REQUEST_ID_HEADER));
        assert_eq!(body_json(res).await["service"], "wpp-server");
    }

    #[tokio::test]
    async fn webhook_rejects_other_methods() {
        let res = app()
            .oneshot(Request::get("/api/wpp/webhook").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.headers()[header::ALLOW], "POST");
    }

    #[tokio::test]
    async fn webhook_requires_secret() {
        let app = app();
        let missing = app
            .clone()
            .oneshot(wpp_post(None, r#"{"event":"onack"}"#))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let wrong = app
            .oneshot(wpp_post(Some("nope"), r#"{"event":"onack"}"#))
            .await
            .unwrap();
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn webhook_rejects_bad_json() {
        let res = app()
            .oneshot(wpp_post(Some(SECRET), "{not json"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn webhook_acks_unhandled_events() {
        let res = app()
            .oneshot(wpp_post(Some(SECRET), r#"{"event":"onpresencechanged","session":"loja"}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await, serde_json::json!({ "ok": true }));
    }

    #[tokio::test]
    async fn webhook_is_rate_limited_per_ip() {
        // Test config allows 2 requests per minute
        let app = app();
        for _ in 0..2 {
            let res = app
                .clone()
                .oneshot(wpp_post(Some(SECRET), r#"{"event":"onack"}"#))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }
        let res = app
            .oneshot(wpp_post(Some(SECRET), r#"{"event":"onack"}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(res.headers().contains_key(header::RETRY_AFTER));
    }

    #[tokio::test]
    async fn zapi_acks_invalid_json() {
        let res = app()
            .oneshot(
                Request::post("/webhooks/zapi/received")
                    .body(Body::from("<xml/>"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["ok"], true);
    }

    #[tokio::test]
    async fn zapi_rejects_oversized_bodies() {
        let big = vec![b'a'; zapi_webhook::MAX_BODY_BYTES + 1];
        let res = app()
            .oneshot(
                Request::post("/webhooks/zapi/received")
                    .body(Body::from(big))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn admin_routes_require_api_key() {
        let app = app();
        let missing = app
            .clone()
            .oneshot(Request::get("/api/admin/sessions").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let wrong = app
            .oneshot(
                Request::get("/api/admin/rules")
                    .header("x-api-key", "wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn export_validates_format_before_loading() {
        let res = app()
            .oneshot(
                Request::get("/api/admin/export?format=xlsx&context=menu-items-price-variations")
                    .header("x-api-key", API_KEY)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = app()
            .oneshot(
                Request::get("/api/admin/export?format=csv&context=undefined")
                    .header("x-api-key", API_KEY)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn engagement_checks_origin() {
        let res = app()
            .oneshot(
                Request::post("/api/menu/1/like")
                    .header(header::ORIGIN, "https://evil.example.net")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn engagement_rejects_bad_item_id_and_issues_cookie() {
        let res = app()
            .oneshot(
                Request::post("/api/menu/abc/like")
                    .header(header::ORIGIN, "https://cardapio.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let cookie = res.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("rate_limit_id="));
    }

    #[tokio::test]
    async fn engagement_keeps_existing_cookie() {
        let res = app()
            .oneshot(
                Request::post("/api/menu/0/share")
                    .header(header::COOKIE, "rate_limit_id=known-client")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(!res.headers().contains_key(header::SET_COOKIE));
    }
}
