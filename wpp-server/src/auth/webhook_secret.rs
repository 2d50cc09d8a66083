//! Shared-secret guard for the WPPConnect webhook

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared::error::{AppError, ErrorCode};

use super::secret_matches;
use crate::state::AppState;

/// Check the configured secret header against `WPP_WEBHOOK_SECRET`
pub fn verify(expected: &str, provided: Option<&str>) -> Result<(), AppError> {
    if expected.is_empty() {
        tracing::error!("WPP_WEBHOOK_SECRET is not configured");
        return Err(AppError::with_message(
            ErrorCode::ConfigError,
            "server misconfiguration",
        ));
    }
    match provided {
        Some(value) if secret_matches(value, expected) => Ok(()),
        _ => Err(AppError::new(ErrorCode::WebhookSecretInvalid)),
    }
}

/// Middleware rejecting webhook calls without the shared secret
pub async fn webhook_secret_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let provided = request
        .headers()
        .get(state.config.wpp_webhook_secret_header.as_str())
        .and_then(|v| v.to_str().ok());

    if let Err(e) = verify(&state.config.wpp_webhook_secret, provided) {
        if e.code == ErrorCode::WebhookSecretInvalid {
            tracing::warn!(ip = %super::extract_ip(&request), "Webhook secret rejected");
        }
        return Err(e.into_response());
    }
    Ok(next.run(request).await)
}
