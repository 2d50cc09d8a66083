//! Admin API key guard (`x-api-key`)

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared::error::{AppError, ErrorCode};

use super::secret_matches;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Middleware for `/api/admin/*`; an unset key rejects everything
pub async fn api_key_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let expected = state.config.api_key.as_str();
    if expected.is_empty() || !secret_matches(provided, expected) {
        tracing::debug!(path = %request.uri().path(), "Admin API key rejected");
        return Err(AppError::new(ErrorCode::ApiKeyInvalid).into_response());
    }
    Ok(next.run(request).await)
}
