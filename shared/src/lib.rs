//! Shared types for the WhatsApp responder service
//!
//! Error taxonomy, domain models, phone normalization and
//! time/ID helpers used by wpp-server and its API clients.

pub mod error;
pub mod models;
pub mod phone;
pub mod util;

// Re-exports
pub use axum::{Json, body};
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
