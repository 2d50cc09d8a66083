//! Unified error codes for the responder service
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: WhatsApp session errors
//! - 3xxx: Auto-responder errors
//! - 4xxx: Menu / engagement errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,
    /// HTTP method not allowed on this route
    MethodNotAllowed = 8,
    /// Request body exceeds the route limit
    PayloadTooLarge = 9,
    /// Too many requests from this client
    TooManyRequests = 10,

    // ==================== 1xxx: Auth ====================
    /// Caller is not authenticated
    NotAuthenticated = 1001,
    /// Webhook secret header missing or wrong
    WebhookSecretInvalid = 1002,
    /// API key missing or wrong
    ApiKeyInvalid = 1003,
    /// Request origin is not allowed
    OriginNotAllowed = 1004,

    // ==================== 2xxx: Session ====================
    /// Session not found
    SessionNotFound = 2001,
    /// Session is not connected
    SessionNotConnected = 2002,
    /// Provider did not return a QR code
    QrCodeUnavailable = 2003,
    /// Provider refused to issue a token
    TokenUnavailable = 2004,

    // ==================== 3xxx: Auto-responder ====================
    /// Rule not found
    RuleNotFound = 3001,
    /// Rule regex does not compile
    RuleInvalidRegex = 3002,
    /// Rule active window is inverted
    RuleInvalidWindow = 3003,
    /// Phone number is not valid
    InvalidPhone = 3004,
    /// Message text is empty
    EmptyMessage = 3005,

    // ==================== 4xxx: Menu ====================
    /// Menu item not found
    MenuItemNotFound = 4001,
    /// Export format not supported
    ExportFormatInvalid = 4002,
    /// Export context not supported
    ExportContextInvalid = 4003,
    /// Export has no rows
    ExportEmpty = 4004,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9003,
    /// Upstream WhatsApp provider failed
    ProviderError = 9101,
    /// Upstream WhatsApp provider timed out
    ProviderTimeout = 9102,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::MethodNotAllowed => "Method not allowed",
            ErrorCode::PayloadTooLarge => "Payload too large",
            ErrorCode::TooManyRequests => "Too many requests, try again later",

            // Auth
            ErrorCode::NotAuthenticated => "Not authenticated",
            ErrorCode::WebhookSecretInvalid => "Unauthorized",
            ErrorCode::ApiKeyInvalid => "Invalid API key",
            ErrorCode::OriginNotAllowed => "Origin not allowed",

            // Session
            ErrorCode::SessionNotFound => "Session not found",
            ErrorCode::SessionNotConnected => "Session is not connected",
            ErrorCode::QrCodeUnavailable => "QR code not available",
            ErrorCode::TokenUnavailable => "Provider token not available",

            // Auto-responder
            ErrorCode::RuleNotFound => "Rule not found",
            ErrorCode::RuleInvalidRegex => "Rule trigger is not a valid regex",
            ErrorCode::RuleInvalidWindow => "Rule active window ends before it starts",
            ErrorCode::InvalidPhone => "Invalid phone. Use E.164 digits without '+'",
            ErrorCode::EmptyMessage => "Message cannot be empty",

            // Menu
            ErrorCode::MenuItemNotFound => "Menu item not found",
            ErrorCode::ExportFormatInvalid => "Invalid export format",
            ErrorCode::ExportContextInvalid => "Invalid export context",
            ErrorCode::ExportEmpty => "No data found for the requested context",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::ConfigError => "Server misconfiguration",
            ErrorCode::ProviderError => "WhatsApp provider request failed",
            ErrorCode::ProviderTimeout => "WhatsApp provider request timed out",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::MethodNotAllowed),
            9 => Ok(ErrorCode::PayloadTooLarge),
            10 => Ok(ErrorCode::TooManyRequests),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1002 => Ok(ErrorCode::WebhookSecretInvalid),
            1003 => Ok(ErrorCode::ApiKeyInvalid),
            1004 => Ok(ErrorCode::OriginNotAllowed),

            // Session
            2001 => Ok(ErrorCode::SessionNotFound),
            2002 => Ok(ErrorCode::SessionNotConnected),
            2003 => Ok(ErrorCode::QrCodeUnavailable),
            2004 => Ok(ErrorCode::TokenUnavailable),

            // Auto-responder
            3001 => Ok(ErrorCode::RuleNotFound),
            3002 => Ok(ErrorCode::RuleInvalidRegex),
            3003 => Ok(ErrorCode::RuleInvalidWindow),
            3004 => Ok(ErrorCode::InvalidPhone),
            3005 => Ok(ErrorCode::EmptyMessage),

            // Menu
            4001 => Ok(ErrorCode::MenuItemNotFound),
            4002 => Ok(ErrorCode::ExportFormatInvalid),
            4003 => Ok(ErrorCode::ExportContextInvalid),
            4004 => Ok(ErrorCode::ExportEmpty),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::ConfigError),
            9101 => Ok(ErrorCode::ProviderError),
            9102 => Ok(ErrorCode::ProviderTimeout),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
