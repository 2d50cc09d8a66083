//! Data models
//!
//! Shared between wpp-server and API clients.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! IDs are snowflake `i64`, timestamps are epoch millis.

pub mod inbound;
pub mod menu;
pub mod rule;
pub mod session;
pub mod setting;

// Re-exports
pub use inbound::*;
pub use menu::*;
pub use rule::*;
pub use session::*;
pub use setting::*;
