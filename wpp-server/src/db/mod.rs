//! Database access layer
//!
//! Free async functions over `&PgPool`; one module per table group.

pub mod crm;
pub mod engagement;
pub mod events;
pub mod menu;
pub mod optouts;
pub mod responder_logs;
pub mod rules;
pub mod sessions;
pub mod settings;
