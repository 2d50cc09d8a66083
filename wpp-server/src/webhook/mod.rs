//! Provider webhook normalization
//!
//! Each provider gets a pure function from raw JSON to
//! [`shared::models::WebhookEvent`]; nothing here touches the database.

pub mod qr;
pub mod wppconnect;
pub mod zapi;

pub use wppconnect::normalize_wppconnect;
pub use zapi::{ZapiEventKind, normalize_zapi};

use serde_json::Value;

/// Default cap for payloads written to logs
pub const LOG_PREVIEW_BYTES: usize = 10_000;

const TRUNCATED_SUFFIX: &str = "...<truncated>";

/// Serialize a payload for logs, cut at `max_bytes` on a char boundary
pub fn payload_preview(payload: &Value, max_bytes: usize) -> String {
    let full = payload.to_string();
    if full.len() <= max_bytes {
        return full;
    }
    let mut cut = max_bytes;
    while !full.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}{TRUNCATED_SUFFIX}", &full[..cut])
}

pub(crate) fn non_blank(s: &str) -> Option<&str> {
    let t = s.trim();
    (!t.is_empty()).then_some(t)
}

/// Provider timestamps come in seconds or millis; anything else means now
pub(crate) fn timestamp_millis(value: Option<&Value>) -> i64 {
    match value.and_then(Value::as_i64) {
        Some(ts) if ts > 0 && ts < 100_000_000_000 => ts * 1000,
        Some(ts) if ts > 0 => ts,
        _ => shared::util::now_millis(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn preview_passes_small_payloads() {
        let v = json!({"a": 1});
        assert_eq!(payload_preview(&v, 100), r#"{"a":1}"#);
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let v = json!("ééééé");
        // "\"é" is 3 bytes, cutting at 2 must back off to 1
        assert_eq!(payload_preview(&v, 2), "\"...<truncated>");
        assert!(payload_preview(&v, 4).ends_with(TRUNCATED_SUFFIX));
    }

    #[test]
    fn timestamps_in_seconds_are_scaled() {
        assert_eq!(timestamp_millis(Some(&json!(1_700_000_000))), 1_700_000_000_000);
        assert_eq!(
            timestamp_millis(Some(&json!(1_700_000_000_123_i64))),
            1_700_000_000_123
        );
        assert!(timestamp_millis(None) > 0);
    }
}
