//! QR code extraction from provider answers

use std::collections::VecDeque;

use serde_json::Value;

/// Keys that usually hold the QR payload, searched first at every level
const PREFERRED_KEYS: [&str; 7] = ["base64", "qr", "qrcode", "qrCode", "code", "image", "result"];

const DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Breadth-first search for the first non-blank string, visiting preferred
/// keys before the others at each object level
pub fn pick_qr_deep(value: &Value) -> Option<&str> {
    let mut queue: VecDeque<&Value> = VecDeque::from([value]);
    while let Some(current) = queue.pop_front() {
        match current {
            Value::String(s) if !s.trim().is_empty() => return Some(s.as_str()),
            Value::Object(map) => {
                for key in PREFERRED_KEYS {
                    if let Some(v) = map.get(key) {
                        queue.push_back(v);
                    }
                }
                for (key, v) in map {
                    if !PREFERRED_KEYS.contains(&key.as_str()) {
                        queue.push_back(v);
                    }
                }
            }
            Value::Array(items) => queue.extend(items.iter()),
            _ => {}
        }
    }
    None
}

/// Turn a raw base64 payload into a PNG data URL; data URLs pass through
pub fn to_data_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("data:image") {
        return trimmed.to_string();
    }
    let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    format!("{DATA_URL_PREFIX}{compact}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prefers_known_keys_over_others() {
        let v = json!({"status": "QRCODE", "qrcode": "AAA"});
        assert_eq!(pick_qr_deep(&v), Some("AAA"));
    }

    #[test]
    fn searches_nested_objects_breadth_first() {
        let v = json!({"data": {"inner": {"base64": "DEEP"}}, "meta": {"qr": "SHALLOW"}});
        assert_eq!(pick_qr_deep(&v), Some("SHALLOW"));
    }

    #[test]
    fn skips_blank_strings() {
        let v = json!({"qrcode": "  ", "result": ["", "XYZ"]});
        assert_eq!(pick_qr_deep(&v), Some("XYZ"));
        assert_eq!(pick_qr_deep(&json!({"n": 1, "b": true})), None);
    }

    #[test]
    fn data_url_prefixing() {
        assert_eq!(to_data_url(" ab\ncd "), "data:image/png;base64,abcd");
        assert_eq!(
            to_data_url("data:image/png;base64,xyz"),
            "data:image/png;base64,xyz"
        );
    }
}
