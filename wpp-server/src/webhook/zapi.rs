//! Z-API webhook normalizer
//!
//! Z-API payload shapes vary per message type, so fields are found by a
//! breadth-first search over case-insensitive key lists.

use std::collections::VecDeque;

use serde::Serialize;
use serde_json::Value;
use shared::models::{InboundMessage, Provider, SessionEvent, WebhookEvent};
use shared::phone::{normalize_phone, strip_jid};

const PHONE_KEYS: [&str; 8] = [
    "phone",
    "from",
    "participant",
    "sender",
    "chatid",
    "chat_id",
    "number",
    "remotejid",
];
const MESSAGE_KEYS: [&str; 6] = ["text", "message", "body", "content", "caption", "conversation"];
const MESSAGE_TYPE_KEYS: [&str; 3] = ["type", "messagetype", "typemessage"];
const INSTANCE_KEYS: [&str; 2] = ["instanceid", "instance_id"];

/// Which Z-API callback delivered the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ZapiEventKind {
    Received,
    Disconnected,
}

impl ZapiEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Disconnected => "disconnected",
        }
    }
}

/// Fields pulled out of a Z-API callback
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedZapiEvent {
    pub event: ZapiEventKind,
    pub phone: Option<String>,
    pub message_text: Option<String>,
    pub message_type: Option<String>,
    pub instance_id: Option<String>,
    pub from_me: bool,
    pub sender_name: Option<String>,
}

impl NormalizedZapiEvent {
    /// Convert into the canonical event; `session` names the Z-API instance
    pub fn into_event(self, session: &str, received_at: i64) -> WebhookEvent {
        match self.event {
            ZapiEventKind::Disconnected => WebhookEvent::Status {
                session: self.instance_id.unwrap_or_else(|| session.to_string()),
                event: SessionEvent::LoggedOut,
                qrcode: None,
            },
            ZapiEventKind::Received => WebhookEvent::Message(InboundMessage {
                provider: Provider::Zapi,
                session: session.to_string(),
                from: self.phone,
                to: None,
                body: self.message_text,
                message_type: self.message_type,
                instance_id: self.instance_id,
                contact_name: self.sender_name,
                from_me: self.from_me,
                received_at,
            }),
        }
    }
}

/// Normalize a Z-API callback body
pub fn normalize_zapi(kind: ZapiEventKind, payload: &Value) -> NormalizedZapiEvent {
    NormalizedZapiEvent {
        event: kind,
        phone: deep_find_by_keys(payload, &PHONE_KEYS)
            .and_then(|raw| normalize_phone(strip_jid(&raw))),
        message_text: trimmed(deep_find_by_keys(payload, &MESSAGE_KEYS)),
        message_type: trimmed(deep_find_by_keys(payload, &MESSAGE_TYPE_KEYS)),
        instance_id: instance_id(payload),
        from_me: payload
            .get("fromMe")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        sender_name: trimmed(
            ["senderName", "chatName"]
                .iter()
                .find_map(|k| payload.get(*k).and_then(Value::as_str))
                .map(str::to_string),
        ),
    }
}

fn instance_id(payload: &Value) -> Option<String> {
    if let Some(direct) = trimmed(deep_find_by_keys(payload, &INSTANCE_KEYS)) {
        return Some(direct);
    }
    let instance = payload.get("instance").filter(|v| v.is_object())?;
    trimmed(deep_find_by_keys(instance, &["id", "instanceid", "instance_id"]))
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn coerce_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Breadth-first walk: every key of an object is checked, in payload order,
/// before any nested object is entered; arrays are flattened into the queue
pub fn deep_find_by_keys(payload: &Value, keys: &[&str]) -> Option<String> {
    let mut queue: VecDeque<&Value> = VecDeque::from([payload]);
    while let Some(current) = queue.pop_front() {
        match current {
            Value::Array(items) => queue.extend(items.iter()),
            Value::Object(map) => {
                for (key, value) in map {
                    let lowered = key.to_ascii_lowercase();
                    if keys.contains(&lowered.as_str())
                        && let Some(found) = coerce_to_string(value)
                    {
                        return Some(found);
                    }
                    if value.is_object() || value.is_array() {
                        queue.push_back(value);
                    }
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn received_text_message() {
        let payload = json!({
            "instanceId": "3C01",
            "phone": "5511999998888",
            "fromMe": false,
            "senderName": "Bruno",
            "type": "ReceivedCallback",
            "text": {"message": "Boa noite"}
        });
        let n = normalize_zapi(ZapiEventKind::Received, &payload);
        assert_eq!(n.phone.as_deref(), Some("5511999998888"));
        assert_eq!(n.message_text.as_deref(), Some("Boa noite"));
        assert_eq!(n.message_type.as_deref(), Some("ReceivedCallback"));
        assert_eq!(n.instance_id.as_deref(), Some("3C01"));
        assert_eq!(n.sender_name.as_deref(), Some("Bruno"));
    }

    #[test]
    fn keys_are_case_insensitive_and_numbers_coerce() {
        let payload = json!({"data": {"ChatId": 5511999998888_i64, "Caption": " foto "}});
        let n = normalize_zapi(ZapiEventKind::Received, &payload);
        assert_eq!(n.phone.as_deref(), Some("5511999998888"));
        assert_eq!(n.message_text.as_deref(), Some("foto"));
    }

    #[test]
    fn phone_jid_suffix_is_removed() {
        let payload = json!({"participant": "5511999998888@s.whatsapp.net"});
        let n = normalize_zapi(ZapiEventKind::Received, &payload);
        assert_eq!(n.phone.as_deref(), Some("5511999998888"));
    }

    #[test]
    fn instance_falls_back_to_nested_id() {
        let payload = json!({"instance": {"id": " INST-9 "}});
        let n = normalize_zapi(ZapiEventKind::Disconnected, &payload);
        assert_eq!(n.instance_id.as_deref(), Some("INST-9"));
    }

    #[test]
    fn shallow_keys_win_over_deep_ones() {
        let payload = json!({"nested": {"phone": "5511111111111"}, "phone": "5522222222222"});
        assert_eq!(
            deep_find_by_keys(&payload, &PHONE_KEYS).as_deref(),
            Some("5522222222222")
        );
    }

    #[test]
    fn first_matching_key_in_payload_order_wins() {
        let payload: Value =
            serde_json::from_str(r#"{"chatId": "5511111111111", "phone": "5522222222222"}"#)
                .unwrap();
        assert_eq!(
            deep_find_by_keys(&payload, &PHONE_KEYS).as_deref(),
            Some("5511111111111")
        );
        let payload: Value =
            serde_json::from_str(r#"{"phone": "5522222222222", "chatId": "5511111111111"}"#)
                .unwrap();
        assert_eq!(
            deep_find_by_keys(&payload, &PHONE_KEYS).as_deref(),
            Some("5522222222222")
        );
    }

    #[test]
    fn disconnected_becomes_logout_status() {
        let n = normalize_zapi(ZapiEventKind::Disconnected, &json!({"instanceId": "I1"}));
        assert_eq!(
            n.into_event("zapi", 0),
            WebhookEvent::Status {
                session: "I1".into(),
                event: SessionEvent::LoggedOut,
                qrcode: None
            }
        );
    }

    #[test]
    fn empty_payload_yields_nothing() {
        let n = normalize_zapi(ZapiEventKind::Received, &json!({}));
        assert_eq!(n.phone, None);
        assert_eq!(n.message_text, None);
        assert!(matches!(n.into_event("zapi", 1), WebhookEvent::Message(_)));
    }
}
