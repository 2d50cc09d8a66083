//! WPPConnect webhook normalizer

use serde_json::Value;
use shared::models::{InboundMessage, Provider, SessionEvent, WebhookEvent};
use shared::phone::{is_group_or_broadcast, normalize_phone};

use super::qr::{pick_qr_deep, to_data_url};
use super::{non_blank, timestamp_millis};

const MESSAGE_EVENTS: [&str; 3] = ["onmessage", "message", "onanymessage"];
const STATUS_EVENTS: [&str; 5] = [
    "status-find",
    "onstatechange",
    "session-logged",
    "qrcode",
    "onconnected",
];

/// Map a WPPConnect webhook body to a [`WebhookEvent`]
///
/// `session_hint` is used when the payload carries no `session` field.
pub fn normalize_wppconnect(session_hint: &str, payload: &Value) -> WebhookEvent {
    let session = payload
        .get("session")
        .and_then(Value::as_str)
        .and_then(non_blank)
        .unwrap_or(session_hint)
        .to_string();
    let event = payload.get("event").and_then(Value::as_str).unwrap_or("");

    if STATUS_EVENTS.contains(&event) {
        return status_event(session, event, payload);
    }

    let is_message = MESSAGE_EVENTS.contains(&event) || (event.is_empty() && text(payload).is_some());
    if !is_message {
        let reason = if event.is_empty() {
            "no event".to_string()
        } else {
            format!("unhandled event {event}")
        };
        return WebhookEvent::ignored(reason);
    }

    let raw_from = raw_phone(payload);
    if payload.get("isGroupMsg").and_then(Value::as_bool) == Some(true)
        || raw_from.is_some_and(is_group_or_broadcast)
    {
        return WebhookEvent::ignored("group or broadcast");
    }

    let from_me = payload
        .get("fromMe")
        .or_else(|| payload.pointer("/key/fromMe"))
        .and_then(Value::as_bool)
        .unwrap_or(false);

    WebhookEvent::Message(InboundMessage {
        provider: Provider::Wppconnect,
        session,
        from: raw_from.and_then(normalize_phone),
        to: payload
            .get("to")
            .and_then(Value::as_str)
            .and_then(normalize_phone),
        body: text(payload).map(str::to_string),
        message_type: payload
            .get("type")
            .and_then(Value::as_str)
            .and_then(non_blank)
            .map(str::to_string),
        instance_id: None,
        contact_name: payload
            .get("notifyName")
            .or_else(|| payload.pointer("/sender/pushname"))
            .and_then(Value::as_str)
            .and_then(non_blank)
            .map(str::to_string),
        from_me,
        received_at: timestamp_millis(payload.get("timestamp").or_else(|| payload.get("t"))),
    })
}

fn status_event(session: String, event: &str, payload: &Value) -> WebhookEvent {
    let qrcode = ["qrcode", "urlcode"]
        .iter()
        .find_map(|k| payload.get(*k).and_then(Value::as_str).and_then(non_blank))
        .or_else(|| {
            (event == "qrcode")
                .then(|| pick_qr_deep(payload))
                .flatten()
        })
        .map(to_data_url);

    let session_event = match event {
        "qrcode" => Some(SessionEvent::QrIssued),
        "onconnected" => Some(SessionEvent::Connected),
        "session-logged" => match payload.get("status") {
            Some(Value::Bool(true)) => Some(SessionEvent::Connected),
            Some(Value::Bool(false)) => Some(SessionEvent::LoggedOut),
            _ => provider_event(payload),
        },
        _ => provider_event(payload),
    };

    match session_event {
        Some(event) => WebhookEvent::Status {
            session,
            event,
            qrcode,
        },
        None => WebhookEvent::ignored(format!("unknown status in {event}")),
    }
}

fn provider_event(payload: &Value) -> Option<SessionEvent> {
    ["status", "state"]
        .iter()
        .find_map(|k| payload.get(*k).and_then(Value::as_str))
        .and_then(SessionEvent::from_provider)
}

/// Sender JID: `from`, `remoteJid`, `chatId`, then `key.remoteJid`
fn raw_phone(payload: &Value) -> Option<&str> {
    payload
        .get("from")
        .or_else(|| payload.get("remoteJid"))
        .or_else(|| payload.get("chatId"))
        .or_else(|| payload.pointer("/key/remoteJid"))
        .and_then(Value::as_str)
        .and_then(non_blank)
}

/// Message text from the known WPPConnect/Baileys shapes
pub fn text(payload: &Value) -> Option<&str> {
    [
        "/text/body",
        "/message/conversation",
        "/content/text",
        "/body",
        "/message/extendedTextMessage/text",
    ]
    .iter()
    .find_map(|p| payload.pointer(p).and_then(Value::as_str).and_then(non_blank))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn onmessage_becomes_message() {
        let payload = json!({
            "event": "onmessage",
            "session": "loja",
            "from": "5511999998888@c.us",
            "to": "5511000000000@c.us",
            "body": "Qual o horário?",
            "type": "chat",
            "notifyName": "Ana",
            "fromMe": false,
            "timestamp": 1_700_000_000
        });
        let WebhookEvent::Message(m) = normalize_wppconnect("default", &payload) else {
            panic!("expected message");
        };
        assert_eq!(m.session, "loja");
        assert_eq!(m.from.as_deref(), Some("5511999998888"));
        assert_eq!(m.to.as_deref(), Some("5511000000000"));
        assert_eq!(m.body.as_deref(), Some("Qual o horário?"));
        assert_eq!(m.contact_name.as_deref(), Some("Ana"));
        assert_eq!(m.received_at, 1_700_000_000_000);
        assert!(!m.from_me);
    }

    #[test]
    fn baileys_shape_without_event() {
        let payload = json!({
            "key": {"remoteJid": "5511999998888@s.whatsapp.net", "fromMe": true},
            "message": {"extendedTextMessage": {"text": "oi"}}
        });
        let WebhookEvent::Message(m) = normalize_wppconnect("default", &payload) else {
            panic!("expected message");
        };
        assert_eq!(m.session, "default");
        assert_eq!(m.from.as_deref(), Some("5511999998888"));
        assert_eq!(m.body.as_deref(), Some("oi"));
        assert!(m.from_me);
    }

    #[test]
    fn text_lookup_order() {
        let payload = json!({"text": {"body": "first"}, "body": "later"});
        assert_eq!(text(&payload), Some("first"));
        assert_eq!(text(&json!({"body": "   "})), None);
    }

    #[test]
    fn group_messages_are_ignored() {
        let payload = json!({"event": "onmessage", "from": "1203630@g.us", "body": "oi"});
        assert!(matches!(
            normalize_wppconnect("s", &payload),
            WebhookEvent::Ignored { .. }
        ));
        let payload = json!({"event": "onmessage", "from": "5511999998888@c.us", "isGroupMsg": true, "body": "oi"});
        assert!(matches!(
            normalize_wppconnect("s", &payload),
            WebhookEvent::Ignored { .. }
        ));
    }

    #[test]
    fn status_find_maps_provider_state() {
        let payload = json!({"event": "status-find", "session": "loja", "status": "inChat"});
        assert_eq!(
            normalize_wppconnect("s", &payload),
            WebhookEvent::Status {
                session: "loja".into(),
                event: SessionEvent::Connected,
                qrcode: None
            }
        );
    }

    #[test]
    fn phone_disconnect_keeps_disconnect_event() {
        let payload = json!({"event": "status-find", "status": "desconnectedMobile"});
        let WebhookEvent::Status { event, .. } = normalize_wppconnect("s", &payload) else {
            panic!("expected status");
        };
        assert_eq!(event, SessionEvent::Disconnected);
    }

    #[test]
    fn qrcode_event_carries_data_url() {
        let payload = json!({"event": "qrcode", "session": "loja", "qrcode": "QUJD"});
        let WebhookEvent::Status { event, qrcode, .. } = normalize_wppconnect("s", &payload) else {
            panic!("expected status");
        };
        assert_eq!(event, SessionEvent::QrIssued);
        assert_eq!(qrcode.as_deref(), Some("data:image/png;base64,QUJD"));
    }

    #[test]
    fn session_logged_false_is_logout() {
        let payload = json!({"event": "session-logged", "status": false});
        let WebhookEvent::Status { event, .. } = normalize_wppconnect("s", &payload) else {
            panic!("expected status");
        };
        assert_eq!(event, SessionEvent::LoggedOut);
    }

    #[test]
    fn unknown_events_are_ignored() {
        assert!(matches!(
            normalize_wppconnect("s", &json!({"event": "onack", "ack": 3})),
            WebhookEvent::Ignored { .. }
        ));
        assert!(matches!(
            normalize_wppconnect("s", &json!({"event": "status-find", "status": "weird"})),
            WebhookEvent::Ignored { .. }
        ));
        assert!(matches!(
            normalize_wppconnect("s", &json!({})),
            WebhookEvent::Ignored { .. }
        ));
    }
}
