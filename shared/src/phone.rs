//! Phone number normalization
//!
//! Providers hand us JIDs (`5511999999999@c.us`), formatted numbers and
//! bare digits. Everything is reduced to digits before storage.

/// Strip a WhatsApp JID suffix (`@c.us`, `@s.whatsapp.net`, ...)
pub fn strip_jid(raw: &str) -> &str {
    match raw.find('@') {
        Some(idx) => &raw[..idx],
        None => raw,
    }
}

/// Whether a JID points at a group chat or a status broadcast
pub fn is_group_or_broadcast(raw: &str) -> bool {
    raw.ends_with("@g.us") || raw.ends_with("@broadcast") || raw.contains("status@")
}

/// Digits-only international number (`^[1-9]\d{7,14}$`), or `None`
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = strip_jid(raw.trim())
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    let valid = (8..=15).contains(&digits.len()) && !digits.starts_with('0');
    valid.then_some(digits)
}

/// Brazilian E.164 form (`+55DDDNNNNNNNN`), or `None`
///
/// - 10 or 11 digits (DDD + number) get the `55` country code
/// - 12 or 13 digits already starting with `55` are kept
/// - leading trunk zeros are dropped first
pub fn normalize_phone_e164_br(raw: &str) -> Option<String> {
    let digits: String = strip_jid(raw.trim())
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    let digits = digits.trim_start_matches('0');
    match digits.len() {
        10 | 11 => Some(format!("+55{digits}")),
        12 | 13 if digits.starts_with("55") => Some(format!("+{digits}")),
        _ => None,
    }
}

/// Split a free-form list (newline, comma or semicolon separated),
/// normalize each entry and drop duplicates keeping first-seen order
pub fn parse_phone_list(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for part in raw.split(['\n', ',', ';']) {
        if let Some(phone) = normalize_phone(part)
            && !out.contains(&phone)
        {
            out.push(phone);
        }
    }
    out
}
