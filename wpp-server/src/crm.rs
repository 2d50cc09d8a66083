//! CRM contact sync from WhatsApp traffic

use serde_json::Value;
use shared::models::Direction;
use shared::phone::normalize_phone_e164_br;
use sqlx::PgPool;

use crate::db;
use crate::db::crm::CrmSync;

/// CRM event type for a message in `direction`
pub fn event_type(direction: Direction) -> &'static str {
    match direction {
        Direction::Inbound => "WHATSAPP_RECEIVED",
        Direction::Outbound => "WHATSAPP_SENT",
    }
}

/// Upsert the customer behind `phone` and append a timeline event.
///
/// Returns `None` when the number is not a Brazilian phone.
pub async fn sync_contact(
    pool: &PgPool,
    phone: &str,
    name: Option<&str>,
    event_type: &str,
    source: &str,
    payload: &Value,
) -> Result<Option<CrmSync>, sqlx::Error> {
    let Some(phone_e164) = normalize_phone_e164_br(phone) else {
        tracing::debug!(phone, "Skipping CRM sync for non-BR number");
        return Ok(None);
    };
    let sync = db::crm::upsert_by_phone(pool, &phone_e164, name).await?;
    db::crm::insert_event(pool, sync.customer_id, event_type, source, payload).await?;
    if sync.created {
        tracing::info!(customer_id = sync.customer_id, source, "CRM customer created");
    }
    Ok(Some(sync))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_by_direction() {
        assert_eq!(event_type(Direction::Inbound), "WHATSAPP_RECEIVED");
        assert_eq!(event_type(Direction::Outbound), "WHATSAPP_SENT");
    }
}
