//! CRM customers and their event timeline

use sqlx::PgPool;

#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct CrmCustomer {
    pub id: i64,
    pub phone_e164: String,
    pub name: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Result of syncing a contact into the CRM
#[derive(Debug, Clone, serde::Serialize)]
pub struct CrmSync {
    pub customer_id: i64,
    pub created: bool,
}

pub async fn find(pool: &PgPool, id: i64) -> Result<Option<CrmCustomer>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, phone_e164, name, created_at, updated_at FROM crm_customers WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Create the customer or refresh its name; existing names are kept when
/// the new one is blank
pub async fn upsert_by_phone(
    pool: &PgPool,
    phone_e164: &str,
    name: Option<&str>,
) -> Result<CrmSync, sqlx::Error> {
    let now = shared::util::now_millis();
    let (customer_id, created): (i64, bool) = sqlx::query_as(
        r#"
        INSERT INTO crm_customers (id, phone_e164, name, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $4)
        ON CONFLICT (phone_e164)
        DO UPDATE SET name = COALESCE(NULLIF(EXCLUDED.name, ''), crm_customers.name),
                      updated_at = EXCLUDED.updated_at
        RETURNING id, (xmax = 0) AS created
        "#,
    )
    .bind(shared::util::snowflake_id())
    .bind(phone_e164)
    .bind(name)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(CrmSync {
        customer_id,
        created,
    })
}

pub async fn insert_event(
    pool: &PgPool,
    customer_id: i64,
    event_type: &str,
    source: &str,
    payload: &serde_json::Value,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO crm_customer_events (id, customer_id, event_type, source, payload, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(shared::util::snowflake_id())
    .bind(customer_id)
    .bind(event_type)
    .bind(source)
    .bind(payload.to_string())
    .bind(shared::util::now_millis())
    .execute(pool)
    .await?;
    Ok(())
}
