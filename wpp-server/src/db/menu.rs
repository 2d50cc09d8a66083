//! Menu reads and like/share engagement

use std::collections::HashMap;

use shared::models::{EngagementKind, MenuItem, MenuItemPrice};
use sqlx::PgPool;

pub async fn list_items(pool: &PgPool, visible_only: bool) -> Result<Vec<MenuItem>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, name, description, is_visible, sort_order, cost_amount
         FROM menu_items
         WHERE ($1 = FALSE OR is_visible = TRUE)
         ORDER BY sort_order, name, id",
    )
    .bind(visible_only)
    .fetch_all(pool)
    .await
}

/// Prices grouped by menu item, in display order
pub async fn prices_by_item(
    pool: &PgPool,
) -> Result<HashMap<i64, Vec<MenuItemPrice>>, sqlx::Error> {
    let rows: Vec<MenuItemPrice> = sqlx::query_as(
        "SELECT id, menu_item_id, label, amount, sort_order
         FROM menu_item_prices ORDER BY menu_item_id, sort_order, id",
    )
    .fetch_all(pool)
    .await?;
    let mut grouped: HashMap<i64, Vec<MenuItemPrice>> = HashMap::new();
    for row in rows {
        grouped.entry(row.menu_item_id).or_default().push(row);
    }
    Ok(grouped)
}

pub async fn item_exists(pool: &PgPool, item_id: i64) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM menu_items WHERE id = $1")
        .bind(item_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

/// Like and share totals per item
pub async fn engagement_counts(
    pool: &PgPool,
) -> Result<HashMap<(i64, EngagementKind), i64>, sqlx::Error> {
    let rows: Vec<(i64, String, i64)> = sqlx::query_as(
        "SELECT menu_item_id, kind, COUNT(*) FROM menu_item_engagements GROUP BY menu_item_id, kind",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .filter_map(|(item, kind, n)| EngagementKind::from_db(&kind).map(|k| ((item, k), n)))
        .collect())
}

pub async fn count_for(pool: &PgPool, item_id: i64, kind: EngagementKind) -> Result<i64, sqlx::Error> {
    let (n,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM menu_item_engagements WHERE menu_item_id = $1 AND kind = $2",
    )
    .bind(item_id)
    .bind(kind.as_db())
    .fetch_one(pool)
    .await?;
    Ok(n)
}

/// Whether the client already registered this interest since `since`
pub async fn recent_interest_exists(
    pool: &PgPool,
    item_id: i64,
    kind: EngagementKind,
    client_id: &str,
    since: i64,
) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT id FROM menu_item_interest_events
         WHERE menu_item_id = $1 AND kind = $2 AND client_id = $3 AND created_at >= $4
         LIMIT 1",
    )
    .bind(item_id)
    .bind(kind.as_db())
    .bind(client_id)
    .bind(since)
    .fetch_optional(pool)
    .await?;
    Ok(row.is_some())
}

/// Insert the like/share row and its interest event atomically
pub async fn record_engagement(
    pool: &PgPool,
    item_id: i64,
    kind: EngagementKind,
    client_id: &str,
    ip: &str,
) -> Result<(), sqlx::Error> {
    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;
    sqlx::query(
        "INSERT INTO menu_item_engagements (id, menu_item_id, kind, client_id, ip, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(shared::util::snowflake_id())
    .bind(item_id)
    .bind(kind.as_db())
    .bind(client_id)
    .bind(ip)
    .bind(now)
    .execute(&mut *tx)
    .await?;
    sqlx::query(
        "INSERT INTO menu_item_interest_events (id, menu_item_id, kind, client_id, created_at)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(shared::util::snowflake_id())
    .bind(item_id)
    .bind(kind.as_db())
    .bind(client_id)
    .bind(now)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(())
}
