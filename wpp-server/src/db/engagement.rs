//! Last inbound/outbound timestamps per contact

use shared::models::Direction;
use sqlx::PgPool;

pub async fn touch(
    pool: &PgPool,
    phone: &str,
    direction: Direction,
    now: i64,
) -> Result<(), sqlx::Error> {
    let sql = match direction {
        Direction::Inbound => {
            "INSERT INTO wpp_engagement (phone, last_inbound_at, updated_at) VALUES ($1, $2, $2)
             ON CONFLICT (phone) DO UPDATE SET last_inbound_at = EXCLUDED.last_inbound_at,
                                               updated_at = EXCLUDED.updated_at"
        }
        Direction::Outbound => {
            "INSERT INTO wpp_engagement (phone, last_outbound_at, updated_at) VALUES ($1, $2, $2)
             ON CONFLICT (phone) DO UPDATE SET last_outbound_at = EXCLUDED.last_outbound_at,
                                               updated_at = EXCLUDED.updated_at"
        }
    };
    sqlx::query(sql).bind(phone).bind(now).execute(pool).await?;
    Ok(())
}
