//! Public menu, likes/shares and the admin margin view

use std::collections::HashMap;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Extension, Json, Router, middleware};
use shared::error::{AppError, ErrorCode};
use shared::models::{
    AdminMenuItemView, EngagementKind, EngagementRequest, EngagementResult, MenuItem,
    MenuItemPrice, MenuItemView, PriceWithMargin, setting::parse_flag,
};
use sqlx::PgPool;

use crate::auth::client_id::client_id_middleware;
use crate::auth::origin::origin_middleware;
use crate::auth::{ClientId, ClientIp, RateKey, UNKNOWN_IP};
use crate::db;
use crate::error::internal;
use crate::finance::{contribution_margin_percent, margin_status};
use crate::state::AppState;

use super::ApiResult;

/// Settings context of the like/share switches
pub const ENGAGEMENT_SETTINGS_CONTEXT: &str = "engagement";
/// Same client, same item, same kind: one interest per window
pub const INTEREST_COOLDOWN: Duration = Duration::from_secs(24 * 60 * 60);

const PER_ITEM_CLIENT_LIMIT: u32 = 1;
const PER_CLIENT_LIMIT: u32 = 20;
const PER_IP_LIMIT: u32 = 120;

pub fn public_router(state: &AppState) -> Router<AppState> {
    let engagement = Router::new()
        .route("/api/menu/{id}/like", post(like))
        .route("/api/menu/{id}/share", post(share))
        .layer(middleware::from_fn(client_id_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            origin_middleware,
        ));

    Router::new()
        .route("/api/menu", get(public_menu))
        .merge(engagement)
}

pub fn admin_router() -> Router<AppState> {
    Router::new().route("/api/admin/menu", get(admin_menu))
}

/// Join items with their prices and engagement totals
pub fn build_menu_views(
    items: Vec<MenuItem>,
    mut prices: HashMap<i64, Vec<MenuItemPrice>>,
    counts: &HashMap<(i64, EngagementKind), i64>,
) -> Vec<MenuItemView> {
    items
        .into_iter()
        .map(|item| MenuItemView {
            prices: prices.remove(&item.id).unwrap_or_default(),
            likes: counts.get(&(item.id, EngagementKind::Like)).copied().unwrap_or(0),
            shares: counts.get(&(item.id, EngagementKind::Share)).copied().unwrap_or(0),
            id: item.id,
            name: item.name,
            description: item.description,
        })
        .collect()
}

async fn load_public_menu(pool: &PgPool) -> Result<Vec<MenuItemView>, sqlx::Error> {
    let items = db::menu::list_items(pool, true).await?;
    let prices = db::menu::prices_by_item(pool).await?;
    let counts = db::menu::engagement_counts(pool).await?;
    Ok(build_menu_views(items, prices, &counts))
}

/// GET /api/menu; a failure pages the staff on WhatsApp
pub async fn public_menu(State(state): State<AppState>) -> ApiResult<Vec<MenuItemView>> {
    match load_public_menu(&state.pool).await {
        Ok(items) => Ok(Json(items)),
        Err(e) => {
            tracing::error!(error = %e, "Public menu failed to load");
            let alerts = state.alerts.clone();
            let url = state.config.public_menu_url.clone();
            let message = e.to_string();
            tokio::spawn(async move {
                let report = alerts.notify(&url, &message, false).await;
                tracing::debug!(?report, "Menu failure alert processed");
            });
            Err(AppError::new(ErrorCode::InternalError))
        }
    }
}

pub async fn like(
    state: State<AppState>,
    path: Path<String>,
    client_id: Extension<ClientId>,
    client_ip: Extension<ClientIp>,
    body: Option<Json<EngagementRequest>>,
) -> ApiResult<EngagementResult> {
    engage(EngagementKind::Like, state, path, client_id, client_ip, body).await
}

pub async fn share(
    state: State<AppState>,
    path: Path<String>,
    client_id: Extension<ClientId>,
    client_ip: Extension<ClientIp>,
    body: Option<Json<EngagementRequest>>,
) -> ApiResult<EngagementResult> {
    engage(EngagementKind::Share, state, path, client_id, client_ip, body).await
}

/// Rate-limit buckets consumed by one like/share
pub fn engagement_rate_keys(
    kind: EngagementKind,
    item_id: i64,
    ip: &str,
    client_id: &str,
) -> Vec<RateKey> {
    let (item_bucket, client_bucket, ip_bucket) = match kind {
        EngagementKind::Like => ("menu-like-item", "menu-like-client", "menu-like-ip"),
        EngagementKind::Share => ("menu-share-item", "menu-share-client", "menu-share-ip"),
    };
    let mut keys = vec![
        RateKey {
            bucket: item_bucket,
            key: format!("{item_id}:{ip}:{client_id}"),
            limit: PER_ITEM_CLIENT_LIMIT,
            window: INTEREST_COOLDOWN,
        },
        RateKey {
            bucket: client_bucket,
            key: format!("{ip}:{client_id}"),
            limit: PER_CLIENT_LIMIT,
            window: INTEREST_COOLDOWN,
        },
    ];
    // Callers without a known IP must not share one per-IP bucket
    if ip != UNKNOWN_IP {
        keys.push(RateKey {
            bucket: ip_bucket,
            key: ip.to_string(),
            limit: PER_IP_LIMIT,
            window: INTEREST_COOLDOWN,
        });
    }
    keys
}

/// Body `client_id` wins over the cookie
fn resolve_client_id(body: Option<&EngagementRequest>, cookie: &str) -> Option<String> {
    body.and_then(|b| b.client_id.as_deref())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .or_else(|| Some(cookie.trim()).filter(|id| !id.is_empty()))
        .map(str::to_string)
}

async fn engage(
    kind: EngagementKind,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Extension(ClientId(cookie_id)): Extension<ClientId>,
    Extension(ClientIp(ip)): Extension<ClientIp>,
    body: Option<Json<EngagementRequest>>,
) -> ApiResult<EngagementResult> {
    let item_id = raw_id
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::validation("Invalid menu item id"))?;
    let client_id = resolve_client_id(body.as_ref().map(|Json(b)| b), &cookie_id)
        .ok_or_else(|| AppError::validation("Missing client id"))?;

    let flag = db::settings::get(&state.pool, ENGAGEMENT_SETTINGS_CONTEXT, kind.setting_name())
        .await
        .map_err(internal)?;
    if flag.is_some_and(|v| !parse_flag(&v)) {
        return Ok(Json(EngagementResult::disabled()));
    }

    if !db::menu::item_exists(&state.pool, item_id)
        .await
        .map_err(internal)?
    {
        return Err(AppError::new(ErrorCode::MenuItemNotFound).with_detail("id", item_id));
    }

    let current = |recorded: bool| {
        let pool = state.pool.clone();
        async move {
            let count = db::menu::count_for(&pool, item_id, kind)
                .await
                .map_err(internal)?;
            Ok::<_, AppError>(Json(EngagementResult {
                disabled: false,
                count,
                recorded,
            }))
        }
    };

    let since = shared::util::now_millis() - INTEREST_COOLDOWN.as_millis() as i64;
    if db::menu::recent_interest_exists(&state.pool, item_id, kind, &client_id, since)
        .await
        .map_err(internal)?
    {
        tracing::debug!(item_id, kind = kind.as_db(), "Interest already registered");
        return current(false).await;
    }

    let decision = state
        .rate_limiter
        .consume_all(&engagement_rate_keys(kind, item_id, &ip, &client_id))
        .await;
    if !decision.allowed {
        tracing::info!(item_id, ip = %ip, kind = kind.as_db(), "Engagement rate limited");
        return current(false).await;
    }

    db::menu::record_engagement(&state.pool, item_id, kind, &client_id, &ip)
        .await
        .map_err(internal)?;
    tracing::info!(item_id, kind = kind.as_db(), "Engagement recorded");
    current(true).await
}

/// Attach margins to every price of every item
pub fn build_admin_views(
    items: Vec<MenuItem>,
    mut prices: HashMap<i64, Vec<MenuItemPrice>>,
) -> Vec<AdminMenuItemView> {
    items
        .into_iter()
        .map(|item| {
            let prices = prices
                .remove(&item.id)
                .unwrap_or_default()
                .into_iter()
                .map(|p| {
                    let margin_percent = contribution_margin_percent(p.amount, item.cost_amount);
                    PriceWithMargin {
                        label: p.label,
                        amount: p.amount,
                        margin_percent,
                        margin: margin_status(margin_percent),
                    }
                })
                .collect();
            AdminMenuItemView {
                id: item.id,
                name: item.name,
                is_visible: item.is_visible,
                cost_amount: item.cost_amount,
                prices,
            }
        })
        .collect()
}

pub async fn admin_menu(State(state): State<AppState>) -> ApiResult<Vec<AdminMenuItemView>> {
    let items = db::menu::list_items(&state.pool, false)
        .await
        .map_err(internal)?;
    let prices = db::menu::prices_by_item(&state.pool)
        .await
        .map_err(internal)?;
    Ok(Json(build_admin_views(items, prices)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::models::MarginTier;

    fn item(id: i64, cost: Option<Decimal>) -> MenuItem {
        MenuItem {
            id,
            name: format!("Pizza {id}"),
            description: None,
            is_visible: true,
            sort_order: 0,
            cost_amount: cost,
        }
    }

    fn price(item: i64, label: &str, amount: Decimal) -> MenuItemPrice {
        MenuItemPrice {
            id: item * 100,
            menu_item_id: item,
            label: label.into(),
            amount,
            sort_order: 0,
        }
    }

    #[test]
    fn menu_views_join_prices_and_counts() {
        let prices = HashMap::from([(1, vec![price(1, "Média", Decimal::new(5990, 2))])]);
        let counts = HashMap::from([((1, EngagementKind::Like), 7), ((2, EngagementKind::Share), 2)]);
        let views = build_menu_views(vec![item(1, None), item(2, None)], prices, &counts);
        assert_eq!(views[0].prices.len(), 1);
        assert_eq!((views[0].likes, views[0].shares), (7, 0));
        assert!(views[1].prices.is_empty());
        assert_eq!((views[1].likes, views[1].shares), (0, 2));
    }

    #[test]
    fn admin_views_carry_margins() {
        let prices = HashMap::from([
            (1, vec![price(1, "Média", Decimal::new(5000, 2))]),
            (2, vec![price(2, "Média", Decimal::new(5000, 2))]),
        ]);
        let views = build_admin_views(
            vec![item(1, Some(Decimal::new(2400, 2))), item(2, None)],
            prices,
        );
        let first = &views[0].prices[0];
        assert_eq!(first.margin_percent, Some(52.0));
        assert_eq!(first.margin.as_ref().map(|m| m.tier), Some(MarginTier::Healthy));
        assert!(views[1].prices[0].margin.is_none());
    }

    #[test]
    fn rate_keys_per_item_client_and_ip() {
        let keys = engagement_rate_keys(EngagementKind::Like, 5, "1.2.3.4", "rid");
        assert_eq!(keys.len(), 3);
        assert_eq!((keys[0].key.as_str(), keys[0].limit), ("5:1.2.3.4:rid", 1));
        assert_eq!((keys[1].key.as_str(), keys[1].limit), ("1.2.3.4:rid", 20));
        assert_eq!((keys[2].key.as_str(), keys[2].limit), ("1.2.3.4", 120));
        assert_ne!(
            engagement_rate_keys(EngagementKind::Share, 5, "ip", "c")[0].bucket,
            keys[0].bucket
        );
    }

    #[test]
    fn unknown_ip_skips_per_ip_bucket() {
        let keys = engagement_rate_keys(EngagementKind::Share, 5, UNKNOWN_IP, "rid");
        assert_eq!(keys.len(), 2);
        assert!(keys.iter().all(|k| k.bucket != "menu-share-ip"));
    }

    #[test]
    fn body_client_id_wins_over_cookie() {
        let body = EngagementRequest {
            client_id: Some(" web-1 ".into()),
        };
        assert_eq!(resolve_client_id(Some(&body), "cookie").as_deref(), Some("web-1"));
        let blank = EngagementRequest {
            client_id: Some("  ".into()),
        };
        assert_eq!(resolve_client_id(Some(&blank), "cookie").as_deref(), Some("cookie"));
        assert_eq!(resolve_client_id(None, " "), None);
    }
}
