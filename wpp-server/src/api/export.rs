//! CSV export download

use axum::extract::{Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use shared::error::{AppError, ErrorCode};

use crate::db;
use crate::error::internal;
use crate::export::{ExportContext, ExportQuery, price_variation_table};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/admin/export", get(export))
}

pub async fn export(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, AppError> {
    let context = query.context()?;

    let table = match context {
        ExportContext::MenuItemsPriceVariations => {
            let items = db::menu::list_items(&state.pool, true)
                .await
                .map_err(internal)?;
            let prices = db::menu::prices_by_item(&state.pool)
                .await
                .map_err(internal)?;
            price_variation_table(&items, &prices)
        }
    };

    if table.is_empty() {
        return Err(AppError::with_message(
            ErrorCode::ExportEmpty,
            "No data found for the requested context",
        ));
    }

    let csv = table.to_csv().map_err(internal)?;
    tracing::info!(rows = table.rows.len(), file = context.file_name(), "CSV export generated");
    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", context.file_name()),
            ),
        ],
        csv,
    )
        .into_response())
}
