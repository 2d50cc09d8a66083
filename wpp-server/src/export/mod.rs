//! CSV exports for the admin panel

use std::collections::HashMap;

use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{MenuItem, MenuItemPrice};
use thiserror::Error;

pub const PRICE_VARIATIONS_CONTEXT: &str = "menu-items-price-variations";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv buffer flush failed: {0}")]
    Flush(String),
}

/// Query string of `GET /api/admin/export`
#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
    pub context: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportContext {
    MenuItemsPriceVariations,
}

impl ExportContext {
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::MenuItemsPriceVariations => "menu-items-price-variations.csv",
        }
    }
}

impl ExportQuery {
    /// Validate format and context
    pub fn context(&self) -> Result<ExportContext, AppError> {
        if self.format.as_deref() != Some("csv") {
            return Err(AppError::with_message(
                ErrorCode::ExportFormatInvalid,
                "Invalid export format",
            ));
        }
        match self.context.as_deref().map(str::trim) {
            None | Some("") | Some("null") | Some("undefined") => Err(AppError::with_message(
                ErrorCode::ExportContextInvalid,
                "Invalid export context",
            )),
            Some(PRICE_VARIATIONS_CONTEXT) => Ok(ExportContext::MenuItemsPriceVariations),
            Some(other) => Err(AppError::with_message(
                ErrorCode::ExportContextInvalid,
                format!("Unknown export context: {other}"),
            )),
        }
    }
}

/// Header plus rows, all cells already rendered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_csv(&self) -> Result<Vec<u8>, ExportError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer
            .into_inner()
            .map_err(|e| ExportError::Flush(e.error().to_string()))
    }
}

/// One row per item: `id,name` then one column per price label.
///
/// Labels are collected in first-seen order across all items; items
/// without a given label get an empty cell.
pub fn price_variation_table(
    items: &[MenuItem],
    prices: &HashMap<i64, Vec<MenuItemPrice>>,
) -> CsvTable {
    let mut labels: Vec<&str> = Vec::new();
    for item in items {
        for price in prices.get(&item.id).into_iter().flatten() {
            if !labels.contains(&price.label.as_str()) {
                labels.push(&price.label);
            }
        }
    }

    let rows = items
        .iter()
        .map(|item| {
            let item_prices = prices.get(&item.id);
            let mut row = vec![item.id.to_string(), item.name.clone()];
            row.extend(labels.iter().map(|label| {
                item_prices
                    .and_then(|ps| ps.iter().find(|p| p.label == *label))
                    .map(|p| p.amount.to_string())
                    .unwrap_or_default()
            }));
            row
        })
        .collect();

    let mut headers = vec!["id".to_string(), "name".to_string()];
    headers.extend(labels.into_iter().map(str::to_string));
    CsvTable { headers, rows }
}
