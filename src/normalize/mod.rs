use log::{debug, info};
use rust_decimal::Decimal;
use thiserror::Error;

pub mod cleaners;
pub mod columns;
pub mod row;


use crate::data::{RawRow, RawTable};
use cleaners::{convert_to_cad, detect_currency, Cleaner, FieldCleaner};
use columns::ColumnMap;
use row::{Column, FieldValue, NormalizedRow};

#[derive(Debug, PartialEq, Error)]
pub enum TransformError {
    #[error("input has no `ticker` column")]
    MissingTicker,
    #[error("headers '{first}' and '{second}' both standardize to '{standardized}'")]
    HeaderCollision {
        first: String,
        second: String,
        standardized: String,
    },
    #[error("headers '{first}' and '{second}' both map to column '{column}'")]
    ColumnCollision { first: String, second: String, column: Column },
}

/// Cleaned rows together with the columns they actually carry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedTable {
    pub columns: Vec<Column>,
    pub rows: Vec<NormalizedRow>,
}

impl NormalizedTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

pub struct Normalizer {
    usd_to_cad_rate: Decimal,
}

impl Normalizer {
    pub fn new(usd_to_cad_rate: Decimal) -> Normalizer {
        Normalizer { usd_to_cad_rate }
    }

    pub fn normalize(&self, raw: &RawTable) -> Result<NormalizedTable, TransformError> {
        let map = ColumnMap::resolve(&raw.headers)?;
        info!("standardized {} column names", raw.headers.len());

        let mut rows = Vec::with_capacity(raw.rows.len());
        for (line, record) in raw.rows.iter().enumerate() {
            match self.normalize_row(&map, record) {
                Some(row) => rows.push(row),
                None => debug!("dropping row without ticker, row={}", line + 1),
            }
        }
        info!("filtered empty rows, {} valid rows remaining", rows.len());

        Ok(NormalizedTable {
            columns: map.output_columns(),
            rows,
        })
    }

    fn normalize_row(&self, map: &ColumnMap, record: &RawRow) -> Option<NormalizedRow> {
        let ticker_index = map.index_of(Column::Ticker)?;
        let ticker = record.get(ticker_index).map(str::trim).unwrap_or_default();
        if ticker.is_empty() {
            return None;
        }

        let mut row = NormalizedRow::new(ticker);
        for &(column, index) in map.sources() {
            let raw = record.get(index).unwrap_or_default();
            match Cleaner::for_column(column).clean(raw) {
                FieldValue::Text(value) => row.set_text(column, value),
                FieldValue::Decimal(value) => row.set_decimal(column, value),
            }
        }

        // Currency is read off the raw text, before cleaning strips the marker.
        if let Some(index) = map.index_of(Column::HoldingValue) {
            let currency = detect_currency(record.get(index));
            row.currency = Some(currency);
            row.holding_value_cad = convert_to_cad(row.holding_value, currency, self.usd_to_cad_rate);
        }

        Some(row)
    }
}
