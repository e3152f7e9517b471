use std::collections::HashMap;

use super::row::Column;
use super::TransformError;

pub fn standardize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .replace(' ', "_")
        .replace('%', "_pct")
        .replace('/', "_")
        .replace('.', "")
}

/// Maps a standardized header to the column it feeds, if any.
pub fn canonical_column(standardized: &str) -> Option<Column> {
    let column = match standardized {
        "no_of_shares" => Column::Shares,
        "holding_gain_change__pct" => Column::HoldingGainChangePct,
        "six_month_pct" => Column::SixMonthReturnPct,
        "year_to_date_pct" => Column::YtdReturnPct,
        "one_year_pct" => Column::OneYearReturnPct,
        "_pct_of_portfolio" => Column::PortfolioPct,
        other => return Column::ALL.into_iter().find(|c| !c.is_derived() && c.name() == other),
    };

    Some(column)
}

/// Where each canonical column lives in the raw header row.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMap {
    sources: Vec<(Column, usize)>,
}

impl ColumnMap {
    /// Standardizes every header, rejects collisions, and resolves the input columns.
    pub fn resolve(headers: &[String]) -> Result<ColumnMap, TransformError> {
        let mut standardized: HashMap<String, &str> = HashMap::new();
        let mut by_column: HashMap<Column, (usize, String)> = HashMap::new();

        for (index, header) in headers.iter().enumerate() {
            let name = standardize_header(header);
            // Unnamed columns (trailing commas in the export) carry nothing we load.
            if name.is_empty() {
                continue;
            }

            if let Some(first) = standardized.insert(name.clone(), header.as_str()) {
                return Err(TransformError::HeaderCollision {
                    first: first.to_string(),
                    second: header.clone(),
                    standardized: name,
                });
            }

            if let Some(column) = canonical_column(&name) {
                if let Some((_, first)) = by_column.insert(column, (index, header.clone())) {
                    return Err(TransformError::ColumnCollision {
                        first,
                        second: header.clone(),
                        column,
                    });
                }
            }
        }

        if !by_column.contains_key(&Column::Ticker) {
            return Err(TransformError::MissingTicker);
        }

        let mut sources: Vec<(Column, usize)> = by_column.into_iter().map(|(column, (index, _))| (column, index)).collect();
        sources.sort();

        Ok(ColumnMap { sources })
    }

    pub fn index_of(&self, column: Column) -> Option<usize> {
        self.sources.iter().find(|(c, _)| *c == column).map(|(_, index)| *index)
    }

    /// Input columns in output order.
    pub fn sources(&self) -> &[(Column, usize)] {
        &self.sources
    }

    /// Every column the output carries: the mapped inputs plus the ones derived
    /// from `holding_value`, in the fixed output order.
    pub fn output_columns(&self) -> Vec<Column> {
        let has_holding_value = self.index_of(Column::HoldingValue).is_some();
        Column::ALL
            .into_iter()
            .filter(|column| {
                if column.is_derived() {
                    has_holding_value
                } else {
                    self.index_of(*column).is_some()
                }
            })
            .collect()
    }
}
