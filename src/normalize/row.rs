use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Currency {
    Usd,
    Cad,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Cad => "CAD",
        }
    }
}

/// The fixed output columns, in the order they are written to the target table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    Ticker,
    Name,
    Shares,
    Price,
    PurchasePrice,
    HoldingValue,
    HoldingGainChangePct,
    SixMonthReturnPct,
    YtdReturnPct,
    OneYearReturnPct,
    PortfolioPct,
    Industry,
    PeRatio,
    Currency,
    HoldingValueCad,
    HighestPriceTarget,
    LowestPriceTarget,
}

impl Column {
    pub const ALL: [Column; 17] = [
        Column::Ticker,
        Column::Name,
        Column::Shares,
        Column::Price,
        Column::PurchasePrice,
        Column::HoldingValue,
        Column::HoldingGainChangePct,
        Column::SixMonthReturnPct,
        Column::YtdReturnPct,
        Column::OneYearReturnPct,
        Column::PortfolioPct,
        Column::Industry,
        Column::PeRatio,
        Column::Currency,
        Column::HoldingValueCad,
        Column::HighestPriceTarget,
        Column::LowestPriceTarget,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Column::Ticker => "ticker",
            Column::Name => "name",
            Column::Shares => "shares",
            Column::Price => "price",
            Column::PurchasePrice => "purchase_price",
            Column::HoldingValue => "holding_value",
            Column::HoldingGainChangePct => "holding_gain_change_pct",
            Column::SixMonthReturnPct => "six_month_return_pct",
            Column::YtdReturnPct => "ytd_return_pct",
            Column::OneYearReturnPct => "one_year_return_pct",
            Column::PortfolioPct => "portfolio_pct",
            Column::Industry => "industry",
            Column::PeRatio => "p_e_ratio",
            Column::Currency => "currency",
            Column::HoldingValueCad => "holding_value_cad",
            Column::HighestPriceTarget => "highest_price_target",
            Column::LowestPriceTarget => "lowest_price_target",
        }
    }

    /// Columns computed by the normalizer rather than read from input.
    pub fn is_derived(&self) -> bool {
        matches!(self, Column::Currency | Column::HoldingValueCad)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single cell ready to be bound to a statement. `None` is written as SQL NULL.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(Option<String>),
    Decimal(Option<Decimal>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRow {
    pub ticker: String,
    pub name: Option<String>,
    pub shares: Option<Decimal>,
    pub price: Option<Decimal>,
    pub purchase_price: Option<Decimal>,
    pub holding_value: Option<Decimal>,
    pub holding_gain_change_pct: Option<Decimal>,
    pub six_month_return_pct: Option<Decimal>,
    pub ytd_return_pct: Option<Decimal>,
    pub one_year_return_pct: Option<Decimal>,
    pub portfolio_pct: Option<Decimal>,
    pub industry: Option<String>,
    pub p_e_ratio: Option<Decimal>,
    pub currency: Option<Currency>,
    pub holding_value_cad: Option<Decimal>,
    pub highest_price_target: Option<Decimal>,
    pub lowest_price_target: Option<Decimal>,
}

impl NormalizedRow {
    pub fn new(ticker: impl Into<String>) -> NormalizedRow {
        NormalizedRow {
            ticker: ticker.into(),
            ..Default::default()
        }
    }

    pub fn value(&self, column: Column) -> FieldValue {
        match column {
            Column::Ticker => FieldValue::Text(Some(self.ticker.clone())),
            Column::Name => FieldValue::Text(self.name.clone()),
            Column::Shares => FieldValue::Decimal(self.shares),
            Column::Price => FieldValue::Decimal(self.price),
            Column::PurchasePrice => FieldValue::Decimal(self.purchase_price),
            Column::HoldingValue => FieldValue::Decimal(self.holding_value),
            Column::HoldingGainChangePct => FieldValue::Decimal(self.holding_gain_change_pct),
            Column::SixMonthReturnPct => FieldValue::Decimal(self.six_month_return_pct),
            Column::YtdReturnPct => FieldValue::Decimal(self.ytd_return_pct),
            Column::OneYearReturnPct => FieldValue::Decimal(self.one_year_return_pct),
            Column::PortfolioPct => FieldValue::Decimal(self.portfolio_pct),
            Column::Industry => FieldValue::Text(self.industry.clone()),
            Column::PeRatio => FieldValue::Decimal(self.p_e_ratio),
            Column::Currency => FieldValue::Text(self.currency.map(|c| c.code().to_string())),
            Column::HoldingValueCad => FieldValue::Decimal(self.holding_value_cad),
            Column::HighestPriceTarget => FieldValue::Decimal(self.highest_price_target),
            Column::LowestPriceTarget => FieldValue::Decimal(self.lowest_price_target),
        }
    }

    pub(crate) fn set_text(&mut self, column: Column, value: Option<String>) {
        match column {
            Column::Ticker => self.ticker = value.unwrap_or_default(),
            Column::Name => self.name = value,
            Column::Industry => self.industry = value,
            _ => {},
        }
    }

    pub(crate) fn set_decimal(&mut self, column: Column, value: Option<Decimal>) {
        match column {
            Column::Shares => self.shares = value,
            Column::Price => self.price = value,
            Column::PurchasePrice => self.purchase_price = value,
            Column::HoldingValue => self.holding_value = value,
            Column::HoldingGainChangePct => self.holding_gain_change_pct = value,
            Column::SixMonthReturnPct => self.six_month_return_pct = value,
            Column::YtdReturnPct => self.ytd_return_pct = value,
            Column::OneYearReturnPct => self.one_year_return_pct = value,
            Column::PortfolioPct => self.portfolio_pct = value,
            Column::PeRatio => self.p_e_ratio = value,
            Column::HoldingValueCad => self.holding_value_cad = value,
            Column::HighestPriceTarget => self.highest_price_target = value,
            Column::LowestPriceTarget => self.lowest_price_target = value,
            _ => {},
        }
    }
}
