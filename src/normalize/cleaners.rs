use std::str::FromStr;

use enum_dispatch::enum_dispatch;
use log::debug;
use rust_decimal::Decimal;

use super::row::{Column, Currency, FieldValue};

#[enum_dispatch]
pub trait FieldCleaner {
    /// Turns a raw cell into a typed value. A miss yields a null value, never an error.
    fn clean(&self, raw: &str) -> FieldValue;
}

#[enum_dispatch(FieldCleaner)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cleaner {
    TextField,
    NumericField,
    PercentField,
    PriceTargetField,
    RatioField,
}

impl Cleaner {
    pub fn for_column(column: Column) -> Cleaner {
        match column {
            Column::Ticker | Column::Name | Column::Industry | Column::Currency => TextField.into(),
            Column::Shares
            | Column::Price
            | Column::PurchasePrice
            | Column::HoldingValue
            | Column::HoldingValueCad => NumericField.into(),
            Column::HoldingGainChangePct
            | Column::SixMonthReturnPct
            | Column::YtdReturnPct
            | Column::OneYearReturnPct
            | Column::PortfolioPct => PercentField.into(),
            Column::HighestPriceTarget | Column::LowestPriceTarget => PriceTargetField.into(),
            Column::PeRatio => RatioField.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextField;

impl FieldCleaner for TextField {
    fn clean(&self, raw: &str) -> FieldValue {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            FieldValue::Text(None)
        } else {
            FieldValue::Text(Some(trimmed.to_string()))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericField;

impl FieldCleaner for NumericField {
    fn clean(&self, raw: &str) -> FieldValue {
        FieldValue::Decimal(clean_numeric(raw, false))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentField;

impl FieldCleaner for PercentField {
    fn clean(&self, raw: &str) -> FieldValue {
        FieldValue::Decimal(clean_numeric(raw, true))
    }
}

/// Analyst targets come as `"123.45 (avg)"`; only the leading token is numeric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceTargetField;

impl FieldCleaner for PriceTargetField {
    fn clean(&self, raw: &str) -> FieldValue {
        FieldValue::Decimal(parse_price_target(raw))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioField;

impl FieldCleaner for RatioField {
    fn clean(&self, raw: &str) -> FieldValue {
        let digits: String = raw.trim().chars().filter(|c| *c != ',').collect();
        FieldValue::Decimal(Decimal::from_str(&digits).ok())
    }
}

/// Keeps only digits and `.`, then parses. Empty or unparsable input is `None`.
///
/// The sign is not a kept character, so `"-5%"` cleans to `5`.
pub fn clean_numeric(text: &str, is_percentage: bool) -> Option<Decimal> {
    let mut text = text.trim().to_string();
    if is_percentage {
        text = text.replace('%', "");
    }

    let digits: String = text.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
    if digits.is_empty() {
        return None;
    }

    match Decimal::from_str(&digits) {
        Ok(value) => Some(value),
        Err(err) => {
            debug!("dropping unparsable number, value={}, err={}", digits, err);
            None
        },
    }
}

pub fn parse_price_target(text: &str) -> Option<Decimal> {
    let token = text.trim().split(' ').next().unwrap_or_default();
    clean_numeric(token, false)
}

/// Any `C` in the raw holding value (`"1200 C$"`, `"CAD 50"`) marks it as Canadian.
pub fn detect_currency(raw: Option<&str>) -> Currency {
    match raw {
        Some(text) if text.to_uppercase().contains('C') => Currency::Cad,
        _ => Currency::Usd,
    }
}

/// A conversion that overflows the decimal range yields `None`.
pub fn convert_to_cad(holding_value: Option<Decimal>, currency: Currency, usd_to_cad_rate: Decimal) -> Option<Decimal> {
    match currency {
        Currency::Cad => holding_value,
        Currency::Usd => holding_value.and_then(|value| {
            let converted = value.checked_mul(usd_to_cad_rate);
            if converted.is_none() {
                debug!("holding value {} overflows when converted at rate {}", value, usd_to_cad_rate);
            }
            converted
        }),
    }
}
