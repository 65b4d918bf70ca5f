//! Parsing helpers for decorated currency and percentage cells.
//!
//! Historical rate tables and user input both arrive as text such as
//! `"$12,345.67"` or `"24%"`. Everything is parsed straight into
//! [`Decimal`]; nothing passes through binary floating point.

use rust_decimal::Decimal;
use thiserror::Error;

/// Error returned when a string cannot be parsed as a [`Decimal`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid decimal '{input}': {reason}")]
pub struct ParseDecimalError {
    pub input: String,
    pub reason: String,
}

/// Trims whitespace and removes the `$` sign and `,` thousands separators.
fn normalize_currency_input(s: &str) -> String {
    s.trim().replace(['$', ','], "").trim().to_string()
}

fn parse_normalized(original: &str, normalized: &str) -> Result<Decimal, ParseDecimalError> {
    normalized
        .parse::<Decimal>()
        .map_err(|e| ParseDecimalError {
            input: original.to_string(),
            reason: e.to_string(),
        })
}

/// Parses a currency amount such as `"$1,234.56"`.
///
/// Empty or whitespace-only input is treated as 0.
pub fn parse_currency(s: &str) -> Result<Decimal, ParseDecimalError> {
    let normalized = normalize_currency_input(s);
    if normalized.is_empty() {
        return Ok(Decimal::ZERO);
    }
    parse_normalized(s, &normalized)
}

/// Parses a percentage such as `"24%"` or `"24.5"` into a fraction
/// (`0.24`, `0.245`).
///
/// Empty or whitespace-only input is treated as 0.
pub fn parse_percent(s: &str) -> Result<Decimal, ParseDecimalError> {
    let normalized = s.trim().trim_end_matches('%').trim();
    if normalized.is_empty() {
        return Ok(Decimal::ZERO);
    }
    let value = parse_normalized(s, normalized)?;
    Ok(value / Decimal::ONE_HUNDRED)
}
