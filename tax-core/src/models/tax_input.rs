use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use super::FilingStatus;
use crate::parse::parse_currency;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaxInputError {
    #[error("invalid format for {field}: '{input}'")]
    InvalidFormat { field: &'static str, input: String },
}

/// A single "how much tax on this income" request.
///
/// `status` stays optional so that a request missing its filing status can
/// be represented and rejected by validation with a field-specific error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxInput {
    pub year: i32,
    #[serde(default)]
    pub status: Option<FilingStatus>,
    #[serde(deserialize_with = "deserialize_income")]
    pub income: Decimal,
}

impl TaxInput {
    pub fn new(year: i32, status: FilingStatus, income: Decimal) -> Self {
        Self {
            year,
            status: Some(status),
            income,
        }
    }

    /// Builds an input from a possibly currency-formatted income string,
    /// e.g. `"$12,345.67"`.
    pub fn parse(
        year: i32,
        status: Option<FilingStatus>,
        income: &str,
    ) -> Result<Self, TaxInputError> {
        Ok(Self {
            year,
            status,
            income: parse_income(income)?,
        })
    }
}

/// Blank income is a format error, not zero.
pub fn parse_income(raw: &str) -> Result<Decimal, TaxInputError> {
    let invalid = || TaxInputError::InvalidFormat {
        field: "income",
        input: raw.to_string(),
    };
    if raw.trim().is_empty() {
        return Err(invalid());
    }
    parse_currency(raw).map_err(|_| invalid())
}

fn deserialize_income<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_income(&s).map_err(serde::de::Error::custom)
}
