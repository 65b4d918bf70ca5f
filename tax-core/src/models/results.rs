use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{FilingStatus, TaxRate};

/// Tax owed on the slice of income that falls inside one bracket.
///
/// `range_end` is the effective end used for the calculation: the bracket
/// ceiling, or the income itself when the income stops inside the bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketTax {
    pub year: i32,
    pub status: FilingStatus,
    pub range_start: Decimal,
    pub range_end: Decimal,
    pub rate: Decimal,
    pub tax_paid: Decimal,
}

/// Per-bracket and aggregate result of a progressive tax calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    pub brackets: Vec<BracketTax>,
    pub total_tax_paid: Decimal,
    /// `total_tax_paid / income`, as a fraction.
    pub average_rate: Decimal,
    /// Set for no-income-tax years.
    pub message: Option<String>,
}

impl TaxBreakdown {
    pub fn no_income_tax(message: impl Into<String>) -> Self {
        Self {
            brackets: Vec::new(),
            total_tax_paid: Decimal::ZERO,
            average_rate: Decimal::ZERO,
            message: Some(message.into()),
        }
    }

    pub fn empty() -> Self {
        Self {
            brackets: Vec::new(),
            total_tax_paid: Decimal::ZERO,
            average_rate: Decimal::ZERO,
            message: None,
        }
    }
}

/// Historical metric that can be charted across years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Metric {
    TopRate,
    MinRate,
    AverageRate,
    BracketCount,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TopRate => "TOP_RATE",
            Self::MinRate => "MIN_RATE",
            Self::AverageRate => "AVERAGE_RATE",
            Self::BracketCount => "BRACKET_COUNT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported metric: {0}")]
pub struct UnknownMetric(pub String);

impl FromStr for Metric {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TOP_RATE" => Ok(Self::TopRate),
            "MIN_RATE" => Ok(Self::MinRate),
            "AVERAGE_RATE" => Ok(Self::AverageRate),
            "BRACKET_COUNT" => Ok(Self::BracketCount),
            _ => Err(UnknownMetric(s.to_string())),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of a summary or history metric.
///
/// A zero rate is reported as [`MetricValue::NoIncomeTax`] so it cannot be
/// mistaken for a genuine 0% bracket value; years recorded as having no
/// income tax at all report [`MetricValue::NotApplicable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MetricValue {
    Rate(Decimal),
    Count(usize),
    NoIncomeTax,
    NotApplicable,
}

impl MetricValue {
    pub fn from_rate(rate: Decimal) -> Self {
        if rate.is_zero() {
            Self::NoIncomeTax
        } else {
            Self::Rate(rate)
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rate(rate) => {
                let percent = (*rate * Decimal::ONE_HUNDRED).round_dp(2).normalize();
                write!(f, "{percent}%")
            }
            Self::Count(count) => write!(f, "{count}"),
            Self::NoIncomeTax => f.write_str("No Income Tax"),
            Self::NotApplicable => f.write_str("N/A"),
        }
    }
}

/// Shape of the bracket table for one year and status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSummary {
    pub year: i32,
    pub status: FilingStatus,
    pub bracket_count: usize,
    pub min_threshold: Decimal,
    /// Highest bounded range end; the open-ended top bracket is excluded.
    pub max_threshold: Decimal,
    pub average_rate: MetricValue,
    pub message: Option<String>,
}

/// One point of a historical metric series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub year: i32,
    pub metric: Metric,
    pub value: MetricValue,
    pub message: Option<String>,
}

/// Rate rows for a year, or the explanation for a no-income-tax year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTable {
    pub year: i32,
    pub rates: Vec<TaxRate>,
    pub message: Option<String>,
}
