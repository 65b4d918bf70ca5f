//! Summaries and historical metrics derived from a bracket table.

use rust_decimal::Decimal;

use crate::models::{FilingStatus, Metric, MetricValue, TaxRate, TaxSummary};

/// Summarizes the bracket table of one (year, status) group.
///
/// `max_threshold` ignores the open-ended top bracket; it is 0 when no
/// bracket is bounded. An empty table produces a zero summary.
pub fn summarize(
    year: i32,
    status: FilingStatus,
    rates: &[TaxRate],
) -> TaxSummary {
    let min_threshold = rates
        .iter()
        .map(|r| r.range_start)
        .min()
        .unwrap_or(Decimal::ZERO);

    let max_threshold = rates
        .iter()
        .filter_map(|r| r.range_end)
        .max()
        .unwrap_or(Decimal::ZERO);

    TaxSummary {
        year,
        status,
        bracket_count: rates.len(),
        min_threshold,
        max_threshold,
        average_rate: MetricValue::from_rate(mean_rate(rates)),
        message: None,
    }
}

/// Computes `metric` over one year's brackets.
pub fn metric_value(
    metric: Metric,
    rates: &[TaxRate],
) -> MetricValue {
    match metric {
        Metric::TopRate => {
            MetricValue::from_rate(rates.iter().map(|r| r.rate).max().unwrap_or(Decimal::ZERO))
        }
        Metric::MinRate => {
            MetricValue::from_rate(rates.iter().map(|r| r.rate).min().unwrap_or(Decimal::ZERO))
        }
        Metric::AverageRate => MetricValue::from_rate(mean_rate(rates)),
        Metric::BracketCount => MetricValue::Count(rates.len()),
    }
}

/// Arithmetic mean of the bracket rates, 0 for an empty table.
pub fn mean_rate(rates: &[TaxRate]) -> Decimal {
    if rates.is_empty() {
        return Decimal::ZERO;
    }
    let sum: Decimal = rates.iter().map(|r| r.rate).sum();
    (sum / Decimal::from(rates.len())).normalize()
}
