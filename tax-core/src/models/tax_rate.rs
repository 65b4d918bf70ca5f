use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::FilingStatus;

/// One normalized bracket produced from a historical rate table.
///
/// `range_end` is `None` for the top bracket of a (year, status) group,
/// which has no ceiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketEntry {
    pub year: i32,
    pub status: FilingStatus,
    pub rate: Decimal,
    pub range_start: Decimal,
    pub range_end: Option<Decimal>,
    pub note: Option<String>,
}

/// A persisted marginal rate row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate {
    pub year: i32,
    pub status: FilingStatus,
    pub rate: Decimal,
    pub range_start: Decimal,
    pub range_end: Option<Decimal>,
}

impl From<&BracketEntry> for TaxRate {
    fn from(entry: &BracketEntry) -> Self {
        TaxRate {
            year: entry.year,
            status: entry.status,
            rate: entry.rate,
            range_start: entry.range_start,
            range_end: entry.range_end,
        }
    }
}

/// Grouping key used when inferring range ends and aggregating rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearStatus {
    pub year: i32,
    pub status: FilingStatus,
}

impl YearStatus {
    pub fn new(year: i32, status: FilingStatus) -> Self {
        Self { year, status }
    }
}
