//! Normalizes the historical IRS rate table into [`BracketEntry`] rows.
//!
//! The table has one header line, then positional rows:
//!
//! | column | content                                 |
//! |--------|-----------------------------------------|
//! | 0      | year, possibly with a suffix (`1940(A)`) |
//! | 1-3    | MFJ rate, placeholder, range start      |
//! | 4-6    | MFS rate, placeholder, range start      |
//! | 7-9    | Single rate, placeholder, range start   |
//! | 10-12  | HH rate, placeholder, range start       |
//! | 13     | note (optional)                         |
//!
//! Range ends are not in the file; they are inferred from the next
//! bracket's start once every row has been read.

use std::collections::BTreeMap;
use std::io::Read;
use std::sync::LazyLock;

use csv::{ReaderBuilder, StringRecord, Trim};
use regex::Regex;
use rust_decimal::Decimal;
use tax_core::calculations::common::is_valid_rate;
use tax_core::parse::{parse_currency, parse_percent};
use tax_core::{BracketEntry, FilingStatus, YearStatus};
use thiserror::Error;
use tracing::debug;

/// Errors raised while normalizing a rate table.
///
/// Row numbers count data rows from 1 (the header is not counted) and
/// column numbers are 1-based.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("row {row}: expected at least {expected} fields, found {found}")]
    MalformedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("row {row}: invalid year '{value}'")]
    InvalidYear { row: usize, value: String },

    #[error("row {row}, column {column}: invalid rate '{value}'")]
    InvalidRate {
        row: usize,
        column: usize,
        value: String,
    },

    #[error("row {row}, column {column}: invalid amount '{value}'")]
    InvalidAmount {
        row: usize,
        column: usize,
        value: String,
    },

    #[error("CSV parse error: {0}")]
    Csv(String),
}

impl From<csv::Error> for NormalizeError {
    fn from(err: csv::Error) -> Self {
        NormalizeError::Csv(err.to_string())
    }
}

const MIN_FIELDS: usize = 13;
const NOTE_COLUMN: usize = 13;
const MFJ_RATE_COLUMN: usize = 1;

/// (status, rate column, range start column), in file order.
const STATUS_COLUMNS: [(FilingStatus, usize, usize); 4] = [
    (FilingStatus::MarriedFilingJointly, 1, 3),
    (FilingStatus::MarriedFilingSeparately, 4, 6),
    (FilingStatus::Single, 7, 9),
    (FilingStatus::HeadOfHousehold, 10, 12),
];

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})\s*(?:\([^)]*\))?$").expect("valid regex"));

/// Stateless parser for the historical rate table.
pub struct CsvNormalizer;

impl CsvNormalizer {
    /// Parses every data row and infers range ends.
    ///
    /// Rows with a blank year are skipped. Entries come back in file
    /// order; any row-shape or numeric error aborts the whole parse.
    pub fn normalize<R: Read>(reader: R) -> Result<Vec<BracketEntry>, NormalizeError> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let mut entries = Vec::new();
        for (index, result) in csv_reader.records().enumerate() {
            let record = result?;
            if record.get(0).is_none_or(str::is_empty) {
                continue;
            }
            entries.extend(parse_row(index + 1, &record)?);
        }

        infer_range_ends(&mut entries);
        debug!(entries = entries.len(), "normalized rate table");
        Ok(entries)
    }
}

fn parse_row(
    row: usize,
    record: &StringRecord,
) -> Result<Vec<BracketEntry>, NormalizeError> {
    if record.len() < MIN_FIELDS {
        return Err(NormalizeError::MalformedRow {
            row,
            expected: MIN_FIELDS,
            found: record.len(),
        });
    }

    let year = parse_year(row, &record[0])?;
    let note = record
        .get(NOTE_COLUMN)
        .filter(|note| !note.is_empty())
        .map(str::to_string);
    let mfj_blank = record[MFJ_RATE_COLUMN].is_empty();

    let mut entries = Vec::with_capacity(STATUS_COLUMNS.len());
    for (status, rate_column, start_column) in STATUS_COLUMNS {
        let rate_blank = record[rate_column].is_empty();
        let emit = match status {
            FilingStatus::MarriedFilingJointly => !rate_blank,
            _ => !(rate_blank && mfj_blank),
        };
        if !emit {
            continue;
        }

        let (rate, range_start) = match parse_rate(row, rate_column, &record[rate_column])? {
            None => (Decimal::ZERO, Decimal::ZERO),
            Some(rate) => (rate, parse_amount(row, start_column, &record[start_column])?),
        };

        entries.push(BracketEntry {
            year,
            status,
            rate,
            range_start,
            range_end: None,
            note: note.clone(),
        });
    }
    Ok(entries)
}

fn parse_year(
    row: usize,
    raw: &str,
) -> Result<i32, NormalizeError> {
    YEAR_RE
        .captures(raw)
        .and_then(|caps| caps[1].parse().ok())
        .ok_or_else(|| NormalizeError::InvalidYear {
            row,
            value: raw.to_string(),
        })
}

/// `None` for a "no income tax" cell (blank or the literal phrase).
fn parse_rate(
    row: usize,
    column: usize,
    raw: &str,
) -> Result<Option<Decimal>, NormalizeError> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("no income tax") {
        return Ok(None);
    }
    let invalid = || NormalizeError::InvalidRate {
        row,
        column: column + 1,
        value: raw.to_string(),
    };
    let rate = parse_percent(raw).map_err(|_| invalid())?;
    if !is_valid_rate(rate) {
        return Err(invalid());
    }
    Ok(Some(rate))
}

fn parse_amount(
    row: usize,
    column: usize,
    raw: &str,
) -> Result<Decimal, NormalizeError> {
    let invalid = || NormalizeError::InvalidAmount {
        row,
        column: column + 1,
        value: raw.to_string(),
    };
    let amount = parse_currency(raw).map_err(|_| invalid())?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(invalid());
    }
    Ok(amount)
}

/// Sets `range_end` on every entry, grouped by (year, status).
///
/// Within a group sorted by `range_start`: a zero-rate bracket ends where
/// it starts, any other bracket ends at the next bracket's start, and the
/// last one is unbounded. Entry order is left unchanged.
pub fn infer_range_ends(entries: &mut [BracketEntry]) {
    let mut groups: BTreeMap<YearStatus, Vec<usize>> = BTreeMap::new();
    for (index, entry) in entries.iter().enumerate() {
        groups
            .entry(YearStatus::new(entry.year, entry.status))
            .or_default()
            .push(index);
    }

    for indices in groups.values_mut() {
        indices.sort_by_key(|&i| entries[i].range_start);
        for (position, &i) in indices.iter().enumerate() {
            let range_end = if entries[i].rate.is_zero() {
                Some(entries[i].range_start)
            } else {
                indices
                    .get(position + 1)
                    .map(|&next| entries[next].range_start)
            };
            entries[i].range_end = range_end;
        }
    }
}
