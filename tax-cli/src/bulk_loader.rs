//! CSV loader for bulk "what would I owe" simulations.
//!
//! ## CSV Format
//!
//! Headers are matched by name; column order does not matter.
//!
//! | Column   | Required | Type    | Notes                                    |
//! |----------|----------|---------|------------------------------------------|
//! | `year`   | yes      | integer | e.g. `2021`                              |
//! | `status` | no       | string  | `S`, `HH` (or `HOH`), `MFJ`, `MFS`       |
//! | `income` | yes      | decimal | `$` and `,` allowed, e.g. `"$50,000.00"` |
//!
//! A blank `status` is loaded as missing and rejected later by validation,
//! so the error names the field rather than the file.
//!
//! ```csv
//! year,status,income
//! 2021,S,50000.00
//! 2020,MFJ,"$120,000"
//! ```
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tax_core::{FilingStatus, TaxInput, TaxInputError};

#[derive(Debug, Deserialize)]
struct CsvRow {
    year: i32,
    #[serde(default)]
    status: String,
    income: String,
}

/// Errors that can occur while loading a bulk input file.
#[derive(Debug, thiserror::Error)]
pub enum BulkLoadError {
    /// Bad structure, missing required column or a non-integer year.
    #[error("CSV parse error: {0}")]
    Parse(#[from] csv::Error),

    /// `row` is 1-based (header = row 0).
    #[error("unrecognised filing status '{status}' on row {row}")]
    InvalidFilingStatus { status: String, row: usize },

    #[error("row {row}: {source}")]
    InvalidIncome {
        row: usize,
        #[source]
        source: TaxInputError,
    },

    #[error("cannot read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn convert_row(
    row: CsvRow,
    row_number: usize,
) -> Result<TaxInput, BulkLoadError> {
    let status = if row.status.is_empty() {
        None
    } else {
        let parsed = FilingStatus::parse(&row.status).ok_or_else(|| {
            BulkLoadError::InvalidFilingStatus {
                status: row.status.clone(),
                row: row_number,
            }
        })?;
        Some(parsed)
    };

    TaxInput::parse(row.year, status, &row.income).map_err(|source| {
        BulkLoadError::InvalidIncome {
            row: row_number,
            source,
        }
    })
}

/// Parse CSV text and return the inputs in file order.
pub fn load_from_str(input: &str) -> Result<Vec<TaxInput>, BulkLoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(input.as_bytes());

    reader
        .deserialize::<CsvRow>()
        .enumerate()
        .map(|(idx, result)| {
            let row = result?;
            convert_row(row, idx + 1)
        })
        .collect()
}

/// Read a file from disk and delegate to [`load_from_str`].
pub fn load_from_file(path: &Path) -> Result<Vec<TaxInput>, BulkLoadError> {
    let contents = std::fs::read_to_string(path).map_err(|source| BulkLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents)
}
