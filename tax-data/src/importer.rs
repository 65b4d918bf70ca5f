use std::collections::BTreeMap;
use std::io::Read;

use serde::Serialize;
use tax_core::{
    BracketEntry, FilingStatus, NoIncomeTaxYear, RepositoryError, TaxRate, TaxRepository,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::normalizer::{CsvNormalizer, NormalizeError};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Outcome of one import run. Every year of the batch lands in exactly one
/// of `imported_years`, `no_income_tax_years` or `skipped_years`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported_years: Vec<i32>,
    pub no_income_tax_years: Vec<i32>,
    pub skipped_years: Vec<i32>,
    /// Set when a single-year batch replaced that year's stored data.
    pub replaced_year: Option<i32>,
    /// Rate rows written; markers are not counted.
    pub rows_written: usize,
}

/// Writes normalized bracket entries to a store, one year at a time.
///
/// Importing is idempotent: years that already have rates or a
/// no-income-tax marker are skipped. A batch that holds exactly one year
/// is treated as a correction and replaces that year instead.
pub struct ImportCoordinator<'a, R: TaxRepository + ?Sized> {
    repo: &'a R,
}

impl<'a, R: TaxRepository + ?Sized> ImportCoordinator<'a, R> {
    pub fn new(repo: &'a R) -> Self {
        Self { repo }
    }

    /// Normalizes a rate table and imports it.
    pub async fn import_csv<Rd: Read>(
        &self,
        reader: Rd,
    ) -> Result<ImportReport, ImportError> {
        let entries = CsvNormalizer::normalize(reader)?;
        self.import_entries(&entries).await
    }

    pub async fn import_entries(
        &self,
        entries: &[BracketEntry],
    ) -> Result<ImportReport, ImportError> {
        let mut by_year: BTreeMap<i32, Vec<&BracketEntry>> = BTreeMap::new();
        for entry in entries {
            by_year.entry(entry.year).or_default().push(entry);
        }

        let mut report = ImportReport::default();

        let single_year = if by_year.len() == 1 {
            by_year.keys().next().copied()
        } else {
            None
        };

        for (year, group) in by_year {
            if single_year == Some(year) {
                self.replace_year(year, &group, &mut report).await?;
                continue;
            }

            if self.already_imported(year).await? {
                info!(year, "year already imported, skipping");
                report.skipped_years.push(year);
                continue;
            }

            if is_no_income_tax_year(&group) {
                match self.repo.save_no_income_tax_year(&NoIncomeTaxYear::new(year)).await {
                    Ok(()) => {
                        info!(year, "recorded no-income-tax year");
                        report.no_income_tax_years.push(year);
                    }
                    Err(RepositoryError::Conflict(reason)) => {
                        warn!(year, %reason, "year written concurrently, skipping");
                        report.skipped_years.push(year);
                    }
                    Err(e) => return Err(e.into()),
                }
                continue;
            }

            let rates: Vec<TaxRate> = group.iter().map(|entry| TaxRate::from(*entry)).collect();
            match self.repo.save_year_rates(year, &rates).await {
                Ok(()) => {
                    info!(year, rows = rates.len(), "imported year");
                    report.rows_written += rates.len();
                    report.imported_years.push(year);
                }
                Err(RepositoryError::Conflict(reason)) => {
                    warn!(year, %reason, "year imported concurrently, skipping");
                    report.skipped_years.push(year);
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!(
            imported = report.imported_years.len(),
            no_income_tax = report.no_income_tax_years.len(),
            skipped = report.skipped_years.len(),
            rows = report.rows_written,
            "import finished"
        );
        Ok(report)
    }

    /// Swaps the stored data for `year` in one repository call, so a failure
    /// leaves the previous rates or marker in place.
    async fn replace_year(
        &self,
        year: i32,
        group: &[&BracketEntry],
        report: &mut ImportReport,
    ) -> Result<(), RepositoryError> {
        let replaced = if is_no_income_tax_year(group) {
            let replaced = self
                .repo
                .replace_with_no_income_tax_year(&NoIncomeTaxYear::new(year))
                .await?;
            report.no_income_tax_years.push(year);
            replaced
        } else {
            let rates: Vec<TaxRate> = group.iter().map(|entry| TaxRate::from(*entry)).collect();
            let replaced = self.repo.replace_year_rates(year, &rates).await?;
            report.rows_written += rates.len();
            report.imported_years.push(year);
            replaced
        };

        info!(year, replaced, "replaced year");
        if replaced {
            report.replaced_year = Some(year);
        }
        Ok(())
    }

    async fn already_imported(
        &self,
        year: i32,
    ) -> Result<bool, RepositoryError> {
        Ok(self.repo.exists_by_year(year).await?
            || self.repo.exists_no_income_tax_year(year).await?)
    }
}

/// One zero-rate entry per filing status.
fn is_no_income_tax_year(group: &[&BracketEntry]) -> bool {
    group.len() == FilingStatus::COUNT && group.iter().all(|entry| entry.rate.is_zero())
}
