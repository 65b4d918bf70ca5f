use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{FilingStatus, NoIncomeTaxYear, TaxRate};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    /// A uniqueness constraint rejected the write; the data is already there.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Storage for persisted marginal rate rows.
///
/// Queries for a year or status with no data return an empty list.
#[async_trait]
pub trait TaxRateRepository: Send + Sync {
    async fn save_rate(
        &self,
        rate: &TaxRate,
    ) -> Result<(), RepositoryError>;

    /// Writes every row of one year as a unit, claiming the year first.
    ///
    /// Fails with [`RepositoryError::Conflict`] (and writes nothing) if the
    /// year has already been claimed by an earlier import.
    async fn save_year_rates(
        &self,
        year: i32,
        rates: &[TaxRate],
    ) -> Result<(), RepositoryError>;

    /// Replaces everything stored for `year` as one unit: its rate rows,
    /// its claim and any no-income-tax marker are removed, then `rates` are
    /// written under a fresh claim. On failure the old data is left intact.
    ///
    /// Returns whether the year held rates or a marker beforehand.
    async fn replace_year_rates(
        &self,
        year: i32,
        rates: &[TaxRate],
    ) -> Result<bool, RepositoryError>;

    async fn find_by_year(
        &self,
        year: i32,
    ) -> Result<Vec<TaxRate>, RepositoryError>;

    /// Rows ordered by `range_start`.
    async fn find_by_year_and_status(
        &self,
        year: i32,
        status: FilingStatus,
    ) -> Result<Vec<TaxRate>, RepositoryError>;

    /// Rows with `range_start < income`, ordered by `range_start`.
    async fn find_by_year_and_status_below(
        &self,
        year: i32,
        status: FilingStatus,
        income: Decimal,
    ) -> Result<Vec<TaxRate>, RepositoryError>;

    async fn exists_by_year(
        &self,
        year: i32,
    ) -> Result<bool, RepositoryError>;

    /// Deletes every row of `year` and releases its claim. Returns the
    /// number of rate rows removed.
    async fn delete_by_year(
        &self,
        year: i32,
    ) -> Result<u64, RepositoryError>;

    async fn find_by_status(
        &self,
        status: FilingStatus,
    ) -> Result<Vec<TaxRate>, RepositoryError>;

    /// Distinct years that have rate rows, ascending.
    async fn list_rate_years(&self) -> Result<Vec<i32>, RepositoryError>;
}

/// Storage for no-income-tax year markers, keyed by year.
#[async_trait]
pub trait NoIncomeTaxYearRepository: Send + Sync {
    /// Records the marker and claims its year in one unit.
    ///
    /// Fails with [`RepositoryError::Conflict`] (and writes nothing) if the
    /// year is already marked or already holds imported rates.
    async fn save_no_income_tax_year(
        &self,
        marker: &NoIncomeTaxYear,
    ) -> Result<(), RepositoryError>;

    /// Like [`TaxRateRepository::replace_year_rates`], but stores `marker`
    /// in place of rate rows.
    async fn replace_with_no_income_tax_year(
        &self,
        marker: &NoIncomeTaxYear,
    ) -> Result<bool, RepositoryError>;

    async fn exists_no_income_tax_year(
        &self,
        year: i32,
    ) -> Result<bool, RepositoryError>;

    async fn find_no_income_tax_year(
        &self,
        year: i32,
    ) -> Result<Option<NoIncomeTaxYear>, RepositoryError>;

    /// All markers, ordered by year.
    async fn list_no_income_tax_years(&self) -> Result<Vec<NoIncomeTaxYear>, RepositoryError>;

    /// Removes the marker and releases its claim. Returns whether a marker
    /// was removed.
    async fn delete_no_income_tax_year(
        &self,
        year: i32,
    ) -> Result<bool, RepositoryError>;
}

/// Everything the import and query paths need from a backend.
pub trait TaxRepository: TaxRateRepository + NoIncomeTaxYearRepository {}

impl<T> TaxRepository for T where T: TaxRateRepository + NoIncomeTaxYearRepository {}
