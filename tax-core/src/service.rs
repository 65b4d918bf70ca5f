//! Query facade over a [`TaxRepository`].
//!
//! [`TaxService`] validates requests, reads bracket rows from the store and
//! hands them to the pure functions in [`crate::calculations`].
//!
//! | operation                  | returns                     |
//! |----------------------------|-----------------------------|
//! | `calculate_tax_breakdown`  | [`TaxBreakdown`]            |
//! | `simulate_bulk`            | one breakdown per input     |
//! | `get_summary`              | [`TaxSummary`]              |
//! | `get_history`              | [`HistoryPoint`] per year   |
//! | `get_rates`                | [`RateTable`]               |
//! | `list_years`               | years with any stored data  |

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, warn};

use crate::calculations::{ProgressiveCalculator, metric_value, summarize};
use crate::config::YearRange;
use crate::db::repository::{RepositoryError, TaxRepository};
use crate::models::{
    FILING_STATUS_LABELS, FilingStatus, HistoryPoint, Metric, MetricValue, NoIncomeTaxYear,
    RateTable, TaxBreakdown, TaxInput, TaxRate, TaxSummary, UnknownMetric,
};

#[derive(Debug, Error)]
pub enum TaxServiceError {
    #[error("invalid {field}: {reason}")]
    InvalidArgument { field: &'static str, reason: String },

    /// Store failures keep their detail in `source()` only.
    #[error("internal error while reading tax data")]
    Repository(#[from] RepositoryError),
}

impl TaxServiceError {
    fn invalid(
        field: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidArgument {
            field,
            reason: reason.into(),
        }
    }
}

pub struct TaxService<'a, R: TaxRepository + ?Sized> {
    repo: &'a R,
    years: YearRange,
}

impl<'a, R: TaxRepository + ?Sized> TaxService<'a, R> {
    /// Service accepting years from 1862 through last year.
    pub fn new(repo: &'a R) -> Self {
        Self::with_year_range(repo, YearRange::current())
    }

    pub fn with_year_range(
        repo: &'a R,
        years: YearRange,
    ) -> Self {
        Self { repo, years }
    }

    pub fn year_range(&self) -> YearRange {
        self.years
    }

    fn validate_year(
        &self,
        field: &'static str,
        year: i32,
    ) -> Result<(), TaxServiceError> {
        if self.years.contains(year) {
            Ok(())
        } else {
            Err(TaxServiceError::invalid(
                field,
                format!(
                    "{year} is outside the supported range {}-{}",
                    self.years.min, self.years.max
                ),
            ))
        }
    }

    /// Checks year, income and status in that order, returning the status.
    pub fn validate_input(
        &self,
        input: &TaxInput,
    ) -> Result<FilingStatus, TaxServiceError> {
        self.validate_year("year", input.year)?;
        if input.income <= Decimal::ZERO {
            return Err(TaxServiceError::invalid(
                "income",
                format!("must be greater than 0, got {}", input.income),
            ));
        }
        input
            .status
            .ok_or_else(|| TaxServiceError::invalid("status", "filing status is required"))
    }

    /// Message of the year's no-income-tax marker, if it has one.
    async fn no_income_tax_message(
        &self,
        year: i32,
    ) -> Result<Option<String>, TaxServiceError> {
        if !self.repo.exists_no_income_tax_year(year).await? {
            return Ok(None);
        }
        let message = self
            .repo
            .find_no_income_tax_year(year)
            .await?
            .map(|marker| marker.message)
            .unwrap_or_else(|| NoIncomeTaxYear::fallback_message(year));
        Ok(Some(message))
    }

    /// Progressive tax on `input.income` for its year and filing status.
    ///
    /// A no-income-tax year yields zero brackets and the marker's message.
    /// A valid year with no stored brackets yields an empty breakdown.
    pub async fn calculate_tax_breakdown(
        &self,
        input: &TaxInput,
    ) -> Result<TaxBreakdown, TaxServiceError> {
        let status = self.validate_input(input)?;

        if let Some(message) = self.no_income_tax_message(input.year).await? {
            debug!(year = input.year, "no income tax for year");
            return Ok(TaxBreakdown::no_income_tax(message));
        }

        let brackets = self
            .repo
            .find_by_year_and_status_below(input.year, status, input.income)
            .await?;
        if brackets.is_empty() {
            debug!(year = input.year, %status, "no brackets stored");
        }

        let breakdown = ProgressiveCalculator::new(&brackets)
            .calculate(input.income)
            .map_err(|e| TaxServiceError::invalid("income", e.to_string()))?;

        debug!(
            year = input.year,
            %status,
            brackets = breakdown.brackets.len(),
            total = %breakdown.total_tax_paid,
            "calculated tax breakdown"
        );
        Ok(breakdown)
    }

    /// Calculates every input in order, stopping at the first failure.
    pub async fn simulate_bulk(
        &self,
        inputs: &[TaxInput],
    ) -> Result<Vec<TaxBreakdown>, TaxServiceError> {
        let mut results = Vec::with_capacity(inputs.len());
        for (index, input) in inputs.iter().enumerate() {
            let breakdown = self.calculate_tax_breakdown(input).await.inspect_err(|e| {
                warn!(index, year = input.year, error = %e, "bulk simulation stopped");
            })?;
            results.push(breakdown);
        }
        Ok(results)
    }

    pub async fn get_summary(
        &self,
        year: i32,
        status: FilingStatus,
    ) -> Result<TaxSummary, TaxServiceError> {
        self.validate_year("year", year)?;

        if let Some(message) = self.no_income_tax_message(year).await? {
            return Ok(TaxSummary {
                year,
                status,
                bracket_count: 0,
                min_threshold: Decimal::ZERO,
                max_threshold: Decimal::ZERO,
                average_rate: MetricValue::NoIncomeTax,
                message: Some(message),
            });
        }

        let rates = self.repo.find_by_year_and_status(year, status).await?;
        Ok(summarize(year, status, &rates))
    }

    /// One point per year in `start_year..=end_year` that has data for
    /// `status` or a no-income-tax marker, ascending.
    ///
    /// `metric` is a case-insensitive metric name such as `TOP_RATE`.
    pub async fn get_history(
        &self,
        status: FilingStatus,
        metric: &str,
        start_year: i32,
        end_year: i32,
    ) -> Result<Vec<HistoryPoint>, TaxServiceError> {
        let metric: Metric = metric
            .parse()
            .map_err(|e: UnknownMetric| TaxServiceError::invalid("metric", e.to_string()))?;
        self.validate_year("start_year", start_year)?;
        self.validate_year("end_year", end_year)?;
        if start_year > end_year {
            return Err(TaxServiceError::invalid(
                "start_year",
                format!("{start_year} is after end_year {end_year}"),
            ));
        }
        let span = start_year..=end_year;

        let mut by_year: BTreeMap<i32, Vec<TaxRate>> = BTreeMap::new();
        for rate in self.repo.find_by_status(status).await? {
            if span.contains(&rate.year) {
                by_year.entry(rate.year).or_default().push(rate);
            }
        }

        let markers: BTreeMap<i32, String> = self
            .repo
            .list_no_income_tax_years()
            .await?
            .into_iter()
            .filter(|marker| span.contains(&marker.year))
            .map(|marker| (marker.year, marker.message))
            .collect();

        let years: BTreeSet<i32> = by_year.keys().chain(markers.keys()).copied().collect();

        let points = years
            .into_iter()
            .map(|year| match markers.get(&year) {
                Some(message) => HistoryPoint {
                    year,
                    metric,
                    value: MetricValue::NotApplicable,
                    message: Some(message.clone()),
                },
                None => HistoryPoint {
                    year,
                    metric,
                    value: metric_value(metric, by_year.get(&year).map(Vec::as_slice).unwrap_or_default()),
                    message: None,
                },
            })
            .collect();
        Ok(points)
    }

    /// Every year with rate rows or a no-income-tax marker, ascending.
    pub async fn list_years(&self) -> Result<Vec<i32>, TaxServiceError> {
        let mut years: BTreeSet<i32> = self.repo.list_rate_years().await?.into_iter().collect();
        years.extend(
            self.repo
                .list_no_income_tax_years()
                .await?
                .into_iter()
                .map(|marker| marker.year),
        );
        Ok(years.into_iter().collect())
    }

    pub fn filing_statuses(&self) -> &'static [(FilingStatus, &'static str, &'static str)] {
        &FILING_STATUS_LABELS
    }

    /// Stored rate rows for `year`, optionally restricted to one status,
    /// ordered by status then range start.
    pub async fn get_rates(
        &self,
        year: i32,
        status: Option<FilingStatus>,
    ) -> Result<RateTable, TaxServiceError> {
        self.validate_year("year", year)?;

        if let Some(message) = self.no_income_tax_message(year).await? {
            return Ok(RateTable {
                year,
                rates: Vec::new(),
                message: Some(message),
            });
        }

        let rates = match status {
            Some(status) => self.repo.find_by_year_and_status(year, status).await?,
            None => self.repo.find_by_year(year).await?,
        };
        Ok(RateTable {
            year,
            rates,
            message: None,
        })
    }
}
