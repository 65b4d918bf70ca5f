//! Process-local backend, used by tests and the `memory` backend name.
//!
//! It enforces the same uniqueness rules as the SQLite schema: one claim
//! per imported year and one marker per no-income-tax year.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::factory::{DbConfig, RepositoryFactory};
use super::repository::{
    NoIncomeTaxYearRepository, RepositoryError, TaxRateRepository, TaxRepository,
};
use crate::models::{FilingStatus, NoIncomeTaxYear, TaxRate};

#[derive(Debug, Default)]
struct State {
    rates: Vec<TaxRate>,
    claimed_years: BTreeSet<i32>,
    markers: BTreeMap<i32, NoIncomeTaxYear>,
}

#[derive(Debug, Default)]
pub struct InMemoryRepository {
    state: Mutex<State>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored rate rows.
    pub fn rate_count(&self) -> usize {
        self.state().map(|s| s.rates.len()).unwrap_or(0)
    }

    fn state(&self) -> Result<MutexGuard<'_, State>, RepositoryError> {
        self.state
            .lock()
            .map_err(|e| RepositoryError::Database(format!("state lock poisoned: {e}")))
    }

    /// Drops the year's rates, marker and claim; true if any data was there.
    fn clear_year(
        state: &mut State,
        year: i32,
    ) -> bool {
        let before = state.rates.len();
        state.rates.retain(|r| r.year != year);
        let had_marker = state.markers.remove(&year).is_some();
        state.claimed_years.remove(&year);
        before != state.rates.len() || had_marker
    }

    fn sorted(mut rates: Vec<TaxRate>) -> Vec<TaxRate> {
        rates.sort_by(|a, b| {
            (a.status, a.range_start).cmp(&(b.status, b.range_start))
        });
        rates
    }
}

#[async_trait]
impl TaxRateRepository for InMemoryRepository {
    async fn save_rate(
        &self,
        rate: &TaxRate,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        state.claimed_years.insert(rate.year);
        state.rates.push(rate.clone());
        Ok(())
    }

    async fn save_year_rates(
        &self,
        year: i32,
        rates: &[TaxRate],
    ) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        if !state.claimed_years.insert(year) {
            return Err(RepositoryError::Conflict(format!(
                "tax rates for {year} already imported"
            )));
        }
        state.rates.extend(rates.iter().cloned());
        Ok(())
    }

    async fn replace_year_rates(
        &self,
        year: i32,
        rates: &[TaxRate],
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state()?;
        let replaced = Self::clear_year(&mut state, year);
        state.claimed_years.insert(year);
        state.rates.extend(rates.iter().cloned());
        Ok(replaced)
    }

    async fn find_by_year(
        &self,
        year: i32,
    ) -> Result<Vec<TaxRate>, RepositoryError> {
        let state = self.state()?;
        let rates = state.rates.iter().filter(|r| r.year == year).cloned().collect();
        Ok(Self::sorted(rates))
    }

    async fn find_by_year_and_status(
        &self,
        year: i32,
        status: FilingStatus,
    ) -> Result<Vec<TaxRate>, RepositoryError> {
        let state = self.state()?;
        let rates = state
            .rates
            .iter()
            .filter(|r| r.year == year && r.status == status)
            .cloned()
            .collect();
        Ok(Self::sorted(rates))
    }

    async fn find_by_year_and_status_below(
        &self,
        year: i32,
        status: FilingStatus,
        income: Decimal,
    ) -> Result<Vec<TaxRate>, RepositoryError> {
        let mut rates = self.find_by_year_and_status(year, status).await?;
        rates.retain(|r| r.range_start < income);
        Ok(rates)
    }

    async fn exists_by_year(
        &self,
        year: i32,
    ) -> Result<bool, RepositoryError> {
        Ok(self.state()?.rates.iter().any(|r| r.year == year))
    }

    async fn delete_by_year(
        &self,
        year: i32,
    ) -> Result<u64, RepositoryError> {
        let mut state = self.state()?;
        let before = state.rates.len();
        state.rates.retain(|r| r.year != year);
        state.claimed_years.remove(&year);
        Ok((before - state.rates.len()) as u64)
    }

    async fn find_by_status(
        &self,
        status: FilingStatus,
    ) -> Result<Vec<TaxRate>, RepositoryError> {
        let state = self.state()?;
        let mut rates: Vec<TaxRate> =
            state.rates.iter().filter(|r| r.status == status).cloned().collect();
        rates.sort_by(|a, b| (a.year, a.range_start).cmp(&(b.year, b.range_start)));
        Ok(rates)
    }

    async fn list_rate_years(&self) -> Result<Vec<i32>, RepositoryError> {
        let state = self.state()?;
        let years: BTreeSet<i32> = state.rates.iter().map(|r| r.year).collect();
        Ok(years.into_iter().collect())
    }
}

#[async_trait]
impl NoIncomeTaxYearRepository for InMemoryRepository {
    async fn save_no_income_tax_year(
        &self,
        marker: &NoIncomeTaxYear,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        if state.markers.contains_key(&marker.year) {
            return Err(RepositoryError::Conflict(format!(
                "year {} is already marked as having no income tax",
                marker.year
            )));
        }
        if !state.claimed_years.insert(marker.year) {
            return Err(RepositoryError::Conflict(format!(
                "tax rates for {} already imported",
                marker.year
            )));
        }
        state.markers.insert(marker.year, marker.clone());
        Ok(())
    }

    async fn replace_with_no_income_tax_year(
        &self,
        marker: &NoIncomeTaxYear,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state()?;
        let replaced = Self::clear_year(&mut state, marker.year);
        state.claimed_years.insert(marker.year);
        state.markers.insert(marker.year, marker.clone());
        Ok(replaced)
    }

    async fn exists_no_income_tax_year(
        &self,
        year: i32,
    ) -> Result<bool, RepositoryError> {
        Ok(self.state()?.markers.contains_key(&year))
    }

    async fn find_no_income_tax_year(
        &self,
        year: i32,
    ) -> Result<Option<NoIncomeTaxYear>, RepositoryError> {
        Ok(self.state()?.markers.get(&year).cloned())
    }

    async fn list_no_income_tax_years(&self) -> Result<Vec<NoIncomeTaxYear>, RepositoryError> {
        Ok(self.state()?.markers.values().cloned().collect())
    }

    async fn delete_no_income_tax_year(
        &self,
        year: i32,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state()?;
        let removed = state.markers.remove(&year).is_some();
        if removed {
            state.claimed_years.remove(&year);
        }
        Ok(removed)
    }
}

/// [`RepositoryFactory`] for the `"memory"` backend. The connection string
/// is ignored.
pub struct InMemoryRepositoryFactory;

#[async_trait]
impl RepositoryFactory for InMemoryRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn create(
        &self,
        _config: &DbConfig,
    ) -> Result<Box<dyn TaxRepository>, RepositoryError> {
        Ok(Box::new(InMemoryRepository::new()))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn rate(
        year: i32,
        status: FilingStatus,
        start: Decimal,
    ) -> TaxRate {
        TaxRate {
            year,
            status,
            rate: dec!(0.10),
            range_start: start,
            range_end: None,
        }
    }

    #[tokio::test]
    async fn save_year_rates_claims_year_once() {
        let repo = InMemoryRepository::new();
        let rows = vec![rate(2021, FilingStatus::Single, dec!(0))];

        repo.save_year_rates(2021, &rows).await.unwrap();
        let second = repo.save_year_rates(2021, &rows).await;

        assert!(matches!(second, Err(RepositoryError::Conflict(_))));
        assert_eq!(repo.rate_count(), 1);
    }

    #[tokio::test]
    async fn delete_by_year_releases_claim() {
        let repo = InMemoryRepository::new();
        let rows = vec![
            rate(2021, FilingStatus::Single, dec!(0)),
            rate(2021, FilingStatus::Single, dec!(9950)),
        ];
        repo.save_year_rates(2021, &rows).await.unwrap();

        assert_eq!(repo.delete_by_year(2021).await.unwrap(), 2);
        assert!(!repo.exists_by_year(2021).await.unwrap());
        repo.save_year_rates(2021, &rows).await.unwrap();
        assert_eq!(repo.rate_count(), 2);
    }

    #[tokio::test]
    async fn find_below_filters_and_orders() {
        let repo = InMemoryRepository::new();
        let rows = vec![
            rate(2021, FilingStatus::Single, dec!(40525)),
            rate(2021, FilingStatus::Single, dec!(0)),
            rate(2021, FilingStatus::Single, dec!(9950)),
            rate(2021, FilingStatus::MarriedFilingJointly, dec!(0)),
        ];
        repo.save_year_rates(2021, &rows).await.unwrap();

        let found = repo
            .find_by_year_and_status_below(2021, FilingStatus::Single, dec!(40525))
            .await
            .unwrap();

        let starts: Vec<Decimal> = found.iter().map(|r| r.range_start).collect();
        assert_eq!(starts, vec![dec!(0), dec!(9950)]);
    }

    #[tokio::test]
    async fn duplicate_marker_is_conflict() {
        let repo = InMemoryRepository::new();

        repo.save_no_income_tax_year(&NoIncomeTaxYear::new(1900)).await.unwrap();
        let second = repo.save_no_income_tax_year(&NoIncomeTaxYear::new(1900)).await;

        assert!(matches!(second, Err(RepositoryError::Conflict(_))));
        assert!(repo.delete_no_income_tax_year(1900).await.unwrap());
        assert!(!repo.exists_no_income_tax_year(1900).await.unwrap());
    }

    #[tokio::test]
    async fn marker_for_imported_year_is_conflict() {
        let repo = InMemoryRepository::new();
        repo.save_year_rates(1913, &[rate(1913, FilingStatus::Single, dec!(0))])
            .await
            .unwrap();

        let marker = repo.save_no_income_tax_year(&NoIncomeTaxYear::new(1913)).await;

        assert!(matches!(marker, Err(RepositoryError::Conflict(_))));
        assert!(!repo.exists_no_income_tax_year(1913).await.unwrap());
    }

    #[tokio::test]
    async fn rates_for_marked_year_are_conflict() {
        let repo = InMemoryRepository::new();
        repo.save_no_income_tax_year(&NoIncomeTaxYear::new(1900)).await.unwrap();

        let rates = repo
            .save_year_rates(1900, &[rate(1900, FilingStatus::Single, dec!(0))])
            .await;

        assert!(matches!(rates, Err(RepositoryError::Conflict(_))));
        assert_eq!(repo.rate_count(), 0);
    }

    #[tokio::test]
    async fn replace_year_rates_swaps_marker_for_rates() {
        let repo = InMemoryRepository::new();
        repo.save_no_income_tax_year(&NoIncomeTaxYear::new(1913)).await.unwrap();

        let replaced = repo
            .replace_year_rates(1913, &[rate(1913, FilingStatus::Single, dec!(0))])
            .await
            .unwrap();

        assert!(replaced);
        assert!(!repo.exists_no_income_tax_year(1913).await.unwrap());
        assert_eq!(repo.find_by_year(1913).await.unwrap().len(), 1);
        let again = repo.save_year_rates(1913, &[]).await;
        assert!(matches!(again, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn replace_of_empty_year_reports_nothing_replaced() {
        let repo = InMemoryRepository::new();

        let replaced = repo
            .replace_with_no_income_tax_year(&NoIncomeTaxYear::new(1900))
            .await
            .unwrap();

        assert!(!replaced);
        assert!(repo.exists_no_income_tax_year(1900).await.unwrap());
    }

    #[tokio::test]
    async fn list_rate_years_is_sorted_and_distinct() {
        let repo = InMemoryRepository::new();
        repo.save_rate(&rate(2020, FilingStatus::Single, dec!(0))).await.unwrap();
        repo.save_rate(&rate(2018, FilingStatus::Single, dec!(0))).await.unwrap();
        repo.save_rate(&rate(2020, FilingStatus::HeadOfHousehold, dec!(0))).await.unwrap();

        assert_eq!(repo.list_rate_years().await.unwrap(), vec![2018, 2020]);
    }
}
