//! Progressive (marginal) tax calculation over an ordered bracket table.
//!
//! Each bracket's rate applies only to the slice of income that falls
//! inside `[range_start, range_end)`:
//!
//! | Step | Value |
//! |------|-------|
//! | 1    | Keep brackets whose `range_start` is below the income |
//! | 2    | `effective_end = min(income, range_end)`, or the income for the open top bracket |
//! | 3    | `tax = (effective_end - range_start) * rate` |
//! | 4    | Total = sum of the per-bracket amounts |
//! | 5    | Average rate = total / income |
//!
//! Amounts stay exact: nothing is rounded here, so totals over long bracket
//! tables carry no cent-level drift. Round for display only.
//!
//! Zero-rate marker brackets (`range_end == range_start`) contribute nothing.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use tax_core::calculations::ProgressiveCalculator;
//! use tax_core::{FilingStatus, TaxRate};
//!
//! let brackets = vec![
//!     TaxRate {
//!         year: 2021,
//!         status: FilingStatus::Single,
//!         rate: dec!(0.10),
//!         range_start: dec!(0),
//!         range_end: Some(dec!(9950)),
//!     },
//!     TaxRate {
//!         year: 2021,
//!         status: FilingStatus::Single,
//!         rate: dec!(0.12),
//!         range_start: dec!(9950),
//!         range_end: Some(dec!(40525)),
//!     },
//!     TaxRate {
//!         year: 2021,
//!         status: FilingStatus::Single,
//!         rate: dec!(0.22),
//!         range_start: dec!(40525),
//!         range_end: None,
//!     },
//! ];
//!
//! let result = ProgressiveCalculator::new(&brackets)
//!     .calculate(dec!(50000.00))
//!     .unwrap();
//!
//! assert_eq!(result.total_tax_paid, dec!(6748.50));
//! assert_eq!(result.average_rate, dec!(0.13497));
//! ```

use rust_decimal::Decimal;
use thiserror::Error;

use crate::calculations::common::max;
use crate::models::{BracketTax, TaxBreakdown, TaxRate};

/// Errors that can occur during a progressive tax calculation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgressiveTaxError {
    /// Income must be strictly positive.
    #[error("income must be greater than 0, got {0}")]
    NonPositiveIncome(Decimal),
}

/// Applies a bracket table to an income.
///
/// The brackets should all belong to one (year, status) group. They do not
/// need to be pre-sorted.
#[derive(Debug, Clone)]
pub struct ProgressiveCalculator<'a> {
    brackets: &'a [TaxRate],
}

impl<'a> ProgressiveCalculator<'a> {
    pub fn new(brackets: &'a [TaxRate]) -> Self {
        Self { brackets }
    }

    /// Calculates per-bracket and total tax for `income`.
    ///
    /// An empty bracket table yields an empty breakdown with zero tax.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressiveTaxError::NonPositiveIncome`] if `income <= 0`.
    pub fn calculate(
        &self,
        income: Decimal,
    ) -> Result<TaxBreakdown, ProgressiveTaxError> {
        if income <= Decimal::ZERO {
            return Err(ProgressiveTaxError::NonPositiveIncome(income));
        }

        let brackets: Vec<BracketTax> = self
            .applicable_brackets(income)
            .into_iter()
            .map(|bracket| self.bracket_tax(bracket, income))
            .collect();

        let total_tax_paid = self.total_tax(&brackets);
        let average_rate = self.average_rate(total_tax_paid, income);

        Ok(TaxBreakdown {
            brackets,
            total_tax_paid,
            average_rate,
            message: None,
        })
    }

    /// Brackets that start below the income, in ascending order.
    fn applicable_brackets(
        &self,
        income: Decimal,
    ) -> Vec<&'a TaxRate> {
        let mut applicable: Vec<&TaxRate> = self
            .brackets
            .iter()
            .filter(|b| b.range_start < income)
            .collect();
        applicable.sort_by(|a, b| a.range_start.cmp(&b.range_start));
        applicable
    }

    /// End of the taxed slice: the ceiling, or the income if it stops inside.
    fn effective_end(
        &self,
        bracket: &TaxRate,
        income: Decimal,
    ) -> Decimal {
        match bracket.range_end {
            Some(end) => end.min(income),
            None => income,
        }
    }

    fn bracket_tax(
        &self,
        bracket: &TaxRate,
        income: Decimal,
    ) -> BracketTax {
        let range_end = self.effective_end(bracket, income);
        let taxable = max(range_end - bracket.range_start, Decimal::ZERO);

        BracketTax {
            year: bracket.year,
            status: bracket.status,
            range_start: bracket.range_start,
            range_end,
            rate: bracket.rate,
            tax_paid: taxable * bracket.rate,
        }
    }

    fn total_tax(
        &self,
        brackets: &[BracketTax],
    ) -> Decimal {
        brackets.iter().map(|b| b.tax_paid).sum()
    }

    fn average_rate(
        &self,
        total_tax: Decimal,
        income: Decimal,
    ) -> Decimal {
        (total_tax / income).normalize()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::FilingStatus;

    fn bracket(
        rate: Decimal,
        start: Decimal,
        end: Option<Decimal>,
    ) -> TaxRate {
        TaxRate {
            year: 2021,
            status: FilingStatus::Single,
            rate,
            range_start: start,
            range_end: end,
        }
    }

    fn brackets_2021_single() -> Vec<TaxRate> {
        vec![
            bracket(dec!(0.10), dec!(0), Some(dec!(9950))),
            bracket(dec!(0.12), dec!(9950), Some(dec!(40525))),
            bracket(dec!(0.22), dec!(40525), Some(dec!(86375))),
            bracket(dec!(0.24), dec!(86375), Some(dec!(164925))),
            bracket(dec!(0.32), dec!(164925), Some(dec!(209425))),
            bracket(dec!(0.35), dec!(209425), Some(dec!(523600))),
            bracket(dec!(0.37), dec!(523600), None),
        ]
    }

    // =========================================================================
    // calculate tests
    // =========================================================================

    #[test]
    fn calculate_matches_worked_example() {
        let brackets = vec![
            bracket(dec!(0.10), dec!(0), Some(dec!(9950))),
            bracket(dec!(0.12), dec!(9950), Some(dec!(40525))),
            bracket(dec!(0.22), dec!(40525), None),
        ];

        let result = ProgressiveCalculator::new(&brackets)
            .calculate(dec!(50000.00))
            .unwrap();

        let taxes: Vec<Decimal> = result.brackets.iter().map(|b| b.tax_paid).collect();
        assert_eq!(taxes, vec![dec!(995.00), dec!(3669.00), dec!(2084.50)]);
        assert_eq!(result.total_tax_paid, dec!(6748.50));
        assert_eq!(result.average_rate, dec!(0.13497));
        assert_eq!(result.message, None);
    }

    #[test]
    fn calculate_reports_effective_range_end() {
        let brackets = brackets_2021_single();

        let result = ProgressiveCalculator::new(&brackets)
            .calculate(dec!(50000))
            .unwrap();

        assert_eq!(result.brackets.len(), 3);
        assert_eq!(result.brackets[0].range_end, dec!(9950));
        assert_eq!(result.brackets[1].range_end, dec!(40525));
        assert_eq!(result.brackets[2].range_end, dec!(50000));
    }

    #[test]
    fn calculate_excludes_brackets_starting_at_income() {
        let brackets = brackets_2021_single();

        let result = ProgressiveCalculator::new(&brackets)
            .calculate(dec!(9950))
            .unwrap();

        assert_eq!(result.brackets.len(), 1);
        assert_eq!(result.total_tax_paid, dec!(995.00));
    }

    #[test]
    fn calculate_uses_open_top_bracket() {
        let brackets = brackets_2021_single();

        let result = ProgressiveCalculator::new(&brackets)
            .calculate(dec!(1000000))
            .unwrap();

        let top = result.brackets.last().unwrap();
        assert_eq!(top.range_start, dec!(523600));
        assert_eq!(top.range_end, dec!(1000000));
        assert_eq!(top.tax_paid, dec!(176268.00));
    }

    #[test]
    fn calculate_sorts_unordered_brackets() {
        let mut brackets = brackets_2021_single();
        brackets.reverse();

        let result = ProgressiveCalculator::new(&brackets)
            .calculate(dec!(50000.00))
            .unwrap();

        assert_eq!(result.brackets[0].range_start, dec!(0));
        assert_eq!(result.total_tax_paid, dec!(6748.50));
    }

    #[test]
    fn calculate_zero_rate_marker_contributes_nothing() {
        let brackets = vec![
            bracket(dec!(0), dec!(0), Some(dec!(0))),
            bracket(dec!(0.01), dec!(0), Some(dec!(20000))),
            bracket(dec!(0.02), dec!(20000), None),
        ];

        let result = ProgressiveCalculator::new(&brackets)
            .calculate(dec!(30000))
            .unwrap();

        assert_eq!(result.brackets[0].tax_paid, dec!(0));
        assert_eq!(result.total_tax_paid, dec!(400.00));
    }

    #[test]
    fn calculate_keeps_sub_cent_amounts() {
        let brackets = brackets_2021_single();

        let result = ProgressiveCalculator::new(&brackets)
            .calculate(dec!(12345.67))
            .unwrap();

        // 2395.67 * 0.12
        assert_eq!(result.brackets[1].tax_paid, dec!(287.4804));
        assert_eq!(result.total_tax_paid, dec!(1282.4804));
    }

    #[test]
    fn calculate_long_table_total_is_exact() {
        // 30 brackets, each 100.5 wide, at 1% through 30%.
        let width = dec!(100.5);
        let brackets: Vec<TaxRate> = (0..30u32)
            .map(|i| {
                let start = width * Decimal::from(i);
                let end = if i == 29 { None } else { Some(start + width) };
                bracket(Decimal::new(i64::from(i) + 1, 2), start, end)
            })
            .collect();
        let income = width * Decimal::from(29) + dec!(50.25);

        let result = ProgressiveCalculator::new(&brackets)
            .calculate(income)
            .unwrap();

        let exact: Decimal = (0..29u32)
            .map(|i| width * Decimal::new(i64::from(i) + 1, 2))
            .sum::<Decimal>()
            + dec!(50.25) * dec!(0.30);
        assert_eq!(result.brackets.len(), 30);
        assert_eq!(result.total_tax_paid, exact);
        assert_eq!(result.total_tax_paid, dec!(452.25));
        assert_eq!(result.average_rate, (exact / income).normalize());
    }

    #[test]
    fn calculate_empty_brackets_yields_zero() {
        let result = ProgressiveCalculator::new(&[]).calculate(dec!(50000)).unwrap();

        assert_eq!(result, TaxBreakdown::empty());
    }

    #[test]
    fn calculate_rejects_zero_income() {
        let brackets = brackets_2021_single();

        let result = ProgressiveCalculator::new(&brackets).calculate(dec!(0));

        assert_eq!(result, Err(ProgressiveTaxError::NonPositiveIncome(dec!(0))));
    }

    #[test]
    fn calculate_rejects_negative_income() {
        let brackets = brackets_2021_single();

        let result = ProgressiveCalculator::new(&brackets).calculate(dec!(-1));

        assert!(matches!(result, Err(ProgressiveTaxError::NonPositiveIncome(_))));
    }

    // =========================================================================
    // property tests
    // =========================================================================

    #[test]
    fn per_bracket_sum_equals_total() {
        let brackets = brackets_2021_single();
        let calculator = ProgressiveCalculator::new(&brackets);

        for income in [dec!(1), dec!(9950.01), dec!(77777.77), dec!(250000.33), dec!(987654.32)] {
            let result = calculator.calculate(income).unwrap();
            let sum: Decimal = result.brackets.iter().map(|b| b.tax_paid).sum();
            assert_eq!(sum, result.total_tax_paid, "income {income}");
        }
    }

    #[test]
    fn total_is_monotonic_in_income() {
        let brackets = brackets_2021_single();
        let calculator = ProgressiveCalculator::new(&brackets);

        let mut previous = Decimal::ZERO;
        let mut income = dec!(0.50);
        while income < dec!(700000) {
            let total = calculator.calculate(income).unwrap().total_tax_paid;
            assert!(total >= previous, "tax decreased at income {income}");
            previous = total;
            income += dec!(1234.57);
        }
    }
}
