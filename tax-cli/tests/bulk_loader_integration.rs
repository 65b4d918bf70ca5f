use std::path::PathBuf;

use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use tax_cli::app::{Command, execute};
use tax_cli::bulk_loader::{BulkLoadError, load_from_file};
use tax_core::db::{InMemoryRepository, NoIncomeTaxYearRepository, TaxRateRepository};
use tax_core::{FilingStatus, NoIncomeTaxYear, TaxInput, TaxRate, TaxService, YearRange};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn flat_rate(
    status: FilingStatus,
    rate: rust_decimal::Decimal,
) -> TaxRate {
    TaxRate {
        year: 2021,
        status,
        rate,
        range_start: dec!(0),
        range_end: None,
    }
}

#[test]
fn test_load_sample_inputs() {
    let inputs = load_from_file(&fixture("sample_inputs.csv")).expect("fixture should load");

    assert_eq!(
        inputs,
        vec![
            TaxInput::new(2021, FilingStatus::Single, dec!(50000.00)),
            TaxInput::new(2021, FilingStatus::MarriedFilingJointly, dec!(120000)),
            TaxInput::new(1900, FilingStatus::HeadOfHousehold, dec!(25000)),
        ]
    );
}

#[test]
fn test_missing_file_is_io_error() {
    let err = load_from_file(&fixture("does_not_exist.csv")).unwrap_err();

    assert!(matches!(err, BulkLoadError::Io { .. }));
}

#[tokio::test]
async fn test_simulate_sample_inputs() {
    let repo = InMemoryRepository::new();
    repo.save_year_rates(
        2021,
        &[
            flat_rate(FilingStatus::Single, dec!(0.10)),
            flat_rate(FilingStatus::MarriedFilingJointly, dec!(0.20)),
        ],
    )
    .await
    .unwrap();
    repo.save_no_income_tax_year(&NoIncomeTaxYear::new(1900))
        .await
        .unwrap();
    let service = TaxService::with_year_range(&repo, YearRange::new(1862, 2023));

    let text = execute(
        &service,
        &Command::Simulate {
            file: fixture("sample_inputs.csv"),
        },
    )
    .await
    .expect("simulation should succeed");

    assert!(text.contains("Total tax:    $5,000.00"), "{text}");
    assert!(text.contains("Total tax:    $24,000.00"), "{text}");
    assert!(text.contains("1900 Head of Household on $25,000.00\nNo income tax"), "{text}");
}
