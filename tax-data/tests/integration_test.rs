//! Integration tests for historical rate imports against the SQLite backend.

use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::sqlite::SqlitePoolOptions;
use tax_core::db::{NoIncomeTaxYearRepository, TaxRateRepository};
use tax_core::{FilingStatus, TaxInput, TaxService, YearRange};
use tax_data::{CsvNormalizer, ImportCoordinator, ImportError, NormalizeError};
use tax_db_sqlite::SqliteRepository;

const SAMPLE_CSV: &str = include_str!("../test-data/historical_rates_sample.csv");

async fn setup_test_db() -> SqliteRepository {
    let pool = SqlitePoolOptions::new()
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    let repo = SqliteRepository::new_with_pool(pool).await;
    repo.run_migrations()
        .await
        .expect("Failed to run migrations");
    repo
}

async fn loaded_db() -> SqliteRepository {
    let repo = setup_test_db().await;
    ImportCoordinator::new(&repo)
        .import_csv(SAMPLE_CSV.as_bytes())
        .await
        .expect("Failed to import sample");
    repo
}

#[test]
fn test_sample_normalizes_every_row() {
    let entries = CsvNormalizer::normalize(SAMPLE_CSV.as_bytes()).expect("Failed to parse CSV");

    // 1900: 4, 1913: 8, 1940: 4, 2020: 28, 2021: 28
    assert_eq!(entries.len(), 72);
    assert_eq!(entries[0].year, 1900);
    assert_eq!(entries.last().map(|e| e.year), Some(2021));
}

#[tokio::test]
async fn test_import_sample_report() {
    let repo = setup_test_db().await;

    let report = ImportCoordinator::new(&repo)
        .import_csv(SAMPLE_CSV.as_bytes())
        .await
        .expect("Failed to import sample");

    assert_eq!(report.imported_years, vec![1913, 1940, 2020, 2021]);
    assert_eq!(report.no_income_tax_years, vec![1900]);
    assert!(report.skipped_years.is_empty());
    assert_eq!(report.replaced_year, None);
    assert_eq!(report.rows_written, 68);
}

#[tokio::test]
async fn test_reimport_is_a_no_op() {
    let repo = loaded_db().await;
    let before = repo.find_by_year(2021).await.unwrap();

    let report = ImportCoordinator::new(&repo)
        .import_csv(SAMPLE_CSV.as_bytes())
        .await
        .expect("Failed to re-import sample");

    assert_eq!(report.skipped_years, vec![1900, 1913, 1940, 2020, 2021]);
    assert_eq!(report.rows_written, 0);
    assert_eq!(repo.find_by_year(2021).await.unwrap(), before);
}

#[tokio::test]
async fn test_imported_ranges_are_contiguous() {
    let repo = loaded_db().await;

    let single = repo
        .find_by_year_and_status(2021, FilingStatus::Single)
        .await
        .unwrap();

    assert_eq!(single.len(), 7);
    for pair in single.windows(2) {
        assert_eq!(pair[0].range_end, Some(pair[1].range_start));
    }
    assert_eq!(single[6].range_start, dec!(523600));
    assert_eq!(single[6].range_end, None);
    assert_eq!(single[6].rate, dec!(0.37));
}

#[tokio::test]
async fn test_no_income_tax_year_has_marker_only() {
    let repo = loaded_db().await;

    assert!(repo.exists_no_income_tax_year(1900).await.unwrap());
    assert!(!repo.exists_by_year(1900).await.unwrap());
}

#[tokio::test]
async fn test_single_year_file_replaces_year() {
    let repo = loaded_db().await;
    let correction = "\
Year,MFJ Rate,,MFJ Bracket,MFS Rate,,MFS Bracket,Single Rate,,Single Bracket,HOH Rate,,HOH Bracket,Notes
2020,10%,>,$0,10%,>,$0,10%,>,$0,10%,>,$0,
2020,15%,>,\"$20,000\",15%,>,\"$10,000\",15%,>,\"$10,000\",15%,>,\"$15,000\",
";

    let report = ImportCoordinator::new(&repo)
        .import_csv(correction.as_bytes())
        .await
        .expect("Failed to import correction");

    assert_eq!(report.replaced_year, Some(2020));
    assert_eq!(report.imported_years, vec![2020]);
    assert_eq!(repo.find_by_year(2020).await.unwrap().len(), 8);
    assert_eq!(repo.find_by_year(2021).await.unwrap().len(), 28);
}

#[tokio::test]
async fn test_malformed_file_writes_nothing() {
    let repo = setup_test_db().await;
    let csv = "Year,MFJ Rate\n2021,10%,>,$0\n";

    let err = ImportCoordinator::new(&repo)
        .import_csv(csv.as_bytes())
        .await
        .expect_err("short row should fail");

    assert!(matches!(
        err,
        ImportError::Normalize(NormalizeError::MalformedRow { row: 1, .. })
    ));
    assert!(repo.list_rate_years().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_service_over_imported_data() {
    let repo = loaded_db().await;
    let service = TaxService::with_year_range(&repo, YearRange::new(1862, 2024));

    let breakdown = service
        .calculate_tax_breakdown(&TaxInput::new(2021, FilingStatus::Single, dec!(50000.00)))
        .await
        .unwrap();
    assert_eq!(breakdown.total_tax_paid, dec!(6748.50));
    assert_eq!(breakdown.average_rate, dec!(0.13497));

    let no_tax = service
        .calculate_tax_breakdown(&TaxInput::new(1900, FilingStatus::Single, dec!(50000.00)))
        .await
        .unwrap();
    assert!(no_tax.brackets.is_empty());
    assert_eq!(no_tax.total_tax_paid, Decimal::ZERO);
    assert!(no_tax.message.is_some());

    assert_eq!(
        service.list_years().await.unwrap(),
        vec![1900, 1913, 1940, 2020, 2021]
    );
}
