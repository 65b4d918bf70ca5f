use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tax_data::ImportCoordinator;
use tax_db_sqlite::SqliteRepository;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Load the historical IRS marginal rate table into the database.
///
/// The CSV has one header line, then rows of: year, then rate / placeholder
/// / range start for MFJ, MFS, Single and HOH, then an optional note.
/// Years already in the database are skipped; a file holding a single year
/// replaces that year.
#[derive(Parser, Debug)]
#[command(name = "tax-data-loader")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the historical rate CSV file
    #[arg(short, long)]
    file: PathBuf,

    /// SQLite database URL or path; created if missing
    #[arg(short, long, env = "TAX_DB", default_value = "sqlite:historical_rates.db")]
    database: String,

    /// Skip running database migrations before loading
    #[arg(long, default_value_t = false)]
    skip_migrations: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::from("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let repo = SqliteRepository::new(&args.database)
        .await
        .with_context(|| format!("Failed to connect to database: {}", args.database))?;

    if !args.skip_migrations {
        repo.run_migrations()
            .await
            .context("Failed to run migrations")?;
        info!("migrations complete");
    }

    info!(file = %args.file.display(), "loading historical rates");
    let file = File::open(&args.file)
        .with_context(|| format!("Failed to open: {}", args.file.display()))?;

    let report = ImportCoordinator::new(&repo)
        .import_csv(file)
        .await
        .with_context(|| format!("Failed to import: {}", args.file.display()))?;

    println!(
        "Imported {} year(s), {} rate rows; {} no-income-tax year(s); skipped {:?}",
        report.imported_years.len(),
        report.rows_written,
        report.no_income_tax_years.len(),
        report.skipped_years
    );
    if let Some(year) = report.replaced_year {
        println!("Replaced existing data for {year}");
    }

    Ok(())
}
