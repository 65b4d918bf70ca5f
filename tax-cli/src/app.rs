use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use tax_core::db::{InMemoryRepositoryFactory, RepositoryRegistry};
use tax_core::{FilingStatus, TaxInput, TaxRepository, TaxService};
use tax_db_sqlite::SqliteRepositoryFactory;
use tracing::{debug, info};

use crate::{bulk_loader, render};

/// Build the registry with every backend this binary knows about.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry.register(Box::new(InMemoryRepositoryFactory));
    registry
}

/// `clap` value parser for filing-status codes (`S`, `HH`/`HOH`, `MFJ`, `MFS`).
pub fn parse_filing_status(s: &str) -> Result<FilingStatus, String> {
    FilingStatus::parse(s)
        .ok_or_else(|| format!("unknown filing status '{s}' (expected S, HH, MFJ or MFS)"))
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Tax owed on an income, bracket by bracket
    Calculate {
        #[arg(long)]
        year: i32,
        #[arg(long, value_parser = parse_filing_status)]
        status: FilingStatus,
        /// Income, e.g. `50000` or `"$50,000.00"`
        #[arg(long)]
        income: String,
    },
    /// Bracket count, thresholds and average rate for one year
    Summary {
        #[arg(long)]
        year: i32,
        #[arg(long, value_parser = parse_filing_status)]
        status: FilingStatus,
    },
    /// One metric per year across a span of years
    History {
        #[arg(long, value_parser = parse_filing_status)]
        status: FilingStatus,
        /// TOP_RATE, MIN_RATE, AVERAGE_RATE or BRACKET_COUNT
        #[arg(long, default_value = "TOP_RATE")]
        metric: String,
        #[arg(long)]
        start: i32,
        #[arg(long)]
        end: i32,
    },
    /// Stored rate rows for a year
    Rates {
        #[arg(long)]
        year: i32,
        #[arg(long, value_parser = parse_filing_status)]
        status: Option<FilingStatus>,
    },
    /// Every year with data
    Years,
    /// Filing-status codes and labels
    Statuses,
    /// Calculate every row of a `year,status,income` CSV file
    Simulate {
        #[arg(long)]
        file: PathBuf,
    },
}

/// Run `command` against `service` and return the text to print.
pub async fn execute<R: TaxRepository + ?Sized>(
    service: &TaxService<'_, R>,
    command: &Command,
) -> Result<String> {
    debug!(?command, "executing");
    let output = match command {
        Command::Calculate {
            year,
            status,
            income,
        } => {
            let input = TaxInput::parse(*year, Some(*status), income)?;
            let breakdown = service.calculate_tax_breakdown(&input).await?;
            render::render_breakdown(&input, &breakdown)
        }
        Command::Summary { year, status } => {
            render::render_summary(&service.get_summary(*year, *status).await?)
        }
        Command::History {
            status,
            metric,
            start,
            end,
        } => {
            let points = service.get_history(*status, metric, *start, *end).await?;
            render::render_history(&points)
        }
        Command::Rates { year, status } => {
            render::render_rates(&service.get_rates(*year, *status).await?)
        }
        Command::Years => render::render_years(&service.list_years().await?),
        Command::Statuses => render::render_statuses(service.filing_statuses()),
        Command::Simulate { file } => {
            let inputs = bulk_loader::load_from_file(file)
                .with_context(|| format!("failed to load {}", file.display()))?;
            info!(rows = inputs.len(), "simulating");
            let breakdowns = service.simulate_bulk(&inputs).await?;
            render::render_bulk(&inputs, &breakdowns)
        }
    };
    Ok(output)
}
