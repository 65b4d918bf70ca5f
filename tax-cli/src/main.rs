use std::path::PathBuf;

use clap::Parser;
use tracing::debug;

use tax_cli::app::{self, Command};
use tax_cli::logging;
use tax_core::TaxService;
use tax_core::db::DbConfig;

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Historical US federal marginal income tax calculator.
///
/// Reads bracket tables loaded by `tax-data-loader` and answers questions
/// about them: tax owed on an income, bracket summaries, metric history and
/// bulk simulations.
#[derive(Debug, Parser)]
#[command(name = "marginal-tax", version, about)]
struct Cli {
    /// Database backend to use.
    #[arg(long, global = true, env = "TAX_DB_BACKEND", default_value = "sqlite")]
    backend: String,

    /// Database connection string.
    /// For SQLite this is a file path (e.g. `historical_rates.db`) or `:memory:`.
    #[arg(long, global = true, env = "TAX_DB", default_value = "historical_rates.db")]
    db: String,

    /// Also append log records to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging("info", cli.log_file.as_deref())?;

    let db_config = DbConfig {
        backend: cli.backend,
        connection_string: cli.db,
    };

    debug!("connecting to {} backend", db_config.backend);
    let registry = app::build_registry();
    let repo = registry.create(&db_config).await?;

    let service = TaxService::new(&*repo);
    let output = app::execute(&service, &cli.command).await?;
    print!("{output}");

    Ok(())
}
