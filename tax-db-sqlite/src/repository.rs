use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::Row;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use tax_core::db::{NoIncomeTaxYearRepository, TaxRateRepository};
use tax_core::{FilingStatus, NoIncomeTaxYear, RepositoryError, TaxRate};
use tracing::debug;

use crate::decimal::{decimal_to_text, get_decimal, get_optional_decimal};

const RATE_COLUMNS: &str = "year, status, rate, range_start, range_end";

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Connects to `database_url`, creating the database file if missing.
    ///
    /// Accepts sqlx URLs (`sqlite:rates.db`), bare paths and `:memory:`.
    pub async fn new(database_url: &str) -> Result<Self, RepositoryError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| {
                RepositoryError::Configuration(format!(
                    "invalid SQLite URL '{}': {}",
                    database_url, e
                ))
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| RepositoryError::Connection(e.to_string()))?;
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<(), RepositoryError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn fetch_rates(
        &self,
        sql: &str,
        binds: RateFilter,
    ) -> Result<Vec<TaxRate>, RepositoryError> {
        let mut query = sqlx::query(sql);
        if let Some(year) = binds.year {
            query = query.bind(year);
        }
        if let Some(status) = binds.status {
            query = query.bind(status.as_str());
        }

        let rows = query.fetch_all(&self.pool).await.map_err(db_error)?;
        rows.iter().map(row_to_tax_rate).collect()
    }
}

#[derive(Default)]
struct RateFilter {
    year: Option<i32>,
    status: Option<FilingStatus>,
}

/// Unique-key violations become [`RepositoryError::Conflict`].
fn db_error(err: sqlx::Error) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::Conflict(db.message().to_string())
        }
        _ => RepositoryError::Database(err.to_string()),
    }
}

fn row_to_tax_rate(row: &SqliteRow) -> Result<TaxRate, RepositoryError> {
    let status_code: String = row
        .try_get("status")
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
    let status = FilingStatus::parse(&status_code).ok_or_else(|| {
        RepositoryError::Database(format!("Invalid status code: {}", status_code))
    })?;

    Ok(TaxRate {
        year: row
            .try_get("year")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
        status,
        rate: get_decimal(row, "rate")?,
        range_start: get_decimal(row, "range_start")?,
        range_end: get_optional_decimal(row, "range_end")?,
    })
}

/// Decimals are stored as TEXT, so ordering happens here rather than in SQL.
fn sort_by_status_and_start(rates: &mut [TaxRate]) {
    rates.sort_by(|a, b| (a.status, a.range_start).cmp(&(b.status, b.range_start)));
}

async fn insert_rate<'e, E>(
    executor: E,
    rate: &TaxRate,
) -> Result<(), RepositoryError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        "INSERT INTO historical_tax_rates (year, status, rate, range_start, range_end)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(rate.year)
    .bind(rate.status.as_str())
    .bind(decimal_to_text(rate.rate))
    .bind(decimal_to_text(rate.range_start))
    .bind(rate.range_end.map(decimal_to_text))
    .execute(executor)
    .await
    .map_err(db_error)?;
    Ok(())
}

/// Inserts the year's `imported_year` row; an existing claim is a conflict.
async fn claim_year(
    conn: &mut SqliteConnection,
    year: i32,
) -> Result<(), RepositoryError> {
    sqlx::query("INSERT INTO imported_year (year) VALUES (?)")
        .bind(year)
        .execute(conn)
        .await
        .map_err(|e| match db_error(e) {
            RepositoryError::Conflict(_) => {
                RepositoryError::Conflict(format!("tax rates for {year} already imported"))
            }
            other => other,
        })?;
    Ok(())
}

/// Deletes the year's rates, marker and claim. True if rates or a marker
/// were present.
async fn clear_year(
    conn: &mut SqliteConnection,
    year: i32,
) -> Result<bool, RepositoryError> {
    let rates = sqlx::query("DELETE FROM historical_tax_rates WHERE year = ?")
        .bind(year)
        .execute(&mut *conn)
        .await
        .map_err(db_error)?
        .rows_affected();
    let markers = sqlx::query("DELETE FROM no_income_tax_year WHERE year = ?")
        .bind(year)
        .execute(&mut *conn)
        .await
        .map_err(db_error)?
        .rows_affected();
    sqlx::query("DELETE FROM imported_year WHERE year = ?")
        .bind(year)
        .execute(&mut *conn)
        .await
        .map_err(db_error)?;
    Ok(rates > 0 || markers > 0)
}

async fn insert_marker(
    conn: &mut SqliteConnection,
    marker: &NoIncomeTaxYear,
) -> Result<(), RepositoryError> {
    sqlx::query("INSERT INTO no_income_tax_year (year, message) VALUES (?, ?)")
        .bind(marker.year)
        .bind(&marker.message)
        .execute(conn)
        .await
        .map_err(db_error)?;
    Ok(())
}

#[async_trait]
impl TaxRateRepository for SqliteRepository {
    async fn save_rate(
        &self,
        rate: &TaxRate,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        sqlx::query("INSERT OR IGNORE INTO imported_year (year) VALUES (?)")
            .bind(rate.year)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        insert_rate(&mut *tx, rate).await?;
        tx.commit().await.map_err(db_error)
    }

    async fn save_year_rates(
        &self,
        year: i32,
        rates: &[TaxRate],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        claim_year(&mut tx, year).await?;
        for rate in rates {
            insert_rate(&mut *tx, rate).await?;
        }
        tx.commit().await.map_err(db_error)?;
        debug!(year, rows = rates.len(), "saved year rates");
        Ok(())
    }

    async fn replace_year_rates(
        &self,
        year: i32,
        rates: &[TaxRate],
    ) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let replaced = clear_year(&mut tx, year).await?;
        claim_year(&mut tx, year).await?;
        for rate in rates {
            insert_rate(&mut *tx, rate).await?;
        }
        tx.commit().await.map_err(db_error)?;
        debug!(year, rows = rates.len(), replaced, "replaced year rates");
        Ok(replaced)
    }

    async fn find_by_year(
        &self,
        year: i32,
    ) -> Result<Vec<TaxRate>, RepositoryError> {
        let sql = format!("SELECT {RATE_COLUMNS} FROM historical_tax_rates WHERE year = ?");
        let mut rates = self
            .fetch_rates(
                &sql,
                RateFilter {
                    year: Some(year),
                    ..Default::default()
                },
            )
            .await?;
        sort_by_status_and_start(&mut rates);
        Ok(rates)
    }

    async fn find_by_year_and_status(
        &self,
        year: i32,
        status: FilingStatus,
    ) -> Result<Vec<TaxRate>, RepositoryError> {
        let sql = format!(
            "SELECT {RATE_COLUMNS} FROM historical_tax_rates WHERE year = ? AND status = ?"
        );
        let mut rates = self
            .fetch_rates(
                &sql,
                RateFilter {
                    year: Some(year),
                    status: Some(status),
                },
            )
            .await?;
        sort_by_status_and_start(&mut rates);
        Ok(rates)
    }

    async fn find_by_year_and_status_below(
        &self,
        year: i32,
        status: FilingStatus,
        income: Decimal,
    ) -> Result<Vec<TaxRate>, RepositoryError> {
        let mut rates = self.find_by_year_and_status(year, status).await?;
        rates.retain(|rate| rate.range_start < income);
        Ok(rates)
    }

    async fn exists_by_year(
        &self,
        year: i32,
    ) -> Result<bool, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM historical_tax_rates WHERE year = ?")
                .bind(year)
                .fetch_one(&self.pool)
                .await
                .map_err(db_error)?;
        Ok(count > 0)
    }

    async fn delete_by_year(
        &self,
        year: i32,
    ) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let removed = sqlx::query("DELETE FROM historical_tax_rates WHERE year = ?")
            .bind(year)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?
            .rows_affected();
        sqlx::query("DELETE FROM imported_year WHERE year = ?")
            .bind(year)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        tx.commit().await.map_err(db_error)?;
        Ok(removed)
    }

    async fn find_by_status(
        &self,
        status: FilingStatus,
    ) -> Result<Vec<TaxRate>, RepositoryError> {
        let sql = format!("SELECT {RATE_COLUMNS} FROM historical_tax_rates WHERE status = ?");
        let mut rates = self
            .fetch_rates(
                &sql,
                RateFilter {
                    status: Some(status),
                    ..Default::default()
                },
            )
            .await?;
        rates.sort_by(|a, b| (a.year, a.range_start).cmp(&(b.year, b.range_start)));
        Ok(rates)
    }

    async fn list_rate_years(&self) -> Result<Vec<i32>, RepositoryError> {
        let rows = sqlx::query("SELECT DISTINCT year FROM historical_tax_rates ORDER BY year")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        rows.iter()
            .map(|row| {
                row.try_get("year")
                    .map_err(|e| RepositoryError::Database(e.to_string()))
            })
            .collect()
    }
}

fn row_to_marker(row: &SqliteRow) -> Result<NoIncomeTaxYear, RepositoryError> {
    Ok(NoIncomeTaxYear {
        year: row
            .try_get("year")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
        message: row
            .try_get("message")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
    })
}

#[async_trait]
impl NoIncomeTaxYearRepository for SqliteRepository {
    async fn save_no_income_tax_year(
        &self,
        marker: &NoIncomeTaxYear,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        insert_marker(&mut tx, marker).await?;
        claim_year(&mut tx, marker.year).await?;
        tx.commit().await.map_err(db_error)
    }

    async fn replace_with_no_income_tax_year(
        &self,
        marker: &NoIncomeTaxYear,
    ) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let replaced = clear_year(&mut tx, marker.year).await?;
        insert_marker(&mut tx, marker).await?;
        claim_year(&mut tx, marker.year).await?;
        tx.commit().await.map_err(db_error)?;
        debug!(year = marker.year, replaced, "replaced year with no-income-tax marker");
        Ok(replaced)
    }

    async fn exists_no_income_tax_year(
        &self,
        year: i32,
    ) -> Result<bool, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM no_income_tax_year WHERE year = ?")
            .bind(year)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(count > 0)
    }

    async fn find_no_income_tax_year(
        &self,
        year: i32,
    ) -> Result<Option<NoIncomeTaxYear>, RepositoryError> {
        sqlx::query("SELECT year, message FROM no_income_tax_year WHERE year = ?")
            .bind(year)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .as_ref()
            .map(row_to_marker)
            .transpose()
    }

    async fn list_no_income_tax_years(&self) -> Result<Vec<NoIncomeTaxYear>, RepositoryError> {
        let rows = sqlx::query("SELECT year, message FROM no_income_tax_year ORDER BY year")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        rows.iter().map(row_to_marker).collect()
    }

    async fn delete_no_income_tax_year(
        &self,
        year: i32,
    ) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let removed = sqlx::query("DELETE FROM no_income_tax_year WHERE year = ?")
            .bind(year)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?
            .rows_affected()
            > 0;
        if removed {
            sqlx::query("DELETE FROM imported_year WHERE year = ?")
                .bind(year)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
        }
        tx.commit().await.map_err(db_error)?;
        Ok(removed)
    }
}
