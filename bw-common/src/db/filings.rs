//! Filing persistence
//!
//! Upsert-by-accession-number and newest-first listing over a single table.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use super::retry::{retry_on_lock, DEFAULT_MAX_LOCK_WAIT_MS};
use crate::config::is_valid_identifier;
use crate::models::CanonicalFiling;
use crate::{Error, Result};

/// Persistence contract used by the ingestion pipeline and the query API
#[async_trait]
pub trait FilingStore: Send + Sync {
    /// Insert, or overwrite every field of the row with the same accession number
    async fn upsert(&self, filing: &CanonicalFiling) -> Result<()>;

    /// Most recent filings by `filed_at`, newest first
    async fn list(&self, limit: u32) -> Result<Vec<CanonicalFiling>>;

    async fn get(&self, accession_number: &str) -> Result<Option<CanonicalFiling>>;

    async fn count(&self) -> Result<u64>;
}

/// SQLite-backed filing collection
#[derive(Clone)]
pub struct FilingRepository {
    pool: SqlitePool,
    table: String,
    max_lock_wait_ms: u64,
}

impl FilingRepository {
    /// Wrap `pool`, storing filings in `table`.
    ///
    /// The table name is interpolated into SQL, so it must be a plain identifier.
    pub fn new(pool: SqlitePool, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        if !is_valid_identifier(&table) {
            return Err(Error::InvalidInput(format!(
                "Invalid collection name: {:?}",
                table
            )));
        }
        Ok(Self {
            pool,
            table,
            max_lock_wait_ms: DEFAULT_MAX_LOCK_WAIT_MS,
        })
    }

    /// Open a repository and create its table if missing
    pub async fn open(pool: SqlitePool, table: impl Into<String>) -> Result<Self> {
        let repo = Self::new(pool, table)?;
        repo.ensure_schema().await?;
        Ok(repo)
    }

    /// Retry budget for writes that hit a locked database
    pub fn with_max_lock_wait_ms(mut self, max_lock_wait_ms: u64) -> Self {
        self.max_lock_wait_ms = max_lock_wait_ms;
        self
    }

    /// Create the collection table and its `filed_at` index (idempotent)
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                accession_number TEXT PRIMARY KEY,
                form_type TEXT NOT NULL,
                filed_at TEXT NOT NULL,
                ticker TEXT,
                cik TEXT NOT NULL,
                company_name TEXT NOT NULL,
                filing_link TEXT NOT NULL,
                summary TEXT,
                imported_at TEXT NOT NULL
            )
            "#,
            table = self.table
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_filed_at ON {table} (filed_at DESC)",
            table = self.table
        ))
        .execute(&self.pool)
        .await?;

        tracing::info!(table = %self.table, "Filing table initialized");
        Ok(())
    }
}

#[async_trait]
impl FilingStore for FilingRepository {
    async fn upsert(&self, filing: &CanonicalFiling) -> Result<()> {
        let sql = format!(
            r#"
            INSERT INTO {table} (
                accession_number, form_type, filed_at, ticker, cik,
                company_name, filing_link, summary, imported_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(accession_number) DO UPDATE SET
                form_type = excluded.form_type,
                filed_at = excluded.filed_at,
                ticker = excluded.ticker,
                cik = excluded.cik,
                company_name = excluded.company_name,
                filing_link = excluded.filing_link,
                summary = excluded.summary,
                imported_at = excluded.imported_at
            "#,
            table = self.table
        );
        let filed_at = format_timestamp(&filing.filed_at);
        let imported_at = format_timestamp(&filing.imported_at);

        retry_on_lock("upsert_filing", self.max_lock_wait_ms, || async {
            sqlx::query(&sql)
                .bind(&filing.accession_number)
                .bind(&filing.form_type)
                .bind(&filed_at)
                .bind(&filing.ticker)
                .bind(&filing.cik)
                .bind(&filing.company_name)
                .bind(&filing.filing_link)
                .bind(&filing.summary)
                .bind(&imported_at)
                .execute(&self.pool)
                .await?;
            Ok::<(), Error>(())
        })
        .await
    }

    async fn list(&self, limit: u32) -> Result<Vec<CanonicalFiling>> {
        let rows = sqlx::query(&format!(
            "SELECT * FROM {table} ORDER BY filed_at DESC, accession_number DESC LIMIT ?",
            table = self.table
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_filing).collect()
    }

    async fn get(&self, accession_number: &str) -> Result<Option<CanonicalFiling>> {
        let row = sqlx::query(&format!(
            "SELECT * FROM {table} WHERE accession_number = ?",
            table = self.table
        ))
        .bind(accession_number)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_filing).transpose()
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", self.table))
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}

/// Fixed-width UTC form so text ordering matches time ordering
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
}

fn row_to_filing(row: &SqliteRow) -> Result<CanonicalFiling> {
    let filed_at: String = row.try_get("filed_at")?;
    let imported_at: String = row.try_get("imported_at")?;

    Ok(CanonicalFiling {
        accession_number: row.try_get("accession_number")?,
        form_type: row.try_get("form_type")?,
        filed_at: parse_timestamp("filed_at", &filed_at)?,
        ticker: row.try_get("ticker")?,
        cik: row.try_get("cik")?,
        company_name: row.try_get("company_name")?,
        filing_link: row.try_get("filing_link")?,
        summary: row.try_get("summary")?,
        imported_at: parse_timestamp("imported_at", &imported_at)?,
    })
}
