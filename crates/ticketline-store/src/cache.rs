//! DuckDB summary cache keyed by (customer, product, content fingerprint).

use std::path::Path;

use chrono::{NaiveDateTime, Utc};
use duckdb::{Connection, params};
use ticketline_core::{ContentFingerprint, Product, StructuredSummary};
use tracing::{debug, info};

use crate::StoreError;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS summaries (
    customer_number VARCHAR NOT NULL,
    product         VARCHAR NOT NULL,
    content_hash    VARCHAR NOT NULL,
    llm_response    VARCHAR NOT NULL,
    created_at      TIMESTAMP NOT NULL,
    PRIMARY KEY (customer_number, product, content_hash)
)";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Cache of generated summaries.
///
/// One row per (customer, product, content fingerprint). Writing an existing
/// key replaces the summary and refreshes `created_at`; there is no history.
/// Only successful model outcomes should be stored: an error fallback cached
/// here would be served to every later run over the same content.
///
/// Use [`open`](Self::open) for an ephemeral in-memory cache and
/// [`open_persistent`](Self::open_persistent) for a file that survives
/// process restarts.
pub struct SummaryCache {
    conn: Connection,
}

impl SummaryCache {
    /// Open an in-memory cache.
    pub fn open() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Open or create a cache file at `path`.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let cache = Self::init(Connection::open(path)?)?;
        info!(path = %path.display(), entries = cache.len()?, "opened summary cache");
        Ok(cache)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(CREATE_TABLE)?;
        Ok(Self { conn })
    }

    /// Fetch the cached summary for a cohort, or `None` on a miss.
    pub fn lookup(
        &self,
        customer: &str,
        product: Product,
        fingerprint: &ContentFingerprint,
    ) -> Result<Option<StructuredSummary>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT llm_response FROM summaries
             WHERE customer_number = ? AND product = ? AND content_hash = ?",
        )?;
        let mut rows = stmt.query(params![customer, product.as_str(), fingerprint.as_str()])?;
        let Some(row) = rows.next()? else {
            debug!(customer, %product, "summary cache miss");
            return Ok(None);
        };
        let payload: String = row.get(0)?;
        let summary =
            serde_json::from_str(&payload).map_err(|source| StoreError::Corrupt {
                customer: customer.to_string(),
                product: product.to_string(),
                source,
            })?;
        Ok(Some(summary))
    }

    /// Insert or replace the summary for a cohort.
    pub fn store(
        &self,
        customer: &str,
        product: Product,
        fingerprint: &ContentFingerprint,
        summary: &StructuredSummary,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_string(summary)?;
        let now = Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string();
        self.conn.execute(
            "INSERT OR REPLACE INTO summaries
                (customer_number, product, content_hash, llm_response, created_at)
             VALUES (?, ?, ?, ?, CAST(? AS TIMESTAMP))",
            params![customer, product.as_str(), fingerprint.as_str(), payload, now],
        )?;
        debug!(customer, %product, fingerprint = %fingerprint, "stored summary");
        Ok(())
    }

    /// When the entry for a key was last written.
    pub fn created_at(
        &self,
        customer: &str,
        product: Product,
        fingerprint: &ContentFingerprint,
    ) -> Result<Option<NaiveDateTime>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT CAST(created_at AS VARCHAR) FROM summaries
             WHERE customer_number = ? AND product = ? AND content_hash = ?",
        )?;
        let mut rows = stmt.query(params![customer, product.as_str(), fingerprint.as_str()])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let raw: String = row.get(0)?;
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S"))
            .map(Some)
            .map_err(|e| StoreError::Other(format!("bad created_at {raw:?}: {e}")))
    }

    /// Number of cached summaries.
    pub fn len(&self) -> Result<usize, StoreError> {
        let count: i64 =
            self.conn
                .query_row("SELECT count(*)::BIGINT FROM summaries", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}
