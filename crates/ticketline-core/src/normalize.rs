//! Ticket export normalization.
//!
//! Reads a delimited export, keeps only recognised service categories, attaches
//! the product, parses both timestamps, and returns records sorted by acceptance
//! time. The sort is stable, so tickets accepted at the same instant keep their
//! file order and cohorts inherit chronological order from this single pass.

use std::io::Read;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, info};

use crate::IngestError;
use crate::ticket::{
    ACCEPTANCE_COLUMN, CATEGORY_COLUMN, COMPLETION_COLUMN, CUSTOMER_COLUMN, Product, TicketRecord,
};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

/// Reader settings for a ticket export.
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    pub delimiter: u8,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

/// Normalize an in-memory export (e.g. an uploaded file's bytes).
pub fn normalize_bytes(
    input: &[u8],
    options: &NormalizeOptions,
) -> Result<Vec<TicketRecord>, IngestError> {
    let text = std::str::from_utf8(input)?;
    normalize(text.as_bytes(), options)
}

/// Normalize a ticket export read from `reader`.
///
/// Fails on the first malformed row, missing required column, or unparseable
/// timestamp; records with unrecognised categories are skipped, not errors.
pub fn normalize<R: Read>(
    reader: R,
    options: &NormalizeOptions,
) -> Result<Vec<TicketRecord>, IngestError> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .trim(Trim::Headers)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let columns = Columns::locate(&headers)?;

    let mut records = Vec::new();
    let mut dropped = 0usize;

    for (i, row) in rdr.records().enumerate() {
        let row = row?;
        let line = row.position().map(|p| p.line() as usize).unwrap_or(i + 2);

        let category = row.get(columns.category).unwrap_or_default();
        let Some(product) = Product::from_category(category) else {
            dropped += 1;
            continue;
        };

        let accepted_raw = row.get(columns.accepted).unwrap_or_default();
        let accepted_at =
            parse_timestamp(accepted_raw).ok_or_else(|| IngestError::Timestamp {
                row: line,
                column: ACCEPTANCE_COLUMN,
                value: accepted_raw.to_string(),
            })?;

        let completed_raw = row.get(columns.completed).unwrap_or_default();
        let completed_at = if completed_raw.trim().is_empty() {
            None
        } else {
            Some(
                parse_timestamp(completed_raw).ok_or_else(|| IngestError::Timestamp {
                    row: line,
                    column: COMPLETION_COLUMN,
                    value: completed_raw.to_string(),
                })?,
            )
        };

        let fields = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let value = row
                    .get(idx)
                    .filter(|v| !v.trim().is_empty())
                    .map(str::to_string);
                (name.to_string(), value)
            })
            .collect();

        records.push(TicketRecord {
            customer: row.get(columns.customer).unwrap_or_default().trim().to_string(),
            category: category.to_string(),
            product,
            accepted_at,
            completed_at,
            fields,
        });
    }

    records.sort_by_key(|r| r.accepted_at);

    debug!(dropped, "skipped tickets outside recognised service categories");
    info!(kept = records.len(), dropped, "normalized ticket export");
    Ok(records)
}

/// Parse a timestamp cell in any of the accepted export formats.
///
/// RFC 3339 values carrying an offset are converted to UTC.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

struct Columns {
    customer: usize,
    category: usize,
    accepted: usize,
    completed: usize,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self, IngestError> {
        let find = |name: &'static str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or(IngestError::MissingColumn(name))
        };
        Ok(Self {
            customer: find(CUSTOMER_COLUMN)?,
            category: find(CATEGORY_COLUMN)?,
            accepted: find(ACCEPTANCE_COLUMN)?,
            completed: find(COMPLETION_COLUMN)?,
        })
    }
}
