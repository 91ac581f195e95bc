//! Ticket records and the service-category → product mapping.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const CUSTOMER_COLUMN: &str = "CUSTOMER_NUMBER";
pub const CATEGORY_COLUMN: &str = "SERVICE_CATEGORY";
pub const ACCEPTANCE_COLUMN: &str = "ACCEPTANCE_TIME";
pub const COMPLETION_COLUMN: &str = "COMPLETION_TIME";

/// Columns that must be present in every export.
pub const REQUIRED_COLUMNS: &[&str] = &[
    CUSTOMER_COLUMN,
    CATEGORY_COLUMN,
    ACCEPTANCE_COLUMN,
    COMPLETION_COLUMN,
];

/// Column names probed, in order, for a ticket identifier.
pub const TICKET_ID_COLUMNS: &[&str] = &["TICKET_NUMBER", "TICKET_ID", "TICKET_NO", "TICKET"];

/// Service-category codes retained during normalization.
pub const VALID_CATEGORIES: &[&str] = &["HDW", "NET", "KAI", "KAV", "GIGA", "VOD", "KAD"];

/// Product line a ticket belongs to.
///
/// Declaration order is the secondary sort order of cohorts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Product {
    Broadband,
    Voice,
    #[serde(rename = "TV")]
    Tv,
    #[serde(rename = "GIGA")]
    Giga,
    #[serde(rename = "VOD")]
    Vod,
    #[serde(rename = "HDW")]
    Hdw,
}

impl Product {
    pub const ALL: [Product; 6] = [
        Product::Broadband,
        Product::Voice,
        Product::Tv,
        Product::Giga,
        Product::Vod,
        Product::Hdw,
    ];

    /// Map a raw service-category code to its product.
    ///
    /// Returns `None` for codes outside [`VALID_CATEGORIES`]; those records are dropped.
    pub fn from_category(code: &str) -> Option<Self> {
        match code {
            "KAI" | "NET" => Some(Self::Broadband),
            "KAV" => Some(Self::Voice),
            "KAD" => Some(Self::Tv),
            "GIGA" => Some(Self::Giga),
            "VOD" => Some(Self::Vod),
            "HDW" => Some(Self::Hdw),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Broadband => "Broadband",
            Self::Voice => "Voice",
            Self::Tv => "TV",
            Self::Giga => "GIGA",
            Self::Vod => "VOD",
            Self::Hdw => "HDW",
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown product: {0}")]
pub struct UnknownProduct(pub String);

impl FromStr for Product {
    type Err = UnknownProduct;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownProduct(s.to_string()))
    }
}

/// One normalized row of a ticket export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketRecord {
    pub customer: String,
    /// Raw service-category code as it appeared in the export.
    pub category: String,
    pub product: Product,
    pub accepted_at: NaiveDateTime,
    /// `None` when the export leaves the completion cell empty (ticket still open).
    pub completed_at: Option<NaiveDateTime>,
    /// Every column of the source row in header order. Empty cells are `None`.
    pub fields: Vec<(String, Option<String>)>,
}

impl TicketRecord {
    /// Raw cell value for `column`, if the column exists and the cell is non-empty.
    pub fn field(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .and_then(|(_, value)| value.as_deref())
    }

    /// Ticket identifier from the first populated column in [`TICKET_ID_COLUMNS`].
    pub fn ticket_id(&self) -> Option<&str> {
        TICKET_ID_COLUMNS.iter().find_map(|col| self.field(col))
    }

    /// JSON object of every column in header order followed by `product`.
    ///
    /// Timestamp columns are rendered with `timestamp_format` (chrono syntax);
    /// empty cells and an open completion time become `missing`.
    pub fn to_json_object(&self, timestamp_format: &str, missing: &Value) -> Map<String, Value> {
        let mut object = Map::with_capacity(self.fields.len() + 1);
        for (name, value) in &self.fields {
            let rendered = match name.as_str() {
                ACCEPTANCE_COLUMN => {
                    Value::String(self.accepted_at.format(timestamp_format).to_string())
                }
                COMPLETION_COLUMN => self
                    .completed_at
                    .map(|ts| Value::String(ts.format(timestamp_format).to_string()))
                    .unwrap_or_else(|| missing.clone()),
                _ => value
                    .as_ref()
                    .map(|v| Value::String(v.clone()))
                    .unwrap_or_else(|| missing.clone()),
            };
            object.insert(name.clone(), rendered);
        }
        object.insert(
            "product".to_string(),
            Value::String(self.product.as_str().to_string()),
        );
        object
    }
}
