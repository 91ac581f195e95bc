use thiserror::Error;

/// Reasons an uploaded ticket export cannot be normalized.
///
/// Any of these aborts the whole run; no partial record set is returned.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("input is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("malformed ticket export: {0}")]
    Csv(#[from] csv::Error),

    #[error("required column missing: {0}")]
    MissingColumn(&'static str),

    #[error("row {row}: cannot parse {column} value {value:?} as a timestamp")]
    Timestamp {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
