use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duckdb error: {0}")]
    DuckDb(#[from] ::duckdb::Error),

    #[error("cannot serialize summary: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("cached summary for customer {customer} / {product} is corrupt: {source}")]
    Corrupt {
        customer: String,
        product: String,
        source: serde_json::Error,
    },

    #[error("{0}")]
    Other(String),
}
