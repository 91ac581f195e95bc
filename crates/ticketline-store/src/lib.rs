//! Storage layer: persistent DuckDB cache of generated cohort summaries.

mod error;
pub use error::StoreError;

mod cache;
pub use cache::SummaryCache;
