//! Core types and pure transforms for ticketline: normalization, cohort grouping,
//! content fingerprints, prompt rendering, and timeline formatting.

mod error;
pub use error::IngestError;

pub mod cohort;
pub mod fingerprint;
pub mod normalize;
pub mod prompt;
pub mod summary;
pub mod ticket;
pub mod timeline;

pub use cohort::{Cohort, CohortFilter, CohortKey, GroupStat, group_cohorts, group_stats};
pub use fingerprint::{ContentFingerprint, fingerprint};
pub use normalize::{NormalizeOptions, normalize, normalize_bytes};
pub use prompt::{Prompt, build_prompt};
pub use summary::{Section, SectionName, StructuredSummary};
pub use ticket::{Product, TicketRecord};
pub use timeline::{TimelineDocument, TimelineOptions, to_timeline};
