//! Content fingerprints used as cache-key components.
//!
//! The digest covers the canonical JSON rendering of a cohort: one object per
//! record in cohort order, columns in header order plus `product`, timestamps
//! as ISO 8601 with millisecond precision, empty cells as `null`. Object keys
//! keep insertion order, so the bytes never depend on hash-map iteration.

use std::fmt;

use ring::digest::{SHA256, digest};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cohort::Cohort;

const ISO_TIMESTAMP: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Lowercase hex SHA-256 of a cohort's canonical content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentFingerprint(String);

impl ContentFingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap a previously computed digest (e.g. read back from the cache).
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }
}

impl fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical serialization hashed by [`fingerprint`].
pub fn canonical_content(cohort: &Cohort) -> String {
    let rows: Vec<Value> = cohort
        .records
        .iter()
        .map(|r| Value::Object(r.to_json_object(ISO_TIMESTAMP, &Value::Null)))
        .collect();
    Value::Array(rows).to_string()
}

pub fn fingerprint(cohort: &Cohort) -> ContentFingerprint {
    let hash = digest(&SHA256, canonical_content(cohort).as_bytes());
    ContentFingerprint(hex::encode(hash.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::group_cohorts;
    use crate::normalize::{NormalizeOptions, normalize_bytes};

    const HEADER: &str = "TICKET_NUMBER,CUSTOMER_NUMBER,SERVICE_CATEGORY,ACCEPTANCE_TIME,COMPLETION_TIME,NOTE";

    fn cohort(rows: &[&str]) -> Cohort {
        let csv = format!("{HEADER}\n{}\n", rows.join("\n"));
        let records = normalize_bytes(csv.as_bytes(), &NormalizeOptions::default()).unwrap();
        let mut cohorts = group_cohorts(records);
        assert_eq!(cohorts.len(), 1);
        cohorts.remove(0)
    }

    const R1: &str = "T1,100,KAI,2024-01-02 08:00:00,2024-01-02 10:00:00,outage";
    const R2: &str = "T2,100,KAI,2024-01-05 08:00:00,2024-01-05 12:00:00,slow line";
    const R3: &str = "T3,100,KAI,2024-01-09 08:00:00,,still open";

    #[test]
    fn identical_content_identical_digest() {
        let a = fingerprint(&cohort(&[R1, R2]));
        let b = fingerprint(&cohort(&[R1, R2]));
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn appending_a_record_changes_digest() {
        let base = fingerprint(&cohort(&[R1, R2]));
        assert_ne!(base, fingerprint(&cohort(&[R1, R2, R3])));
    }

    #[test]
    fn removing_a_record_changes_digest() {
        let base = fingerprint(&cohort(&[R1, R2]));
        assert_ne!(base, fingerprint(&cohort(&[R1])));
    }

    #[test]
    fn reordering_records_changes_digest() {
        let mut reordered = cohort(&[R1, R2]);
        let base = fingerprint(&reordered);
        reordered.records.swap(0, 1);
        assert_ne!(base, fingerprint(&reordered));
    }

    #[test]
    fn editing_a_field_changes_digest() {
        let base = fingerprint(&cohort(&[R1]));
        let edited = fingerprint(&cohort(&[
            "T1,100,KAI,2024-01-02 08:00:00,2024-01-02 10:00:00,outage resolved",
        ]));
        assert_ne!(base, edited);
    }

    #[test]
    fn canonical_content_uses_iso_timestamps_and_nulls() {
        let content = canonical_content(&cohort(&[R3]));
        assert_eq!(
            content,
            r#"[{"TICKET_NUMBER":"T3","CUSTOMER_NUMBER":"100","SERVICE_CATEGORY":"KAI","ACCEPTANCE_TIME":"2024-01-09T08:00:00.000","COMPLETION_TIME":null,"NOTE":"still open","product":"Broadband"}]"#
        );
    }

    #[test]
    fn from_hex_roundtrips_display() {
        let fp = fingerprint(&cohort(&[R1]));
        assert_eq!(ContentFingerprint::from_hex(fp.to_string()), fp);
    }
}
