//! Partitioning of normalized tickets into per-customer, per-product cohorts.

use std::collections::BTreeMap;
use std::fmt;

use crate::ticket::{Product, TicketRecord};

/// Identity of a cohort. Orders by customer, then product declaration order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CohortKey {
    pub customer: String,
    pub product: Product,
}

impl fmt::Display for CohortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Customer {} - {}", self.customer, self.product)
    }
}

/// All tickets of one customer for one product, ascending by acceptance time.
///
/// Never empty: a cohort exists only because some record mapped to its key.
#[derive(Debug, Clone)]
pub struct Cohort {
    pub key: CohortKey,
    pub records: Vec<TicketRecord>,
}

impl Cohort {
    pub fn customer(&self) -> &str {
        &self.key.customer
    }

    pub fn product(&self) -> Product {
        self.key.product
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Group records by (customer, product).
///
/// Input must already be sorted by acceptance time (as [`normalize`](crate::normalize)
/// returns it); relative order is preserved inside each cohort. Cohorts are
/// returned in [`CohortKey`] order so runs over the same file are reproducible.
pub fn group_cohorts(records: Vec<TicketRecord>) -> Vec<Cohort> {
    let mut groups: BTreeMap<CohortKey, Vec<TicketRecord>> = BTreeMap::new();
    for record in records {
        let key = CohortKey {
            customer: record.customer.clone(),
            product: record.product,
        };
        groups.entry(key).or_default().push(record);
    }
    groups
        .into_iter()
        .map(|(key, records)| Cohort { key, records })
        .collect()
}

/// Customer and product allow-lists. An empty list places no restriction.
#[derive(Debug, Clone, Default)]
pub struct CohortFilter {
    pub customers: Vec<String>,
    pub products: Vec<Product>,
}

impl CohortFilter {
    pub fn matches(&self, key: &CohortKey) -> bool {
        (self.customers.is_empty() || self.customers.contains(&key.customer))
            && (self.products.is_empty() || self.products.contains(&key.product))
    }

    pub fn apply(&self, cohorts: Vec<Cohort>) -> Vec<Cohort> {
        cohorts.into_iter().filter(|c| self.matches(&c.key)).collect()
    }
}

/// One row of the group overview table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupStat {
    pub customer: String,
    pub product: Product,
    pub ticket_count: usize,
}

pub fn group_stats(cohorts: &[Cohort]) -> Vec<GroupStat> {
    cohorts
        .iter()
        .map(|c| GroupStat {
            customer: c.key.customer.clone(),
            product: c.key.product,
            ticket_count: c.len(),
        })
        .collect()
}
