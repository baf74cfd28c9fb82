//! Removal of sample records that collide on (timestamp, latitude, longitude).
//!
//! Two records collide when they share the exact same timestamp and
//! coordinates but carry different ids. Every id involved in a collision is
//! blacklisted and all of its rows are dropped, including the "original".

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::core::loaders::SampleRecord;

/// Grouping key for collision detection.
///
/// Coordinates are compared by bit pattern after folding `-0.0` into `0.0`,
/// which matches IEEE equality for every finite value the loader accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CollisionKey<'a> {
    timestamp: &'a str,
    latitude: u64,
    longitude: u64,
}

fn coordinate_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

impl<'a> CollisionKey<'a> {
    fn of(record: &'a SampleRecord) -> Self {
        Self {
            timestamp: record.timestamp.as_str(),
            latitude: coordinate_bits(record.latitude),
            longitude: coordinate_bits(record.longitude),
        }
    }
}

/// Outcome of the deduplication pass.
#[derive(Debug, Clone)]
pub struct DeduplicationResult {
    /// Records whose id never took part in a collision, in input order.
    pub records: Vec<SampleRecord>,
    /// Ids that collided with a different id, sorted.
    pub blacklisted_ids: Vec<String>,
    /// Number of input rows dropped because their id is blacklisted.
    pub removed_rows: usize,
}

/// Collect the ids that share a collision key with at least one other id.
pub fn find_colliding_ids(records: &[SampleRecord]) -> BTreeSet<String> {
    let mut groups: HashMap<CollisionKey<'_>, HashSet<&str>> = HashMap::new();
    for record in records {
        groups
            .entry(CollisionKey::of(record))
            .or_default()
            .insert(record.id.as_str());
    }

    groups
        .into_values()
        .filter(|ids| ids.len() > 1)
        .flatten()
        .map(str::to_string)
        .collect()
}

/// Drop every record whose id collides with a different id.
///
/// Records repeated under the same id do not collide with each other.
pub fn remove_colliding_records(records: Vec<SampleRecord>) -> DeduplicationResult {
    let blacklist = find_colliding_ids(&records);
    let total = records.len();

    let kept: Vec<SampleRecord> = records
        .into_iter()
        .filter(|record| !blacklist.contains(&record.id))
        .collect();

    if !blacklist.is_empty() {
        log::debug!(
            "Blacklisted {} colliding ids ({} rows)",
            blacklist.len(),
            total - kept.len()
        );
    }

    DeduplicationResult {
        removed_rows: total - kept.len(),
        records: kept,
        blacklisted_ids: blacklist.into_iter().collect(),
    }
}
