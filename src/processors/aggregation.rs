//! Per point-of-interest distance statistics.
//!
//! Assigned records are partitioned by POI id and reduced with a mergeable
//! running accumulator, so the grouped reduction runs as a Rayon fold/reduce
//! without depending on the order chunks are combined in.

use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;

use super::distance::AssignedRecord;

/// Distance statistics for one point of interest.
#[derive(Debug, Clone, PartialEq)]
pub struct PoiStatistic {
    pub poi_id: String,
    /// Arithmetic mean of assigned distances (km).
    pub mean_distance: f64,
    /// Sample standard deviation (n - 1) of assigned distances (km).
    /// Defined as `0.0` for a single assigned record.
    pub stddev_distance: f64,
    /// Largest assigned distance (km).
    pub radius: f64,
    /// Number of assigned records.
    pub count: usize,
}

/// Running count, mean, sum of squared deviations and max (Welford).
#[derive(Debug, Clone, Copy)]
pub struct RunningStats {
    count: usize,
    mean: f64,
    m2: f64,
    max: f64,
}

impl Default for RunningStats {
    fn default() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            max: f64::NEG_INFINITY,
        }
    }
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one observation.
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
        if value > self.max {
            self.max = value;
        }
    }

    /// Combine two partial accumulators (Chan et al. parallel update).
    pub fn merge(&mut self, other: &RunningStats) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }

        let total = self.count + other.count;
        let delta = other.mean - self.mean;
        self.mean += delta * other.count as f64 / total as f64;
        self.m2 +=
            other.m2 + delta * delta * (self.count as f64 * other.count as f64) / total as f64;
        self.count = total;
        self.max = self.max.max(other.max);
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample standard deviation; `0.0` when fewer than two observations.
    pub fn sample_stddev(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            (self.m2 / (self.count - 1) as f64).max(0.0).sqrt()
        }
    }

    #[inline]
    pub fn max(&self) -> f64 {
        self.max
    }
}

fn merge_maps(
    mut left: HashMap<String, RunningStats>,
    right: HashMap<String, RunningStats>,
) -> HashMap<String, RunningStats> {
    for (poi_id, stats) in right {
        left.entry(poi_id).or_default().merge(&stats);
    }
    left
}

/// Group assigned records by POI and compute mean, stddev, radius and count.
///
/// The result is sorted by POI id and contains only POIs that received at
/// least one record.
pub fn aggregate_by_poi(assigned: &[AssignedRecord]) -> Vec<PoiStatistic> {
    let groups: HashMap<String, RunningStats> = assigned
        .par_iter()
        .fold(HashMap::new, |mut acc: HashMap<String, RunningStats>, a| {
            acc.entry(a.poi_id.clone()).or_default().push(a.distance_km);
            acc
        })
        .reduce(HashMap::new, merge_maps);

    let sorted: BTreeMap<String, RunningStats> = groups.into_iter().collect();

    sorted
        .into_iter()
        .map(|(poi_id, stats)| PoiStatistic {
            poi_id,
            mean_distance: stats.mean(),
            stddev_distance: stats.sample_stddev(),
            radius: stats.max(),
            count: stats.count(),
        })
        .collect()
}
