//! Density scoring: count / radius per POI, rescaled into a fixed range.

use log::warn;

use super::aggregation::PoiStatistic;
use crate::config::{DensityConfig, ZeroRadiusPolicy};

/// Scaled density for one point of interest.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityScore {
    pub poi_id: String,
    pub count: usize,
    pub radius: f64,
    /// `count / radius`, or `0.0` for a zero-radius POI under
    /// [`ZeroRadiusPolicy::ZeroScore`].
    pub raw_density: f64,
    /// `raw_density` mapped linearly into the configured output range.
    /// Zero-scored POIs are pinned to `0.0`.
    pub scaled: f64,
}

/// Scores plus the POIs whose radius made the raw density undefined.
#[derive(Debug, Clone, Default)]
pub struct DensityReport {
    /// Scored POIs, in the order of the input statistics.
    pub scores: Vec<DensityScore>,
    /// POIs with a zero radius.
    pub degenerate: Vec<String>,
    pub policy: ZeroRadiusPolicy,
}

impl DensityReport {
    pub fn score_for(&self, poi_id: &str) -> Option<&DensityScore> {
        self.scores.iter().find(|s| s.poi_id == poi_id)
    }
}

/// `count / radius`, or `None` when the radius is not strictly positive.
pub fn raw_density(count: usize, radius: f64) -> Option<f64> {
    if radius > 0.0 && radius.is_finite() {
        Some(count as f64 / radius)
    } else {
        None
    }
}

/// Map `value` from `[min, max]` onto `[lo, hi]`.
///
/// Values outside the input interval clamp to the nearest end. When
/// `min == max` every value maps to the midpoint of the output range.
pub fn interpolate(value: f64, (min, max): (f64, f64), (lo, hi): (f64, f64)) -> f64 {
    let span = max - min;
    if span <= 0.0 || !span.is_finite() {
        return (lo + hi) / 2.0;
    }

    let t = ((value - min) / span).clamp(0.0, 1.0);
    lo + t * (hi - lo)
}

/// Rescale a slice so its minimum lands on `lo` and its maximum on `hi`.
pub fn rescale(values: &[f64], (lo, hi): (f64, f64)) -> Vec<f64> {
    let Some((min, max)) = min_max(values) else {
        return Vec::new();
    };

    values
        .iter()
        .map(|&v| interpolate(v, (min, max), (lo, hi)))
        .collect()
}

fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    values.iter().fold(None, |acc, &v| match acc {
        None => Some((v, v)),
        Some((min, max)) => Some((min.min(v), max.max(v))),
    })
}

/// Compute raw and scaled densities for every POI statistic.
///
/// Zero-radius POIs are handled by `config.zero_radius` and always listed in
/// [`DensityReport::degenerate`]. They never contribute to the min/max used
/// for scaling.
pub fn score_densities(stats: &[PoiStatistic], config: &DensityConfig) -> DensityReport {
    let mut degenerate = Vec::new();
    let mut raw: Vec<(&PoiStatistic, Option<f64>)> = Vec::with_capacity(stats.len());

    for stat in stats {
        match raw_density(stat.count, stat.radius) {
            Some(density) => raw.push((stat, Some(density))),
            None => {
                warn!(
                    "{}: radius is {} km over {} records, density undefined",
                    stat.poi_id, stat.radius, stat.count
                );
                degenerate.push(stat.poi_id.clone());
                if config.zero_radius == ZeroRadiusPolicy::ZeroScore {
                    raw.push((stat, None));
                }
            }
        }
    }

    let [lo, hi] = config.output_range;
    let densities: Vec<f64> = raw.iter().filter_map(|(_, d)| *d).collect();
    let mut rescaled = rescale(&densities, (lo, hi)).into_iter();

    let scores = raw
        .into_iter()
        .map(|(stat, density)| {
            let (raw_density, scaled) = match density {
                Some(d) => (d, rescaled.next().unwrap_or(0.0)),
                None => (0.0, 0.0),
            };
            DensityScore {
                poi_id: stat.poi_id.clone(),
                count: stat.count,
                radius: stat.radius,
                raw_density,
                scaled,
            }
        })
        .collect();

    DensityReport {
        scores,
        degenerate,
        policy: config.zero_radius,
    }
}
