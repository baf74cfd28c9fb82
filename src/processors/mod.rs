//! Data processing stages.

pub mod aggregation;
pub mod dedup;
pub mod density;
pub mod distance;

// Re-export key types for convenience
pub use aggregation::{aggregate_by_poi, PoiStatistic, RunningStats};
pub use dedup::{find_colliding_ids, remove_colliding_records, DeduplicationResult};
pub use density::{
    interpolate, raw_density, rescale, score_densities, DensityReport, DensityScore,
};
pub use distance::{assign_nearest, haversine, AssignedRecord, DistanceError, EARTH_RADIUS_KM};
