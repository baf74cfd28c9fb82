//! Great-circle distances and nearest point-of-interest assignment.
//!
//! Every cleaned sample record is compared against every point of interest
//! (a full cross product, parallelized over sample records with Rayon) and
//! assigned to the single closest one.

use rayon::prelude::*;
use thiserror::Error;

use crate::core::loaders::{PointOfInterest, SampleRecord};

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Errors that can occur during nearest-neighbor assignment.
#[derive(Debug, Error)]
pub enum DistanceError {
    #[error("No points of interest left to assign samples to")]
    NoPointsOfInterest,

    #[error("Distance from sample {sample_id} to {poi_id} is not finite")]
    NonFiniteDistance { sample_id: String, poi_id: String },
}

/// Result type for distance operations.
pub type Result<T> = std::result::Result<T, DistanceError>;

/// A sample record joined to its nearest point of interest.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignedRecord {
    pub record: SampleRecord,
    pub poi_id: String,
    pub poi_latitude: f64,
    pub poi_longitude: f64,
    /// Great-circle distance to the POI in kilometers.
    pub distance_km: f64,
}

/// Great-circle distance in kilometers using the haversine formula.
///
/// Inputs are decimal degrees, longitude first. The intermediate value is
/// clamped to `[0, 1]` so rounding near antipodal points cannot push `asin`
/// out of its domain.
pub fn haversine(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    haversine_with_radius(lon1, lat1, lon2, lat2, EARTH_RADIUS_KM)
}

/// [`haversine`] on a sphere of the given radius.
pub fn haversine_with_radius(lon1: f64, lat1: f64, lon2: f64, lat2: f64, radius: f64) -> f64 {
    let (lon1, lat1, lon2, lat2) = (
        lon1.to_radians(),
        lat1.to_radians(),
        lon2.to_radians(),
        lat2.to_radians(),
    );

    let dlon = lon2 - lon1;
    let dlat = lat2 - lat1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();

    radius * c
}

/// Pick the nearest POI for one record.
///
/// `pois` must be sorted by id; a strict `<` keeps the first, so ties go to
/// the lowest id.
fn nearest<'p>(
    record: &SampleRecord,
    pois: &[&'p PointOfInterest],
    radius: f64,
) -> Result<(&'p PointOfInterest, f64)> {
    let mut best: Option<(&PointOfInterest, f64)> = None;

    for &poi in pois {
        let d = haversine_with_radius(
            record.longitude,
            record.latitude,
            poi.longitude,
            poi.latitude,
            radius,
        );
        if !d.is_finite() {
            return Err(DistanceError::NonFiniteDistance {
                sample_id: record.id.clone(),
                poi_id: poi.id.clone(),
            });
        }

        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((poi, d)),
        }
    }

    best.ok_or(DistanceError::NoPointsOfInterest)
}

/// Assign every record to its nearest point of interest.
///
/// Produces exactly one [`AssignedRecord`] per input record, in input order.
/// Ties are broken in favor of the lexicographically lowest POI id.
///
/// # Errors
///
/// Returns [`DistanceError::NoPointsOfInterest`] when `pois` is empty.
pub fn assign_nearest(
    records: &[SampleRecord],
    pois: &[PointOfInterest],
    earth_radius_km: f64,
) -> Result<Vec<AssignedRecord>> {
    if pois.is_empty() {
        return Err(DistanceError::NoPointsOfInterest);
    }

    let mut sorted: Vec<&PointOfInterest> = pois.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    records
        .par_iter()
        .map(|record| {
            let (poi, distance_km) = nearest(record, &sorted, earth_radius_km)?;
            Ok(AssignedRecord {
                record: record.clone(),
                poi_id: poi.id.clone(),
                poi_latitude: poi.latitude,
                poi_longitude: poi.longitude,
                distance_km,
            })
        })
        .collect()
}
