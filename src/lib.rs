//! Nearest point-of-interest statistics for geolocated samples.
//!
//! This crate provides tools for:
//! - Loading a point-of-interest list and a sample of geolocated events
//! - Removing samples that collide on timestamp and coordinates
//! - Assigning each sample to its nearest point of interest (haversine)
//! - Per-POI distance statistics and a count/radius density score
//! - Rendering the scaled densities as a bar chart
//!
//! # Example
//!
//! ```no_run
//! use poi_density::{pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::default();
//! let report = pipeline::run(&config).unwrap();
//! println!("{} POIs scored", report.densities.scores.len());
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod pipeline;
pub mod processors;
pub mod visualization;

pub use config::{
    CleaningConfig, DensityConfig, DistanceConfig, InputConfig, OutputConfig, PipelineConfig,
    ZeroRadiusPolicy,
};
pub use crate::core::loaders::{PointOfInterest, SampleRecord};
pub use pipeline::PipelineReport;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
