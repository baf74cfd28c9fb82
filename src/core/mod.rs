//! Core data types and I/O operations.

pub mod loaders;
pub mod writers;

pub use loaders::{LoaderError, PointOfInterest, SampleRecord};
pub use writers::{write_assignments_csv, write_statistics_csv, WriteError};
