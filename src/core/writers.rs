//! CSV writers for the per-POI statistics and the nearest-POI assignments.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use thiserror::Error;

use crate::processors::aggregation::PoiStatistic;
use crate::processors::density::DensityReport;
use crate::processors::distance::AssignedRecord;

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open file for writing.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write data to file.
    #[error("failed to write to file '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV writing error.
    #[error("CSV write error for '{path}': {source}")]
    CsvError {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Creates parent directories for a file path if they don't exist.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

fn create_csv_writer(path: &Path) -> Result<csv::Writer<BufWriter<File>>> {
    ensure_parent_dirs(path)?;

    let file = File::create(path).map_err(|e| WriteError::CreateFile {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(csv::Writer::from_writer(BufWriter::new(file)))
}

/// Write the per-POI statistics table.
///
/// Columns: `poi_id,count,mean_km,stddev_km,radius_km,raw_density,scaled_density`.
/// POIs without a score (zero radius under the exclude policy) get empty
/// density cells.
///
/// # Example
///
/// ```no_run
/// use poi_density::core::writers::write_statistics_csv;
/// use poi_density::processors::density::DensityReport;
/// use std::path::Path;
///
/// write_statistics_csv(Path::new("stats.csv"), &[], &DensityReport::default()).unwrap();
/// ```
pub fn write_statistics_csv(
    path: &Path,
    stats: &[PoiStatistic],
    densities: &DensityReport,
) -> Result<()> {
    let mut csv_writer = create_csv_writer(path)?;
    let path_str = path.display().to_string();

    csv_writer
        .write_record([
            "poi_id",
            "count",
            "mean_km",
            "stddev_km",
            "radius_km",
            "raw_density",
            "scaled_density",
        ])
        .map_err(|e| WriteError::CsvError {
            path: path_str.clone(),
            source: e,
        })?;

    for stat in stats {
        let (raw, scaled) = match densities.score_for(&stat.poi_id) {
            Some(score) => (
                format!("{:.6}", score.raw_density),
                format!("{:.6}", score.scaled),
            ),
            None => (String::new(), String::new()),
        };

        csv_writer
            .write_record(&[
                stat.poi_id.clone(),
                stat.count.to_string(),
                format!("{:.6}", stat.mean_distance),
                format!("{:.6}", stat.stddev_distance),
                format!("{:.6}", stat.radius),
                raw,
                scaled,
            ])
            .map_err(|e| WriteError::CsvError {
                path: path_str.clone(),
                source: e,
            })?;
    }

    csv_writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str,
        source: e,
    })?;

    Ok(())
}

/// Write one row per sample record with its nearest POI, that POI's
/// coordinates and the distance between them.
pub fn write_assignments_csv(path: &Path, assigned: &[AssignedRecord]) -> Result<()> {
    let mut csv_writer = create_csv_writer(path)?;
    let path_str = path.display().to_string();

    csv_writer
        .write_record([
            "id",
            "timestamp",
            "country",
            "province",
            "city",
            "latitude",
            "longitude",
            "poi_id",
            "poi_latitude",
            "poi_longitude",
            "distance_km",
        ])
        .map_err(|e| WriteError::CsvError {
            path: path_str.clone(),
            source: e,
        })?;

    for a in assigned {
        let r = &a.record;
        csv_writer
            .write_record(&[
                r.id.clone(),
                r.timestamp.clone(),
                r.country.clone(),
                r.province.clone(),
                r.city.clone(),
                r.latitude.to_string(),
                r.longitude.to_string(),
                a.poi_id.clone(),
                a.poi_latitude.to_string(),
                a.poi_longitude.to_string(),
                format!("{:.6}", a.distance_km),
            ])
            .map_err(|e| WriteError::CsvError {
                path: path_str.clone(),
                source: e,
            })?;
    }

    csv_writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str,
        source: e,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ZeroRadiusPolicy;
    use crate::core::loaders::SampleRecord;
    use crate::processors::density::DensityScore;
    use std::fs;
    use tempfile::tempdir;

    fn create_test_stats() -> Vec<PoiStatistic> {
        vec![
            PoiStatistic {
                poi_id: "POI1".to_string(),
                mean_distance: 2.0,
                stddev_distance: 1.0,
                radius: 3.0,
                count: 3,
            },
            PoiStatistic {
                poi_id: "POI3".to_string(),
                mean_distance: 0.0,
                stddev_distance: 0.0,
                radius: 0.0,
                count: 1,
            },
        ]
    }

    fn create_test_report() -> DensityReport {
        DensityReport {
            scores: vec![DensityScore {
                poi_id: "POI1".to_string(),
                count: 3,
                radius: 3.0,
                raw_density: 1.0,
                scaled: 0.0,
            }],
            degenerate: vec!["POI3".to_string()],
            policy: ZeroRadiusPolicy::Exclude,
        }
    }

    #[test]
    fn test_write_statistics_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stats.csv");

        write_statistics_csv(&path, &create_test_stats(), &create_test_report()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(
            lines[0],
            "poi_id,count,mean_km,stddev_km,radius_km,raw_density,scaled_density"
        );
        assert_eq!(lines.len(), 3); // header + 2 data rows
        assert_eq!(lines[1], "POI1,3,2.000000,1.000000,3.000000,1.000000,0.000000");
        // Degenerate POI has no density cells
        assert!(lines[2].starts_with("POI3,1,"));
        assert!(lines[2].ends_with(",,"));
    }

    #[test]
    fn test_write_assignments_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("assigned.csv");
        let assigned = vec![AssignedRecord {
            record: SampleRecord {
                id: "4516516".to_string(),
                timestamp: "2017-06-21 00:00:00.143".to_string(),
                country: "CA".to_string(),
                province: "ON".to_string(),
                city: "Waterloo".to_string(),
                latitude: 43.49347,
                longitude: -80.49123,
            },
            poi_id: "POI3".to_string(),
            poi_latitude: 45.522,
            poi_longitude: -73.5661,
            distance_km: 593.4135,
        }];

        write_assignments_csv(&path, &assigned).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        let header: Vec<&str> = lines[0].split(',').collect();
        assert_eq!(
            header,
            vec![
                "id",
                "timestamp",
                "country",
                "province",
                "city",
                "latitude",
                "longitude",
                "poi_id",
                "poi_latitude",
                "poi_longitude",
                "distance_km",
            ]
        );
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("4516516,2017-06-21 00:00:00.143,CA,ON,Waterloo,"));
        assert!(lines[1].ends_with(",POI3,45.522,-73.5661,593.413500"));
    }

    #[test]
    fn test_writers_create_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reports").join("nested").join("stats.csv");

        write_statistics_csv(&path, &create_test_stats(), &create_test_report()).unwrap();

        assert!(path.exists());
    }
}
