//! Data loaders for the point-of-interest list and the sample events.
//!
//! Both inputs are CSV files with a header row. Header names are normalized
//! by trimming whitespace, so exports with `" Latitude"` or `" TimeSt"`
//! resolve to the same columns as clean ones.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use thiserror::Error;

/// Errors that can occur during file loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Empty file: {0}")]
    EmptyFile(PathBuf),

    #[error("Missing required columns in {path}: {columns}")]
    MissingColumns { path: PathBuf, columns: String },

    #[error("Parse error in {path} line {line}, column {column}: {message}")]
    ParseError {
        path: PathBuf,
        line: u64,
        column: String,
        message: String,
    },
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

pub const POI_ID_COLUMN: &str = "POIID";
pub const SAMPLE_ID_COLUMN: &str = "_ID";
pub const TIMESTAMP_COLUMN: &str = "TimeSt";
pub const COUNTRY_COLUMN: &str = "Country";
pub const PROVINCE_COLUMN: &str = "Province";
pub const CITY_COLUMN: &str = "City";
pub const LATITUDE_COLUMN: &str = "Latitude";
pub const LONGITUDE_COLUMN: &str = "Longitude";

/// A point of interest from the POI list.
#[derive(Debug, Clone, PartialEq)]
pub struct PointOfInterest {
    pub id: String,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

/// One geolocated event from the sample table.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRecord {
    pub id: String,
    pub timestamp: String,
    pub country: String,
    pub province: String,
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Normalize a header cell: leading and trailing whitespace is not significant.
#[inline]
pub fn normalize_header(name: &str) -> String {
    name.trim().to_string()
}

/// Header lookup for one CSV file.
struct ColumnIndex<'a> {
    path: &'a Path,
    indices: HashMap<String, usize>,
}

impl<'a> ColumnIndex<'a> {
    fn new(path: &'a Path, headers: &StringRecord) -> Self {
        let indices = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (normalize_header(name), i))
            .collect();
        Self { path, indices }
    }

    /// Resolve every required column, reporting all missing names at once.
    fn require<const N: usize>(&self, names: [&str; N]) -> Result<[usize; N]> {
        let missing: Vec<&str> = names
            .iter()
            .copied()
            .filter(|name| !self.indices.contains_key(*name))
            .collect();

        if !missing.is_empty() {
            return Err(LoaderError::MissingColumns {
                path: self.path.to_path_buf(),
                columns: missing.join(", "),
            });
        }

        Ok(names.map(|name| self.indices[name]))
    }
}

fn record_line(record: &StringRecord) -> u64 {
    record.position().map_or(0, |p| p.line())
}

fn parse_error(path: &Path, record: &StringRecord, column: &str, message: String) -> LoaderError {
    LoaderError::ParseError {
        path: path.to_path_buf(),
        line: record_line(record),
        column: column.to_string(),
        message,
    }
}

fn text_field(path: &Path, record: &StringRecord, idx: usize, column: &str) -> Result<String> {
    record
        .get(idx)
        .map(str::to_string)
        .ok_or_else(|| parse_error(path, record, column, "missing value".to_string()))
}

/// Parse a coordinate cell and check it against `[-limit, limit]`.
fn coordinate_field(
    path: &Path,
    record: &StringRecord,
    idx: usize,
    column: &str,
    limit: f64,
) -> Result<f64> {
    let raw = record
        .get(idx)
        .ok_or_else(|| parse_error(path, record, column, "missing value".to_string()))?;

    let value: f64 = raw
        .parse()
        .map_err(|_| parse_error(path, record, column, format!("invalid number '{}'", raw)))?;

    if !value.is_finite() || value.abs() > limit {
        return Err(parse_error(
            path,
            record,
            column,
            format!("{} is outside [-{}, {}]", value, limit, limit),
        ));
    }

    Ok(value)
}

fn open_reader(path: &Path) -> Result<csv::Reader<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::Fields)
        .from_reader(BufReader::new(file)))
}

/// Load the point-of-interest list.
///
/// Expects `POIID`, `Latitude` and `Longitude` columns (in any order, with
/// optional surrounding whitespace in the header names).
///
/// # Errors
///
/// Returns an error if the file cannot be read, lacks a required column,
/// contains an unparsable or out-of-range coordinate, or has no data rows.
pub fn load_points_of_interest<P: AsRef<Path>>(path: P) -> Result<Vec<PointOfInterest>> {
    let path = path.as_ref();
    let mut reader = open_reader(path)?;

    let headers = reader.headers()?.clone();
    let columns = ColumnIndex::new(path, &headers);
    let [id_idx, lat_idx, lon_idx] =
        columns.require([POI_ID_COLUMN, LATITUDE_COLUMN, LONGITUDE_COLUMN])?;

    let mut pois = Vec::new();
    for result in reader.records() {
        let record = result?;
        pois.push(PointOfInterest {
            id: text_field(path, &record, id_idx, POI_ID_COLUMN)?,
            latitude: coordinate_field(path, &record, lat_idx, LATITUDE_COLUMN, 90.0)?,
            longitude: coordinate_field(path, &record, lon_idx, LONGITUDE_COLUMN, 180.0)?,
        });
    }

    if pois.is_empty() {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }

    Ok(pois)
}

/// Load the sample event table.
///
/// # Errors
///
/// Same conditions as [`load_points_of_interest`].
pub fn load_sample_records<P: AsRef<Path>>(path: P) -> Result<Vec<SampleRecord>> {
    let path = path.as_ref();
    let mut reader = open_reader(path)?;

    let headers = reader.headers()?.clone();
    let columns = ColumnIndex::new(path, &headers);
    let [id_idx, ts_idx, country_idx, province_idx, city_idx, lat_idx, lon_idx] = columns
        .require([
            SAMPLE_ID_COLUMN,
            TIMESTAMP_COLUMN,
            COUNTRY_COLUMN,
            PROVINCE_COLUMN,
            CITY_COLUMN,
            LATITUDE_COLUMN,
            LONGITUDE_COLUMN,
        ])?;

    // Sample exports are large; start with a generous allocation
    let mut records = Vec::with_capacity(16_384);

    for result in reader.records() {
        let record = result?;
        records.push(SampleRecord {
            id: text_field(path, &record, id_idx, SAMPLE_ID_COLUMN)?,
            timestamp: text_field(path, &record, ts_idx, TIMESTAMP_COLUMN)?,
            country: text_field(path, &record, country_idx, COUNTRY_COLUMN)?,
            province: text_field(path, &record, province_idx, PROVINCE_COLUMN)?,
            city: text_field(path, &record, city_idx, CITY_COLUMN)?,
            latitude: coordinate_field(path, &record, lat_idx, LATITUDE_COLUMN, 90.0)?,
            longitude: coordinate_field(path, &record, lon_idx, LONGITUDE_COLUMN, 180.0)?,
        });
    }

    if records.is_empty() {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }

    Ok(records)
}

/// Drop points of interest whose id is listed in `excluded_ids`.
///
/// Returns the kept points and the ids that were actually removed.
pub fn exclude_points_of_interest(
    pois: Vec<PointOfInterest>,
    excluded_ids: &[String],
) -> (Vec<PointOfInterest>, Vec<String>) {
    let mut removed = Vec::new();
    let kept = pois
        .into_iter()
        .filter(|poi| {
            if excluded_ids.iter().any(|id| id == &poi.id) {
                removed.push(poi.id.clone());
                false
            } else {
                true
            }
        })
        .collect();

    (kept, removed)
}
