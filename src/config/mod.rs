//! Configuration types for the POI density pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by [`PipelineConfig::validate`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid output range: lower bound {lo} must be below upper bound {hi}")]
    InvalidOutputRange { lo: f64, hi: f64 },

    #[error("Earth radius must be a positive number of kilometers, got {0}")]
    InvalidEarthRadius(f64),

    #[error("Chart dimensions must be non-zero, got {width}x{height}")]
    InvalidChartSize { width: u32, height: u32 },
}

/// Locations of the two input tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Point-of-interest list (POIID, Latitude, Longitude)
    #[serde(default = "default_poi_path")]
    pub poi_path: PathBuf,

    /// Sample events (_ID, TimeSt, Country, Province, City, Latitude, Longitude)
    #[serde(default = "default_samples_path")]
    pub samples_path: PathBuf,
}

fn default_poi_path() -> PathBuf {
    PathBuf::from("POIList.csv")
}

fn default_samples_path() -> PathBuf {
    PathBuf::from("DataSample.csv")
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            poi_path: default_poi_path(),
            samples_path: default_samples_path(),
        }
    }
}

/// Data cleaning rules applied before the distance join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// POI ids dropped as known-bad data (POI2 shares coordinates with POI1)
    #[serde(default = "default_excluded_poi_ids")]
    pub excluded_poi_ids: Vec<String>,
}

fn default_excluded_poi_ids() -> Vec<String> {
    vec!["POI2".to_string()]
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            excluded_poi_ids: default_excluded_poi_ids(),
        }
    }
}

/// Great-circle distance parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistanceConfig {
    /// Mean Earth radius in kilometers
    #[serde(default = "default_earth_radius_km")]
    pub earth_radius_km: f64,
}

fn default_earth_radius_km() -> f64 {
    6371.0
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            earth_radius_km: default_earth_radius_km(),
        }
    }
}

/// How a POI whose radius is zero is treated by the density scaler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroRadiusPolicy {
    /// Report the POI as degenerate and leave it out of scaling and the chart.
    #[default]
    Exclude,
    /// Keep the POI with raw and scaled density pinned to zero. It does not
    /// take part in the min/max of the other POIs.
    ZeroScore,
}

impl fmt::Display for ZeroRadiusPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZeroRadiusPolicy::Exclude => write!(f, "exclude"),
            ZeroRadiusPolicy::ZeroScore => write!(f, "zero_score"),
        }
    }
}

/// Density scaling parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DensityConfig {
    /// Target range for the scaled densities, as [low, high]
    #[serde(default = "default_output_range")]
    pub output_range: [f64; 2],

    #[serde(default)]
    pub zero_radius: ZeroRadiusPolicy,
}

fn default_output_range() -> [f64; 2] {
    [-10.0, 10.0]
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            output_range: default_output_range(),
            zero_radius: ZeroRadiusPolicy::default(),
        }
    }
}

/// Output artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Bar chart path; `.svg` selects the SVG backend, anything else PNG
    #[serde(default = "default_chart_path")]
    pub chart_path: PathBuf,

    #[serde(default = "default_chart_width")]
    pub chart_width: u32,

    #[serde(default = "default_chart_height")]
    pub chart_height: u32,

    /// Optional per-POI statistics table
    #[serde(default)]
    pub statistics_csv: Option<PathBuf>,

    /// Optional per-sample nearest-POI assignments
    #[serde(default)]
    pub assignments_csv: Option<PathBuf>,
}

fn default_chart_path() -> PathBuf {
    PathBuf::from("density.png")
}

fn default_chart_width() -> u32 {
    1280
}

fn default_chart_height() -> u32 {
    720
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            chart_path: default_chart_path(),
            chart_width: default_chart_width(),
            chart_height: default_chart_height(),
            statistics_csv: None,
            assignments_csv: None,
        }
    }
}

/// Main pipeline configuration combining all sub-configs.
///
/// Built once by the CLI and handed to every stage by reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub cleaning: CleaningConfig,

    #[serde(default)]
    pub distance: DistanceConfig,

    #[serde(default)]
    pub density: DensityConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check the values serde cannot check on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let [lo, hi] = self.density.output_range;
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(ConfigError::InvalidOutputRange { lo, hi });
        }

        let radius = self.distance.earth_radius_km;
        if !(radius.is_finite() && radius > 0.0) {
            return Err(ConfigError::InvalidEarthRadius(radius));
        }

        if self.output.chart_width == 0 || self.output.chart_height == 0 {
            return Err(ConfigError::InvalidChartSize {
                width: self.output.chart_width,
                height: self.output.chart_height,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_pipeline_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.input.poi_path, PathBuf::from("POIList.csv"));
        assert_eq!(config.cleaning.excluded_poi_ids, vec!["POI2".to_string()]);
        assert_eq!(config.distance.earth_radius_km, 6371.0);
        assert_eq!(config.density.output_range, [-10.0, 10.0]);
        assert_eq!(config.density.zero_radius, ZeroRadiusPolicy::Exclude);
        assert!(config.output.statistics_csv.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "density:\n  zero_radius: zero_score\noutput:\n  chart_path: out/chart.svg\n";
        let config: PipelineConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.density.zero_radius, ZeroRadiusPolicy::ZeroScore);
        assert_eq!(config.density.output_range, [-10.0, 10.0]);
        assert_eq!(config.output.chart_path, PathBuf::from("out/chart.svg"));
        assert_eq!(config.output.chart_width, 1280);
        assert_eq!(config.input.samples_path, PathBuf::from("DataSample.csv"));
    }

    #[test]
    fn test_yaml_roundtrip_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = PipelineConfig::default();
        config.cleaning.excluded_poi_ids = vec!["POI2".to_string(), "POI7".to_string()];
        config.output.statistics_csv = Some(PathBuf::from("stats.csv"));
        config.to_yaml(&path).unwrap();

        let loaded = PipelineConfig::from_yaml(&path).unwrap();
        assert_eq!(loaded.cleaning.excluded_poi_ids.len(), 2);
        assert_eq!(loaded.output.statistics_csv, Some(PathBuf::from("stats.csv")));
    }

    #[test]
    fn test_zero_radius_policy_display_matches_yaml() {
        for policy in [ZeroRadiusPolicy::Exclude, ZeroRadiusPolicy::ZeroScore] {
            let yaml = serde_yaml::to_string(&policy).unwrap();
            assert_eq!(yaml.trim(), policy.to_string());
        }
    }

    #[test]
    fn test_from_yaml_rejects_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "density: [not, a, mapping\n").unwrap();

        assert!(PipelineConfig::from_yaml(&path).is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let mut config = PipelineConfig::default();
        config.density.output_range = [5.0, -5.0];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidOutputRange { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_radius() {
        let mut config = PipelineConfig::default();
        config.distance.earth_radius_km = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidEarthRadius(_))
        ));
    }
}
