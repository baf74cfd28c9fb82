//! End-to-end run: load, clean, assign, aggregate, score, render.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::core::loaders::{
    exclude_points_of_interest, load_points_of_interest, load_sample_records,
};
use crate::core::writers::{write_assignments_csv, write_statistics_csv};
use crate::processors::aggregation::{aggregate_by_poi, PoiStatistic};
use crate::processors::dedup::remove_colliding_records;
use crate::processors::density::{score_densities, DensityReport};
use crate::processors::distance::{assign_nearest, AssignedRecord};
use crate::visualization::plot_density_bars;

/// What a pipeline run did, stage by stage.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub pois_loaded: usize,
    pub pois_excluded: Vec<String>,
    pub samples_loaded: usize,
    pub blacklisted_ids: Vec<String>,
    pub samples_removed: usize,
    pub samples_assigned: usize,
    pub statistics: Vec<PoiStatistic>,
    pub densities: DensityReport,
    pub chart_path: PathBuf,
    pub statistics_csv: Option<PathBuf>,
    pub assignments_csv: Option<PathBuf>,
}

/// Run the whole pipeline once with `config`.
///
/// Output files are only written once all statistics and scores have been
/// computed. If any output fails, the files already written by this run are
/// removed again.
pub fn run(config: &PipelineConfig) -> Result<PipelineReport> {
    config.validate().context("Invalid configuration")?;

    let input = &config.input;
    let pois = load_points_of_interest(&input.poi_path).with_context(|| {
        format!("Failed to load points of interest from {}", input.poi_path.display())
    })?;
    let samples = load_sample_records(&input.samples_path).with_context(|| {
        format!("Failed to load samples from {}", input.samples_path.display())
    })?;
    info!(
        "Loaded {} points of interest and {} samples",
        pois.len(),
        samples.len()
    );

    let pois_loaded = pois.len();
    let (pois, pois_excluded) =
        exclude_points_of_interest(pois, &config.cleaning.excluded_poi_ids);
    if !pois_excluded.is_empty() {
        info!("Excluded points of interest: {}", pois_excluded.join(", "));
    }

    let samples_loaded = samples.len();
    let dedup = remove_colliding_records(samples);
    info!(
        "Removed {} rows for {} colliding ids, {} samples remain",
        dedup.removed_rows,
        dedup.blacklisted_ids.len(),
        dedup.records.len()
    );

    let assigned = assign_nearest(&dedup.records, &pois, config.distance.earth_radius_km)
        .context("Nearest point-of-interest assignment failed")?;

    let statistics = aggregate_by_poi(&assigned);
    for stat in &statistics {
        debug!(
            "{}: count={} mean={:.3}km stddev={:.3}km radius={:.3}km",
            stat.poi_id, stat.count, stat.mean_distance, stat.stddev_distance, stat.radius
        );
    }

    let densities = score_densities(&statistics, &config.density);

    let output = &config.output;
    let mut written = Vec::new();
    if let Err(e) = write_outputs(config, &statistics, &densities, &assigned, &mut written) {
        for path in &written {
            if let Err(remove_err) = fs::remove_file(path) {
                warn!("Failed to remove {}: {}", path.display(), remove_err);
            }
        }
        return Err(e);
    }

    Ok(PipelineReport {
        pois_loaded,
        pois_excluded,
        samples_loaded,
        blacklisted_ids: dedup.blacklisted_ids,
        samples_removed: dedup.removed_rows,
        samples_assigned: assigned.len(),
        statistics,
        densities,
        chart_path: output.chart_path.clone(),
        statistics_csv: output.statistics_csv.clone(),
        assignments_csv: output.assignments_csv.clone(),
    })
}

/// Write the chart and the optional CSV reports, recording each file as it
/// lands in `written`.
fn write_outputs(
    config: &PipelineConfig,
    statistics: &[PoiStatistic],
    densities: &DensityReport,
    assigned: &[AssignedRecord],
    written: &mut Vec<PathBuf>,
) -> Result<()> {
    let output = &config.output;
    let [lo, hi] = config.density.output_range;

    plot_density_bars(
        &output.chart_path,
        &densities.scores,
        (lo, hi),
        (output.chart_width, output.chart_height),
    )
    .with_context(|| format!("Failed to render chart {}", output.chart_path.display()))?;
    written.push(output.chart_path.clone());
    info!("Chart -> {}", output.chart_path.display());

    if let Some(path) = &output.statistics_csv {
        write_statistics_csv(path, statistics, densities)
            .with_context(|| format!("Failed to write statistics CSV {}", path.display()))?;
        written.push(path.clone());
        info!("Statistics CSV -> {}", path.display());
    }

    if let Some(path) = &output.assignments_csv {
        write_assignments_csv(path, assigned)
            .with_context(|| format!("Failed to write assignments CSV {}", path.display()))?;
        written.push(path.clone());
        info!("Assignments CSV -> {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, lines.join("\n") + "\n").unwrap();
        path
    }

    fn write_poi_list(dir: &Path) -> PathBuf {
        write_file(
            dir,
            "POIList.csv",
            &[
                "POIID, Latitude,Longitude",
                "POI1,53.546167,-113.485734",
                "POI2,53.546167,-113.485734",
                "POI3,45.5220,-73.5661",
                "POI4,45.22483,-63.232729",
            ],
        )
    }

    fn config_for(dir: &TempDir, poi_path: PathBuf, samples_path: PathBuf) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.input.poi_path = poi_path;
        config.input.samples_path = samples_path;
        config.output.chart_path = dir.path().join("density.svg");
        config.output.chart_width = 400;
        config.output.chart_height = 300;
        config
    }

    #[test]
    fn test_end_to_end_with_collisions() {
        let dir = TempDir::new().unwrap();
        let poi_path = write_poi_list(dir.path());
        let samples_path = write_file(
            dir.path(),
            "DataSample.csv",
            &[
                "_ID, TimeSt,Country,Province,City,Latitude,Longitude",
                "1,2017-06-21 00:00:00.143,CA,ON,Toronto,43.6,-79.4",
                "2,2017-06-21 00:00:00.143,CA,ON,Toronto,43.6,-79.4",
                "3,2017-06-21 00:00:01.000,CA,AB,Edmonton,53.4,-113.5",
                "4,2017-06-21 00:00:02.000,CA,NS,Halifax,44.6,-63.6",
            ],
        );

        let mut config = config_for(&dir, poi_path, samples_path);
        config.output.statistics_csv = Some(dir.path().join("out").join("stats.csv"));
        config.output.assignments_csv = Some(dir.path().join("out").join("assigned.csv"));

        let report = run(&config).unwrap();

        assert_eq!(report.pois_loaded, 4);
        assert_eq!(report.pois_excluded, vec!["POI2".to_string()]);
        assert_eq!(report.samples_loaded, 4);
        assert_eq!(report.blacklisted_ids, vec!["1".to_string(), "2".to_string()]);
        assert_eq!(report.samples_removed, 2);
        assert_eq!(report.samples_assigned, 2);

        // Only samples 3 (Edmonton) and 4 (Halifax) remain
        let ids: Vec<&str> = report.statistics.iter().map(|s| s.poi_id.as_str()).collect();
        assert_eq!(ids, vec!["POI1", "POI4"]);
        assert!(report.statistics.iter().all(|s| s.count == 1));
        let total: usize = report.statistics.iter().map(|s| s.count).sum();
        assert_eq!(total, 2);

        // POI1 ~16.3 km, POI4 ~75.3 km: 1/16.3 > 1/75.3
        assert_eq!(report.densities.scores.len(), 2);
        assert_eq!(report.densities.score_for("POI1").unwrap().scaled, 10.0);
        assert_eq!(report.densities.score_for("POI4").unwrap().scaled, -10.0);

        assert!(report.chart_path.exists());

        let stats = fs::read_to_string(dir.path().join("out").join("stats.csv")).unwrap();
        assert_eq!(stats.lines().count(), 3);

        let assigned = fs::read_to_string(dir.path().join("out").join("assigned.csv")).unwrap();
        assert_eq!(assigned.lines().count(), 3);
        assert!(!assigned.contains("Toronto"));
    }

    #[test]
    fn test_zero_radius_poi_is_excluded_from_chart() {
        let dir = TempDir::new().unwrap();
        let poi_path = write_poi_list(dir.path());
        let samples_path = write_file(
            dir.path(),
            "DataSample.csv",
            &[
                "_ID,TimeSt,Country,Province,City,Latitude,Longitude",
                // Exactly on POI3: radius 0
                "10,2017-06-21 01:00:00.000,CA,QC,Montreal,45.5220,-73.5661",
                "11,2017-06-21 02:00:00.000,CA,AB,Edmonton,53.4,-113.5",
                "12,2017-06-21 03:00:00.000,CA,AB,Edmonton,53.6,-113.3",
            ],
        );

        let config = config_for(&dir, poi_path, samples_path);
        let report = run(&config).unwrap();

        assert_eq!(report.densities.degenerate, vec!["POI3".to_string()]);
        assert_eq!(report.densities.scores.len(), 1);
        assert_eq!(report.densities.scores[0].poi_id, "POI1");
        assert_eq!(report.densities.scores[0].scaled, 0.0);
    }

    fn write_two_city_samples(dir: &Path) -> PathBuf {
        write_file(
            dir,
            "DataSample.csv",
            &[
                "_ID,TimeSt,Country,Province,City,Latitude,Longitude",
                "3,2017-06-21 00:00:01.000,CA,AB,Edmonton,53.4,-113.5",
                "4,2017-06-21 00:00:02.000,CA,NS,Halifax,44.6,-63.6",
            ],
        )
    }

    #[test]
    fn test_default_chart_format_renders() {
        let dir = TempDir::new().unwrap();
        let poi_path = write_poi_list(dir.path());
        let samples_path = write_two_city_samples(dir.path());

        let mut config = PipelineConfig::default();
        let chart_name = config.output.chart_path.file_name().unwrap().to_owned();
        config.input.poi_path = poi_path;
        config.input.samples_path = samples_path;
        config.output.chart_path = dir.path().join(chart_name);

        let report = run(&config).unwrap();

        assert_eq!(report.chart_path.extension().unwrap(), "png");
        assert!(fs::metadata(&report.chart_path).unwrap().len() > 0);
    }

    #[test]
    fn test_failed_report_write_removes_chart() {
        let dir = TempDir::new().unwrap();
        let poi_path = write_poi_list(dir.path());
        let samples_path = write_two_city_samples(dir.path());

        let mut config = config_for(&dir, poi_path, samples_path);
        // A directory cannot be opened as a CSV file
        let blocked = dir.path().join("stats.csv");
        fs::create_dir(&blocked).unwrap();
        config.output.statistics_csv = Some(blocked);

        let err = run(&config).unwrap_err();

        assert!(format!("{:#}", err).contains("Failed to write statistics CSV"));
        assert!(!config.output.chart_path.exists());
    }

    #[test]
    fn test_missing_input_is_fatal() {
        let dir = TempDir::new().unwrap();
        let poi_path = write_poi_list(dir.path());
        let config = config_for(&dir, poi_path, dir.path().join("missing.csv"));

        let err = run(&config).unwrap_err();
        assert!(format!("{:#}", err).contains("missing.csv"));
        assert!(!config.output.chart_path.exists());
    }

    #[test]
    fn test_all_samples_colliding_has_nothing_to_plot() {
        let dir = TempDir::new().unwrap();
        let poi_path = write_poi_list(dir.path());
        let samples_path = write_file(
            dir.path(),
            "DataSample.csv",
            &[
                "_ID,TimeSt,Country,Province,City,Latitude,Longitude",
                "1,t,CA,ON,Toronto,43.6,-79.4",
                "2,t,CA,ON,Toronto,43.6,-79.4",
            ],
        );

        let config = config_for(&dir, poi_path, samples_path);
        assert!(run(&config).is_err());
    }

    #[test]
    fn test_invalid_config_rejected_before_loading() {
        let mut config = PipelineConfig::default();
        config.density.output_range = [1.0, 1.0];
        config.input.poi_path = PathBuf::from("/nonexistent/POIList.csv");

        let err = run(&config).unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid configuration"));
    }
}
