//! Command-line interface for the POI density pipeline.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};
use std::path::PathBuf;
use std::time::Instant;

use crate::pipeline::{self, PipelineReport};
use crate::processors::distance::haversine_with_radius;
use crate::PipelineConfig;

#[derive(Parser)]
#[command(name = "poi-density")]
#[command(about = "Nearest point-of-interest statistics and density chart", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline (the default when no command is given)
    Run {
        /// Point-of-interest CSV (POIID, Latitude, Longitude)
        #[arg(long)]
        poi: Option<PathBuf>,
        /// Sample CSV (_ID, TimeSt, Country, Province, City, Latitude, Longitude)
        #[arg(long)]
        samples: Option<PathBuf>,
        /// Chart output path (.png or .svg)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Also write per-POI statistics to this CSV
        #[arg(long)]
        stats_csv: Option<PathBuf>,
        /// Also write per-sample assignments to this CSV
        #[arg(long)]
        assignments_csv: Option<PathBuf>,
    },

    /// Write the default configuration as YAML
    InitConfig {
        /// Destination YAML file
        path: PathBuf,
    },

    /// Print the great-circle distance between two points in kilometers
    Distance {
        #[arg(allow_negative_numbers = true)]
        lat1: f64,
        #[arg(allow_negative_numbers = true)]
        lon1: f64,
        #[arg(allow_negative_numbers = true)]
        lat2: f64,
        #[arg(allow_negative_numbers = true)]
        lon2: f64,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<60} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.chars().count() > 37 {
            let truncated: String = value.chars().take(34).collect();
            format!("{}...", truncated)
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<37} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    // Load config
    let config = match &cli.config {
        Some(path) => match PipelineConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                error!("Failed to load config from {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => PipelineConfig::default(),
    };

    let command = cli.command.unwrap_or(Commands::Run {
        poi: None,
        samples: None,
        output: None,
        stats_csv: None,
        assignments_csv: None,
    });

    match command {
        Commands::Run {
            poi,
            samples,
            output,
            stats_csv,
            assignments_csv,
        } => {
            let mut config = config;
            if let Some(path) = poi {
                config.input.poi_path = path;
            }
            if let Some(path) = samples {
                config.input.samples_path = path;
            }
            if let Some(path) = output {
                config.output.chart_path = path;
            }
            if stats_csv.is_some() {
                config.output.statistics_csv = stats_csv;
            }
            if assignments_csv.is_some() {
                config.output.assignments_csv = assignments_csv;
            }
            cmd_run(&config);
        }
        Commands::InitConfig { path } => {
            cmd_init_config(&path, &config);
        }
        Commands::Distance {
            lat1,
            lon1,
            lat2,
            lon2,
        } => {
            cmd_distance(lat1, lon1, lat2, lon2, &config);
        }
    }
}

fn cmd_run(config: &PipelineConfig) {
    let start = Instant::now();

    println!("Running POI density pipeline...");
    println!("Points of interest: {}", config.input.poi_path.display());
    println!("Samples: {}", config.input.samples_path.display());
    println!("Chart: {}", config.output.chart_path.display());

    let spinner = create_spinner("Cleaning, assigning and aggregating samples...");

    match pipeline::run(config) {
        Ok(report) => {
            spinner.finish_and_clear();
            print_run_summary(&report, start);
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Pipeline failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn print_run_summary(report: &PipelineReport, start: Instant) {
    let mut items = vec![
        ("POIs loaded", report.pois_loaded.to_string()),
        ("POIs excluded", format_list(&report.pois_excluded)),
        ("Samples loaded", report.samples_loaded.to_string()),
        ("Colliding ids", report.blacklisted_ids.len().to_string()),
        ("Rows removed", report.samples_removed.to_string()),
        ("Samples assigned", report.samples_assigned.to_string()),
        ("POIs with samples", report.statistics.len().to_string()),
        ("Zero-radius policy", report.densities.policy.to_string()),
        ("Zero-radius POIs", format_list(&report.densities.degenerate)),
        ("Chart", report.chart_path.display().to_string()),
    ];
    if let Some(path) = &report.statistics_csv {
        items.push(("Statistics CSV", path.display().to_string()));
    }
    if let Some(path) = &report.assignments_csv {
        items.push(("Assignments CSV", path.display().to_string()));
    }
    items.push(("Duration", format!("{:.2?}", start.elapsed())));

    print_summary("Pipeline Complete", &items);

    println!(
        "{:<8} {:>7} {:>11} {:>11} {:>11} {:>9}",
        "POI", "count", "mean km", "stddev km", "radius km", "density"
    );
    for stat in &report.statistics {
        let scaled = report
            .densities
            .score_for(&stat.poi_id)
            .map(|s| format!("{:>9.3}", s.scaled))
            .unwrap_or_else(|| format!("{:>9}", "-"));
        println!(
            "{:<8} {:>7} {:>11.3} {:>11.3} {:>11.3} {}",
            stat.poi_id, stat.count, stat.mean_distance, stat.stddev_distance, stat.radius, scaled
        );
    }
}

fn format_list(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

fn cmd_init_config(path: &PathBuf, config: &PipelineConfig) {
    match config.to_yaml(path) {
        Ok(()) => println!("Wrote configuration to {}", path.display()),
        Err(e) => {
            error!("Failed to write config to {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn cmd_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64, config: &PipelineConfig) {
    let km = haversine_with_radius(lon1, lat1, lon2, lat2, config.distance.earth_radius_km);
    println!("{:.6} km", km);
}
