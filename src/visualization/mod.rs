//! Bar chart rendering for scaled POI densities.
//!
//! Charts are drawn with the plotters library. The backend follows the file
//! extension: `.svg` writes an SVG document, anything else a PNG bitmap.
//! Bars carry no text; they follow the POI-id order of the statistics table.

use std::fs;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters_bitmap::BitMapBackend;
use thiserror::Error;

use crate::processors::density::DensityScore;

/// Errors that can occur during visualization.
#[derive(Error, Debug)]
pub enum VisualizationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Plotting error: {0}")]
    PlottingError(String),

    #[error("No density scores to plot")]
    NoDensities,

    #[error("Invalid value range: {lo}..{hi}")]
    InvalidRange { lo: f64, hi: f64 },
}

/// Result type for visualization operations.
pub type Result<T> = std::result::Result<T, VisualizationError>;

/// Bar fill for non-negative scores.
const POSITIVE_COLOR: RGBColor = RGBColor(55, 126, 184);

/// Bar fill for negative scores.
const NEGATIVE_COLOR: RGBColor = RGBColor(228, 26, 28);

/// Fraction of a slot each bar occupies.
const BAR_WIDTH: f64 = 0.7;

fn plotting_error<E: std::fmt::Display>(e: E) -> VisualizationError {
    VisualizationError::PlottingError(e.to_string())
}

/// Chart output format, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartFormat {
    Svg,
    Bitmap,
}

impl ChartFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension() {
            Some(ext) if ext.eq_ignore_ascii_case("svg") => ChartFormat::Svg,
            _ => ChartFormat::Bitmap,
        }
    }
}

/// Plot one bar per POI, height = scaled density, and save it.
///
/// # Arguments
///
/// * `output_path` - Chart file (`.svg` or a bitmap format such as `.png`)
/// * `scores` - Scored POIs, drawn left to right in slice order
/// * `value_range` - Y-axis span, normally the density output range
/// * `size` - Image size in pixels
pub fn plot_density_bars(
    output_path: &Path,
    scores: &[DensityScore],
    value_range: (f64, f64),
    size: (u32, u32),
) -> Result<()> {
    if scores.is_empty() {
        return Err(VisualizationError::NoDensities);
    }

    let (lo, hi) = value_range;
    if !(lo.is_finite() && hi.is_finite() && lo < hi) {
        return Err(VisualizationError::InvalidRange { lo, hi });
    }

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    match ChartFormat::from_path(output_path) {
        ChartFormat::Svg => {
            let root = SVGBackend::new(output_path, size).into_drawing_area();
            draw_bars(root, scores, value_range)
        }
        ChartFormat::Bitmap => {
            let root = BitMapBackend::new(output_path, size).into_drawing_area();
            draw_bars(root, scores, value_range)
        }
    }
}

fn draw_bars<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    scores: &[DensityScore],
    (lo, hi): (f64, f64),
) -> Result<()> {
    root.fill(&WHITE).map_err(plotting_error)?;

    let n = scores.len();
    let padding = (hi - lo) * 0.05;
    let x_range = -0.5f64..(n as f64 - 0.5);

    // No label areas or captions: the build carries no font backend.
    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .build_cartesian_2d(x_range.clone(), (lo - padding)..(hi + padding))
        .map_err(plotting_error)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .draw()
        .map_err(plotting_error)?;

    chart
        .draw_series(scores.iter().enumerate().map(|(i, score)| {
            let x = i as f64;
            let half = BAR_WIDTH / 2.0;
            let color = if score.scaled >= 0.0 {
                POSITIVE_COLOR
            } else {
                NEGATIVE_COLOR
            };
            Rectangle::new([(x - half, 0.0), (x + half, score.scaled)], color.filled())
        }))
        .map_err(plotting_error)?;

    // Zero baseline
    chart
        .draw_series(LineSeries::new(
            vec![(x_range.start, 0.0), (x_range.end, 0.0)],
            &BLACK,
        ))
        .map_err(plotting_error)?;

    root.present().map_err(plotting_error)?;

    Ok(())
}
