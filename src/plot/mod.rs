//! Diagnostic plots
//!
//! Two scatter plots are drawn from the test predictions: actual against
//! predicted with the `y = x` diagonal, and residual against predicted with
//! a zero line. Rendering failures are collected, never propagated.

mod svg;

pub use svg::SvgRenderer;

use std::path::PathBuf;

use tracing::{info, warn};

use crate::error::Result;
use crate::evaluation::PredictionSeries;

/// File stem of the actual-vs-predicted plot
pub const ACTUAL_VS_PREDICTED: &str = "actual_vs_predicted";
/// File stem of the residual plot
pub const RESIDUALS: &str = "residuals";

/// Reference line drawn behind the points
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReferenceLine {
    /// `y = x`
    Diagonal,
    /// `y = c`
    Horizontal(f64),
    None,
}

/// A titled set of (x, y) points
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterSeries {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<(f64, f64)>,
    pub reference: ReferenceLine,
}

impl ScatterSeries {
    pub fn actual_vs_predicted(series: &PredictionSeries) -> Self {
        Self {
            title: "Actual vs Predicted".to_string(),
            x_label: "Actual".to_string(),
            y_label: "Predicted".to_string(),
            points: series
                .actual
                .iter()
                .copied()
                .zip(series.predicted.iter().copied())
                .collect(),
            reference: ReferenceLine::Diagonal,
        }
    }

    pub fn residuals(series: &PredictionSeries) -> Self {
        Self {
            title: "Residuals".to_string(),
            x_label: "Predicted".to_string(),
            y_label: "Residual (actual - predicted)".to_string(),
            points: series
                .predicted
                .iter()
                .copied()
                .zip(series.residual.iter().copied())
                .collect(),
            reference: ReferenceLine::Horizontal(0.0),
        }
    }
}

/// Renders a scatter series to a file named after `file_stem`
pub trait PlotRenderer {
    fn render(&self, series: &ScatterSeries, file_stem: &str) -> Result<PathBuf>;
}

/// Files written and failures collected by [`render_diagnostics`]
#[derive(Debug, Clone, Default)]
pub struct PlotReport {
    pub rendered: Vec<PathBuf>,
    pub failures: Vec<String>,
}

impl PlotReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Render both diagnostic plots, recording failures instead of returning them
pub fn render_diagnostics(renderer: &dyn PlotRenderer, predictions: &PredictionSeries) -> PlotReport {
    let plots = [
        (ACTUAL_VS_PREDICTED, ScatterSeries::actual_vs_predicted(predictions)),
        (RESIDUALS, ScatterSeries::residuals(predictions)),
    ];

    let mut report = PlotReport::default();
    for (stem, series) in &plots {
        match renderer.render(series, stem) {
            Ok(path) => {
                info!(path = %path.display(), "Plot written");
                report.rendered.push(path);
            }
            Err(e) => {
                warn!(plot = stem, error = %e, "Plot rendering failed");
                report.failures.push(format!("{}: {}", stem, e));
            }
        }
    }
    report
}
