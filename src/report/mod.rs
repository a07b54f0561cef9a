//! Run reporting
//!
//! Reporters consume a finished [`PipelineRun`]. Their failures are
//! [`EvalError::PresentationError`]s that callers log and skip.

mod console;
pub(crate) mod style;

pub use console::ConsoleReporter;

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{EvalError, Result};
use crate::evaluation::{CrossValidationSummary, MetricsReport, ThresholdSource};
use crate::optimizer::{SearchOutcome, TrialResult};
use crate::pipeline::PipelineRun;
use crate::preprocessing::ScalerState;
use crate::training::GradientBoostingConfig;

/// Presents a finished run
pub trait Reporter {
    fn report(&self, run: &PipelineRun) -> Result<()>;
}

/// Run every reporter, returning the failure messages
pub fn report_all(reporters: &[&dyn Reporter], run: &PipelineRun) -> Vec<String> {
    reporters
        .iter()
        .filter_map(|r| match r.report(run) {
            Ok(()) => None,
            Err(e) => {
                warn!(error = %e, "Reporter failed");
                Some(e.to_string())
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThresholdSummary {
    pub train: f64,
    pub test: f64,
    pub source: ThresholdSource,
}

/// Serializable snapshot of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary<'a> {
    pub generated_at: DateTime<Utc>,
    pub version: &'static str,
    pub features: &'a [String],
    pub target: &'a str,
    pub n_train: usize,
    pub n_test: usize,
    pub search: &'a SearchOutcome,
    pub best_params: &'a GradientBoostingConfig,
    pub report: &'a MetricsReport,
    pub thresholds: ThresholdSummary,
    pub cross_validation: Option<&'a CrossValidationSummary>,
    pub feature_importances: Option<Vec<FeatureImportance>>,
    pub scaler: &'a ScalerState,
    pub trials: &'a [TrialResult],
    pub duration_secs: f64,
}

impl<'a> RunSummary<'a> {
    pub fn from_run(run: &'a PipelineRun) -> Self {
        let eval = &run.evaluation;
        Self {
            generated_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION"),
            features: &run.feature_names,
            target: &run.target_name,
            n_train: run.n_train,
            n_test: run.n_test,
            search: &run.search.outcome,
            best_params: run.search.best_params(),
            report: &run.report,
            thresholds: ThresholdSummary {
                train: eval.train.threshold,
                test: eval.test.threshold,
                source: eval.test.threshold_source,
            },
            cross_validation: eval.cross_validation.as_ref(),
            feature_importances: run.feature_importances().map(|pairs| {
                pairs
                    .into_iter()
                    .map(|(feature, importance)| FeatureImportance { feature, importance })
                    .collect()
            }),
            scaler: &run.scaler,
            trials: run.search.study.trials(),
            duration_secs: run.duration_secs,
        }
    }
}

/// Writes a [`RunSummary`] as pretty JSON
#[derive(Debug, Clone)]
pub struct JsonReporter {
    path: PathBuf,
}

impl JsonReporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Reporter for JsonReporter {
    fn report(&self, run: &PipelineRun) -> Result<()> {
        let presentation = |what: &str, e: &dyn std::fmt::Display| {
            EvalError::PresentationError(format!("{} {}: {}", what, self.path.display(), e))
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| presentation("failed to create directory for", &e))?;
        }
        let file = File::create(&self.path).map_err(|e| presentation("failed to create", &e))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &RunSummary::from_run(run))
            .map_err(|e| presentation("failed to write", &e))?;

        info!(path = %self.path.display(), "Report written");
        Ok(())
    }
}
