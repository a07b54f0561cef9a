//! Colored console report

use std::io::{self, Write};

use colored::Colorize;

use super::style::{accent, bar, caution, dim, io_err, kv, muted, ok, section};
use super::Reporter;
use crate::error::Result;
use crate::evaluation::MetricValue;
use crate::optimizer::{SearchOutcome, SearchStage};
use crate::pipeline::PipelineRun;
use crate::training::GradientBoostingConfig;

const METRIC_ROWS: [&str; 8] = [
    "rmse",
    "mae",
    "r2",
    "accuracy",
    "precision",
    "recall",
    "f1",
    "threshold",
];

/// Prints a run summary to stdout
#[derive(Debug, Clone)]
pub struct ConsoleReporter {
    top_trials: usize,
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self { top_trials: 5 }
    }
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of best trials listed (0 hides the table)
    pub fn with_top_trials(mut self, n: usize) -> Self {
        self.top_trials = n;
        self
    }

    pub fn write_to<W: Write>(&self, w: &mut W, run: &PipelineRun) -> Result<()> {
        self.write_data(w, run)?;
        self.write_search(w, run)?;
        self.write_metrics(w, run)?;
        self.write_importances(w, run)?;

        let notes = run.report.annotations();
        if !notes.is_empty() {
            section(w, "Notes")?;
            for note in notes {
                writeln!(w, "  {} {}", caution("!"), note).map_err(io_err)?;
            }
        }
        writeln!(w).map_err(io_err)
    }

    fn write_data<W: Write>(&self, w: &mut W, run: &PipelineRun) -> Result<()> {
        section(w, "Data")?;
        kv(w, "features", &run.feature_names.join(", "), 12)?;
        kv(w, "target", &run.target_name, 12)?;
        kv(w, "train rows", &run.n_train.to_string(), 12)?;
        kv(w, "test rows", &run.n_test.to_string(), 12)
    }

    fn write_search<W: Write>(&self, w: &mut W, run: &PipelineRun) -> Result<()> {
        section(w, "Hyperparameter search")?;
        let study = &run.search.study;

        match &run.search.outcome {
            SearchOutcome::Optimized {
                coarse_best_rmse,
                refined_best_rmse,
                ..
            } => {
                writeln!(w, "  {} {}", ok("✓"), "optimized").map_err(io_err)?;
                kv(w, "coarse rmse", &format!("{:.4}", coarse_best_rmse), 12)?;
                if let Some(refined) = refined_best_rmse {
                    kv(w, "refined rmse", &format!("{:.4}", refined), 12)?;
                }
            }
            SearchOutcome::FallbackDefault { reason, .. } => {
                writeln!(w, "  {} {}", caution("!"), "fell back to default parameters".yellow())
                    .map_err(io_err)?;
                kv(w, "reason", reason, 12)?;
            }
        }
        kv(
            w,
            "trials",
            &format!(
                "{} ({} failed) in {:.1}s",
                study.n_trials(),
                study.n_failed(),
                study.total_duration_secs
            ),
            12,
        )?;

        writeln!(w).map_err(io_err)?;
        for line in params_lines(run.search.best_params()) {
            writeln!(w, "  {} {}", accent("›"), line).map_err(io_err)?;
        }

        let top = study.top_trials(self.top_trials);
        if !top.is_empty() {
            writeln!(w).map_err(io_err)?;
            writeln!(
                w,
                "  {}",
                muted(&format!(
                    "{:>4}  {:<8} {:>9} {:>8}  {}",
                    "#", "stage", "cv rmse", "± std", "params"
                ))
            )
            .map_err(io_err)?;
            for trial in top {
                let stage = match trial.stage {
                    SearchStage::Coarse => "coarse",
                    SearchStage::Refined => "refined",
                };
                writeln!(
                    w,
                    "  {:>4}  {:<8} {:>9.4} {:>8.4}  {}",
                    trial.trial_id,
                    stage,
                    -trial.mean_score,
                    trial.std_score,
                    dim(&compact_params(&trial.params))
                )
                .map_err(io_err)?;
            }
        }
        Ok(())
    }

    fn write_metrics<W: Write>(&self, w: &mut W, run: &PipelineRun) -> Result<()> {
        section(w, "Metrics")?;
        writeln!(
            w,
            "  {}",
            muted(&format!("{:<10} {:>10} {:>10} {:>18}", "", "train", "test", "cv"))
        )
        .map_err(io_err)?;

        let cell = |name: String| -> String {
            run.report
                .get(&name)
                .map(MetricValue::to_string)
                .unwrap_or_else(|| "-".to_string())
        };
        for metric in METRIC_ROWS {
            writeln!(
                w,
                "  {:<10} {:>10} {:>10} {:>18}",
                metric,
                cell(format!("train.{}", metric)),
                cell(format!("test.{}", metric)),
                cell(format!("cv.{}", metric)),
            )
            .map_err(io_err)?;
        }

        let t = &run.evaluation.test.classification.confusion;
        writeln!(w).map_err(io_err)?;
        kv(
            w,
            "test confusion",
            &format!(
                "tp {}  fp {}  tn {}  fn {}",
                t.true_positives, t.false_positives, t.true_negatives, t.false_negatives
            ),
            14,
        )
    }

    fn write_importances<W: Write>(&self, w: &mut W, run: &PipelineRun) -> Result<()> {
        let Some(importances) = run.feature_importances() else {
            return Ok(());
        };
        section(w, "Feature importances")?;
        let width = importances.iter().map(|(n, _)| n.len()).max().unwrap_or(0);
        for (name, value) in &importances {
            writeln!(
                w,
                "  {:<width$} {} {:.3}",
                name,
                accent(&bar(*value, 24)),
                value,
                width = width
            )
            .map_err(io_err)?;
        }
        Ok(())
    }
}

impl Reporter for ConsoleReporter {
    fn report(&self, run: &PipelineRun) -> Result<()> {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        self.write_to(&mut handle, run)?;
        handle.flush().map_err(io_err)
    }
}

fn params_lines(p: &GradientBoostingConfig) -> Vec<String> {
    vec![
        format!("n_estimators      {}", p.n_estimators),
        format!("learning_rate     {}", p.learning_rate),
        format!("max_depth         {}", p.max_depth),
        format!("min_samples_split {}", p.min_samples_split),
        format!("min_samples_leaf  {}", p.min_samples_leaf),
        format!("subsample         {}", p.subsample),
    ]
}

fn compact_params(p: &GradientBoostingConfig) -> String {
    format!(
        "n={} lr={} depth={} split={} leaf={} sub={}",
        p.n_estimators, p.learning_rate, p.max_depth, p.min_samples_split, p.min_samples_leaf, p.subsample
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_params() {
        let s = compact_params(&GradientBoostingConfig::default());
        assert_eq!(s, "n=100 lr=0.1 depth=3 split=2 leaf=1 sub=1");
    }

    #[test]
    fn test_params_lines() {
        let lines = params_lines(&GradientBoostingConfig::default());
        assert_eq!(lines.len(), 6);
        assert!(lines[0].ends_with("100"));
    }
}
