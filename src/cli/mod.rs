//! boosteval command-line interface
//!
//! `run` executes the full evaluation pipeline on a CSV file; `info`
//! describes a CSV file's columns.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use colored::*;

use crate::data::{loader::dataframe_to_dataset, DataLoader};
use crate::pipeline::{EvaluationPipeline, PipelineConfig};
use crate::plot::{render_diagnostics, SvgRenderer};
use crate::report::style::{accent, dim, muted, ok, section};
use crate::report::{report_all, ConsoleReporter, JsonReporter, Reporter};

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
    let _ = io::stdout().flush();
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn step_warn(msg: &str) {
    println!("  {} {}", "!".yellow(), msg);
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "boosteval")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Two-stage hyperparameter search and evaluation for gradient-boosted regression")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search, fit and evaluate a gradient boosting model
    Run(RunArgs),

    /// Show column information of a CSV file
    Info {
        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Feature columns to summarize (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        features: Option<Vec<String>>,

        /// Target column to summarize
        #[arg(short, long)]
        target: Option<String>,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    /// Input CSV file with a header row
    #[arg(short, long)]
    pub data: PathBuf,

    /// JSON configuration file; flags below override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Feature columns (comma separated)
    #[arg(short, long, value_delimiter = ',')]
    pub features: Option<Vec<String>>,

    /// Target column name
    #[arg(short, long)]
    pub target: Option<String>,

    /// Random seed for split, search and cross-validation
    #[arg(long)]
    pub seed: Option<u64>,

    /// Fraction of rows held out for testing
    #[arg(long)]
    pub test_fraction: Option<f64>,

    /// Number of cross-validation folds
    #[arg(long)]
    pub cv_folds: Option<usize>,

    /// Random candidates in the coarse search stage
    #[arg(long)]
    pub n_iter: Option<usize>,

    /// Worker threads for the search (0 = all cores)
    #[arg(long)]
    pub n_jobs: Option<usize>,

    /// Fixed classification threshold instead of the median
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Directory for diagnostic plots
    #[arg(long, default_value = "plots")]
    pub plots_dir: PathBuf,

    /// Skip plot rendering
    #[arg(long)]
    pub no_plots: bool,

    /// Write the full run report as JSON
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of best trials to list
    #[arg(long, default_value = "5")]
    pub top: usize,
}

impl RunArgs {
    /// File configuration (or defaults) with command-line overrides applied
    pub fn resolve_config(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(features) = &self.features {
            config.feature_columns = features.iter().map(|f| f.trim().to_string()).collect();
        }
        if let Some(target) = &self.target {
            config.target_column = target.clone();
        }
        if let Some(seed) = self.seed {
            config.random_state = seed;
        }
        if let Some(fraction) = self.test_fraction {
            config.test_fraction = fraction;
        }
        if let Some(folds) = self.cv_folds {
            config.cv_folds = folds;
        }
        if let Some(n_iter) = self.n_iter {
            config.search.n_iter = n_iter;
        }
        if let Some(n_jobs) = self.n_jobs {
            config.search.n_jobs = n_jobs;
        }
        if self.threshold.is_some() {
            config.threshold = self.threshold;
        }

        config.validate()?;
        Ok(config)
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_run(args: &RunArgs) -> anyhow::Result<()> {
    let config = args.resolve_config()?;
    section(&mut io::stdout(), "Evaluate")?;

    step_run("Running pipeline");
    let start = Instant::now();
    let run = EvaluationPipeline::new(config).run_csv(&args.data)?;
    step_done(&format!("{:.2?}", start.elapsed()));

    if run.search.is_degraded() {
        step_warn("hyperparameter search failed; default parameters were used");
    }

    let console = ConsoleReporter::new().with_top_trials(args.top);
    let json = args.output.as_ref().map(JsonReporter::new);
    let mut reporters: Vec<&dyn Reporter> = vec![&console];
    if let Some(json) = &json {
        reporters.push(json);
    }
    for failure in report_all(&reporters, &run) {
        step_warn(&failure);
    }
    if let Some(json) = &json {
        println!("  {} {}", ok("✓"), format!("report written to {}", json.path().display()));
    }

    if !args.no_plots {
        let renderer = SvgRenderer::new(&args.plots_dir);
        let plots = render_diagnostics(&renderer, &run.evaluation.test.predictions);
        for path in &plots.rendered {
            println!("  {} {}", ok("✓"), format!("plot written to {}", path.display()));
        }
        for failure in &plots.failures {
            step_warn(failure);
        }
    }

    println!();
    Ok(())
}

pub fn cmd_info(data_path: &Path, features: Option<&[String]>, target: Option<&str>) -> anyhow::Result<()> {
    section(&mut io::stdout(), "Data Info")?;

    let df = DataLoader::new().load_csv(data_path)?;

    println!("  {:<12} {}", muted("File"), data_path.display());
    println!("  {:<12} {}", muted("Rows"), df.height());
    println!("  {:<12} {}", muted("Columns"), df.width());
    println!();

    println!("  {:<20} {:<12} {:>6}", muted("Column"), muted("Type"), muted("Nulls"));
    println!("  {}", dim(&"─".repeat(40)));
    for col in df.get_columns() {
        println!(
            "  {:<20} {:<12} {:>6}",
            col.name().as_str(),
            format!("{:?}", col.dtype()).truecolor(140, 140, 140),
            col.null_count(),
        );
    }

    let defaults = PipelineConfig::default();
    let features = features
        .map(<[String]>::to_vec)
        .unwrap_or(defaults.feature_columns);
    let target = target.unwrap_or(&defaults.target_column);

    match dataframe_to_dataset(&df, &features, target) {
        Ok(dataset) => {
            section(&mut io::stdout(), "Summary")?;
            println!(
                "  {:<20} {:>10} {:>10} {:>10} {:>10}",
                muted("Column"),
                muted("Mean"),
                muted("Std"),
                muted("Min"),
                muted("Max")
            );
            println!("  {}", dim(&"─".repeat(64)));
            for s in dataset.describe() {
                println!(
                    "  {:<20} {:>10.4} {:>10.4} {:>10.4} {:>10.4}",
                    s.name, s.mean, s.std, s.min, s.max
                );
            }
        }
        Err(e) => {
            println!();
            step_warn(&format!("no summary: {}", e));
        }
    }

    println!();
    Ok(())
}
