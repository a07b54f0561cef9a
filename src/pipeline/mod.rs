//! End-to-end evaluation pipeline
//!
//! split → scale → search → evaluate → report. Presentation (console,
//! JSON, plots) lives outside and consumes the returned [`PipelineRun`].

mod config;

pub use config::PipelineConfig;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::data::{train_test_split, DataLoader, Dataset};
use crate::error::Result;
use crate::evaluation::{Evaluation, Evaluator, MetricsReport};
use crate::optimizer::{SearchOutcome, SearchResult, TwoStageSearch};
use crate::preprocessing::{ScalerState, StandardScaler};
use crate::training::{GradientBoostingFactory, ModelFactory};

/// Everything a run produced
#[derive(Debug)]
pub struct PipelineRun {
    pub feature_names: Vec<String>,
    pub target_name: String,
    pub n_train: usize,
    pub n_test: usize,
    /// Fitted on the training partition only
    pub scaler: ScalerState,
    pub search: SearchResult,
    pub evaluation: Evaluation,
    pub report: MetricsReport,
    pub duration_secs: f64,
}

impl PipelineRun {
    /// Feature importances of the fitted model, paired with feature names
    pub fn feature_importances(&self) -> Option<Vec<(String, f64)>> {
        self.search.estimator.feature_importances().map(|imp| {
            self.feature_names
                .iter()
                .cloned()
                .zip(imp.iter().copied())
                .collect()
        })
    }
}

/// Runs the evaluation protocol over a dataset
pub struct EvaluationPipeline {
    config: PipelineConfig,
    factory: Arc<dyn ModelFactory>,
}

impl EvaluationPipeline {
    /// Pipeline over [`GradientBoostingFactory`] seeded with the run seed
    pub fn new(config: PipelineConfig) -> Self {
        let factory = Arc::new(GradientBoostingFactory::new(Some(config.random_state)));
        Self { config, factory }
    }

    /// Pipeline over a custom model factory
    pub fn with_factory(config: PipelineConfig, factory: Arc<dyn ModelFactory>) -> Self {
        Self { config, factory }
    }

    /// Load the configured columns from a CSV file and run
    pub fn run_csv(&self, path: &Path) -> Result<PipelineRun> {
        self.config.validate()?;
        let dataset = DataLoader::new().load_dataset(
            path,
            &self.config.feature_columns,
            &self.config.target_column,
        )?;
        self.run(&dataset)
    }

    pub fn run(&self, dataset: &Dataset) -> Result<PipelineRun> {
        self.config.validate()?;
        let start = Instant::now();
        let cfg = &self.config;

        let split = train_test_split(dataset, cfg.test_fraction, cfg.random_state)?;
        info!(
            train = split.train.n_samples(),
            test = split.test.n_samples(),
            "Split dataset"
        );

        let (scaler, x_train) = StandardScaler::fit_transform(split.train.features())?;
        let x_test = scaler.transform(split.test.features())?;
        let y_train = split.train.target();
        let y_test = split.test.target();

        let search = TwoStageSearch::new(Arc::clone(&self.factory))
            .with_config(cfg.effective_search())
            .with_space(cfg.search_space.clone())
            .run(&x_train, y_train)?;

        let evaluation = Evaluator::new(Arc::clone(&self.factory))
            .with_cv_folds(cfg.cv_folds)
            .with_random_state(cfg.random_state)
            .with_threshold(cfg.threshold)
            .with_n_jobs(cfg.search.n_jobs)
            .evaluate(
                search.estimator.as_ref(),
                search.best_params(),
                &x_train,
                y_train,
                &x_test,
                y_test,
            )?;
        info!(
            test_rmse = evaluation.test.regression.rmse,
            test_accuracy = evaluation.test.classification.accuracy,
            "Evaluation complete"
        );

        let report = MetricsReport::from_evaluation(&evaluation)
            .with_annotations(self.annotations(dataset, &scaler, &search));

        Ok(PipelineRun {
            feature_names: dataset.feature_names().to_vec(),
            target_name: dataset.target_name().to_string(),
            n_train: split.train.n_samples(),
            n_test: split.test.n_samples(),
            scaler,
            search,
            evaluation,
            report,
            duration_secs: start.elapsed().as_secs_f64(),
        })
    }

    fn annotations(&self, dataset: &Dataset, scaler: &ScalerState, search: &SearchResult) -> Vec<String> {
        let mut notes = Vec::new();

        if let SearchOutcome::FallbackDefault { reason, .. } = &search.outcome {
            notes.push(format!("search fell back to default parameters: {}", reason));
        }

        let failed = search.study.n_failed();
        if failed > 0 {
            warn!(failed, "Some search candidates failed");
            notes.push(format!(
                "{} of {} search trials failed",
                failed,
                search.study.n_trials()
            ));
        }

        for &idx in scaler.constant_features() {
            let name = dataset
                .feature_names()
                .get(idx)
                .map(String::as_str)
                .unwrap_or("?");
            notes.push(format!(
                "feature '{}' is constant in training data; centered without scaling",
                name
            ));
        }
        notes
    }
}
