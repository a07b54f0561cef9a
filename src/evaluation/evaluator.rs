//! Model evaluation on train, test and cross-validation folds

use std::sync::Arc;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::binarize::{binarize, ThresholdSource};
use super::metrics::{ClassificationMetrics, RegressionMetrics};
use crate::error::{EvalError, Result};
use crate::training::{
    cross_val_predict, Estimator, FoldStatistics, GradientBoostingConfig, KFold, ModelFactory,
};

/// Per-row actual, predicted and residual (`actual - predicted`) values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSeries {
    pub actual: Vec<f64>,
    pub predicted: Vec<f64>,
    pub residual: Vec<f64>,
}

impl PredictionSeries {
    pub fn new(actual: &Array1<f64>, predicted: &Array1<f64>) -> Result<Self> {
        if actual.len() != predicted.len() {
            return Err(EvalError::MetricError(format!(
                "actual has {} values, predicted has {}",
                actual.len(),
                predicted.len()
            )));
        }
        let residual = (actual - predicted).to_vec();
        Ok(Self {
            actual: actual.to_vec(),
            predicted: predicted.to_vec(),
            residual,
        })
    }

    pub fn len(&self) -> usize {
        self.actual.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actual.is_empty()
    }
}

/// Regression and derived classification metrics of one partition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitEvaluation {
    pub regression: RegressionMetrics,
    pub classification: ClassificationMetrics,
    pub threshold: f64,
    pub threshold_source: ThresholdSource,
    pub predictions: PredictionSeries,
}

/// Fold-level summary of the regression metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossValidationSummary {
    pub rmse: FoldStatistics,
    pub mae: FoldStatistics,
    /// `None` when R² was undefined on every fold
    pub r2: Option<FoldStatistics>,
    pub n_folds: usize,
    /// Folds left out of the R² summary
    pub undefined_r2_folds: usize,
}

/// Complete evaluation of a fitted model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub train: SplitEvaluation,
    pub test: SplitEvaluation,
    /// `None` when cross-validation could not be completed
    pub cross_validation: Option<CrossValidationSummary>,
    pub annotations: Vec<String>,
}

/// Computes the shared metric protocol for every partition.
///
/// Cross-validation re-fits fresh models built by the factory, so the
/// model evaluated on train/test is never touched by the folds.
pub struct Evaluator {
    factory: Arc<dyn ModelFactory>,
    cv_folds: usize,
    random_state: u64,
    threshold: Option<f64>,
    n_jobs: usize,
}

impl Evaluator {
    pub fn new(factory: Arc<dyn ModelFactory>) -> Self {
        Self {
            factory,
            cv_folds: 5,
            random_state: 42,
            threshold: None,
            n_jobs: 0,
        }
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Use a fixed binarization threshold instead of the per-split median
    pub fn with_threshold(mut self, threshold: Option<f64>) -> Self {
        self.threshold = threshold;
        self
    }

    /// Worker threads for cross-validation folds (0 = rayon's global pool)
    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    /// Evaluate a fitted model on one partition
    pub fn evaluate_split(
        &self,
        model: &dyn Estimator,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<SplitEvaluation> {
        let predicted = model.predict(x)?;
        let regression = RegressionMetrics::compute(y, &predicted)?;

        let pair = binarize(y, &predicted, self.threshold)?;
        let classification = ClassificationMetrics::compute(&pair.actual, &pair.predicted)?;

        Ok(SplitEvaluation {
            regression,
            classification,
            threshold: pair.threshold,
            threshold_source: pair.source,
            predictions: PredictionSeries::new(y, &predicted)?,
        })
    }

    /// K-fold cross-validation over `x`, re-fitting `params` on every fold
    pub fn cross_validate(
        &self,
        params: &GradientBoostingConfig,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<CrossValidationSummary> {
        let splits = KFold::new(self.cv_folds)
            .with_random_state(self.random_state)
            .split(x.nrows())?;
        let predict = || cross_val_predict(self.factory.as_ref(), params, x, y, &splits);
        let folds = if self.n_jobs == 0 {
            predict()?
        } else {
            rayon::ThreadPoolBuilder::new()
                .num_threads(self.n_jobs)
                .build()
                .map_err(|e| EvalError::MetricError(format!("failed to build thread pool: {}", e)))?
                .install(predict)?
        };

        let mut rmse = Vec::with_capacity(folds.len());
        let mut mae = Vec::with_capacity(folds.len());
        let mut r2 = Vec::with_capacity(folds.len());

        for fold in &folds {
            let m = RegressionMetrics::compute(&fold.actual, &fold.predicted)?;
            debug!(fold = fold.fold_idx, rmse = m.rmse, "Fold evaluated");
            rmse.push(m.rmse);
            mae.push(m.mae);
            if let Some(v) = m.r2 {
                r2.push(v);
            }
        }

        let n_folds = folds.len();
        let undefined_r2_folds = n_folds - r2.len();
        let no_folds = || EvalError::MetricError("cross-validation produced no folds".to_string());

        Ok(CrossValidationSummary {
            rmse: FoldStatistics::from_scores(rmse).ok_or_else(no_folds)?,
            mae: FoldStatistics::from_scores(mae).ok_or_else(no_folds)?,
            r2: FoldStatistics::from_scores(r2),
            n_folds,
            undefined_r2_folds,
        })
    }

    /// Evaluate train and test partitions, then cross-validate on train.
    ///
    /// Train/test failures are fatal; a cross-validation failure is
    /// recorded as an annotation.
    pub fn evaluate(
        &self,
        model: &dyn Estimator,
        params: &GradientBoostingConfig,
        x_train: &Array2<f64>,
        y_train: &Array1<f64>,
        x_test: &Array2<f64>,
        y_test: &Array1<f64>,
    ) -> Result<Evaluation> {
        let train = self.evaluate_split(model, x_train, y_train)?;
        let test = self.evaluate_split(model, x_test, y_test)?;
        let mut annotations = Vec::new();

        for (name, split) in [("train", &train), ("test", &test)] {
            if split.regression.r2.is_none() {
                warn!(split = name, "R² undefined: actual values have zero variance");
                annotations.push(format!(
                    "{}.r2 undefined: actual values have zero variance",
                    name
                ));
            }
        }

        let cross_validation = match self.cross_validate(params, x_train, y_train) {
            Ok(summary) => {
                if summary.undefined_r2_folds > 0 {
                    annotations.push(format!(
                        "cv.r2 excludes {} of {} folds with zero-variance actuals",
                        summary.undefined_r2_folds, summary.n_folds
                    ));
                }
                Some(summary)
            }
            Err(e) => {
                warn!(error = %e, "Cross-validation failed");
                annotations.push(format!("cross-validation unavailable: {}", e));
                None
            }
        };

        Ok(Evaluation {
            train,
            test,
            cross_validation,
            annotations,
        })
    }
}
