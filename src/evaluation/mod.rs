//! Model evaluation
//!
//! Regression metrics, a median-split classification view of the same
//! predictions, k-fold cross-validation and the resulting [`MetricsReport`].

pub mod binarize;
pub mod evaluator;
pub mod metrics;
pub mod report;

pub use binarize::{binarize, median, BinarizedPair, ThresholdSource};
pub use evaluator::{CrossValidationSummary, Evaluation, Evaluator, PredictionSeries, SplitEvaluation};
pub use metrics::{ClassificationMetrics, ConfusionMatrix, RegressionMetrics};
pub use report::{MetricValue, MetricsReport};
