//! boosteval - hyperparameter search and evaluation for gradient boosting
//!
//! Splits a tabular dataset, standardizes its features, tunes a gradient
//! boosted regressor with a two-stage search and evaluates it with both
//! regression metrics and a median-split classification view.
//!
//! # Modules
//!
//! ## Core
//! - [`data`] - Dataset, CSV loading, train/test split
//! - [`preprocessing`] - Feature standardization
//! - [`training`] - Gradient boosting, decision trees, k-fold CV
//! - [`optimizer`] - Two-stage hyperparameter search
//! - [`evaluation`] - Metrics, binarization, metrics report
//! - [`pipeline`] - End-to-end orchestration
//!
//! ## Presentation
//! - [`report`] - Console and JSON reporters
//! - [`plot`] - SVG diagnostic plots
//! - [`cli`] - Command-line interface

pub mod error;

pub mod data;
pub mod evaluation;
pub mod optimizer;
pub mod pipeline;
pub mod preprocessing;
pub mod training;

pub mod cli;
pub mod plot;
pub mod report;

pub use error::{EvalError, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{EvalError, Result};

    pub use crate::data::{train_test_split, DataLoader, Dataset, TrainTestSplit};
    pub use crate::preprocessing::{ScalerState, StandardScaler};
    pub use crate::training::{
        Estimator, GradientBoostingConfig, GradientBoostingFactory, GradientBoostingRegressor,
        KFold, ModelFactory,
    };
    pub use crate::optimizer::{
        BoostingSearchSpace, SearchConfig, SearchOutcome, SearchResult, Study, TwoStageSearch,
    };
    pub use crate::evaluation::{
        binarize, ClassificationMetrics, Evaluation, Evaluator, MetricValue, MetricsReport,
        RegressionMetrics,
    };
    pub use crate::pipeline::{EvaluationPipeline, PipelineConfig, PipelineRun};
    pub use crate::report::{ConsoleReporter, JsonReporter, Reporter};
    pub use crate::plot::{render_diagnostics, PlotRenderer, SvgRenderer};
}
