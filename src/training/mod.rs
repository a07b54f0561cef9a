//! Model training module
//!
//! Provides the gradient-boosted regression estimator consumed by the
//! search and evaluation layers:
//! - [`Estimator`] / [`ModelFactory`] - black-box fit/predict seam
//! - Gradient boosting over least-squares regression trees
//! - Seeded K-fold cross-validation

mod models;
pub mod cross_validation;
pub mod decision_tree;
pub mod gradient_boosting;

pub use models::{Estimator, GradientBoostingFactory, ModelFactory};
pub use cross_validation::{cross_val_predict, fit_predict_fold, CVSplit, FoldPrediction, FoldStatistics, KFold};
pub use decision_tree::{DecisionTree, TreeNode};
pub use gradient_boosting::{GradientBoostingConfig, GradientBoostingRegressor};
