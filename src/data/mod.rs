//! Tabular dataset handling
//!
//! - [`Dataset`] - validated feature matrix plus continuous target
//! - [`DataLoader`] - CSV loading and column selection
//! - [`train_test_split`] - seeded train/test partitioning

pub mod loader;
pub mod split;

pub use loader::DataLoader;
pub use split::{train_test_split, TrainTestSplit};

use crate::error::{EvalError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// A dataset of numeric feature rows and one numeric target per row.
///
/// Every row carries all features and the target; non-finite values are
/// rejected at construction.
#[derive(Debug, Clone)]
pub struct Dataset {
    features: Array2<f64>,
    target: Array1<f64>,
    feature_names: Vec<String>,
    target_name: String,
}

/// Summary statistics of one column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub name: String,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl Dataset {
    /// Build a dataset, validating shape agreement and finiteness
    pub fn new(
        features: Array2<f64>,
        target: Array1<f64>,
        feature_names: Vec<String>,
        target_name: impl Into<String>,
    ) -> Result<Self> {
        if features.nrows() != target.len() {
            return Err(EvalError::ShapeError {
                expected: format!("{} target values", features.nrows()),
                actual: format!("{} target values", target.len()),
            });
        }
        if features.ncols() != feature_names.len() {
            return Err(EvalError::ShapeError {
                expected: format!("{} feature names", features.ncols()),
                actual: format!("{} feature names", feature_names.len()),
            });
        }
        if features.nrows() == 0 {
            return Err(EvalError::DataError("dataset has no rows".to_string()));
        }
        if features.ncols() == 0 {
            return Err(EvalError::DataError("dataset has no feature columns".to_string()));
        }

        for (col, name) in features.axis_iter(Axis(1)).zip(feature_names.iter()) {
            if let Some(row) = col.iter().position(|v| !v.is_finite()) {
                return Err(EvalError::DataError(format!(
                    "non-finite value in feature '{}' at row {}",
                    name, row
                )));
            }
        }
        if let Some(row) = target.iter().position(|v| !v.is_finite()) {
            return Err(EvalError::DataError(format!(
                "non-finite target value at row {}",
                row
            )));
        }

        Ok(Self {
            features,
            target,
            feature_names,
            target_name: target_name.into(),
        })
    }

    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn target(&self) -> &Array1<f64> {
        &self.target
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Rows at `indices`, in the given order
    pub fn select(&self, indices: &[usize]) -> Result<Self> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.n_samples()) {
            return Err(EvalError::DataError(format!(
                "row index {} out of bounds for {} rows",
                bad,
                self.n_samples()
            )));
        }
        Ok(Self {
            features: self.features.select(Axis(0), indices),
            target: self.target.select(Axis(0), indices),
            feature_names: self.feature_names.clone(),
            target_name: self.target_name.clone(),
        })
    }

    /// Same rows and target with a replacement feature matrix (e.g. after scaling)
    pub fn with_features(&self, features: Array2<f64>) -> Result<Self> {
        Self::new(
            features,
            self.target.clone(),
            self.feature_names.clone(),
            self.target_name.clone(),
        )
    }

    /// Per-column summary of every feature followed by the target
    pub fn describe(&self) -> Vec<ColumnSummary> {
        let mut summaries: Vec<ColumnSummary> = self
            .features
            .axis_iter(Axis(1))
            .zip(self.feature_names.iter())
            .map(|(col, name)| summarize(name, col.iter().copied()))
            .collect();
        summaries.push(summarize(&self.target_name, self.target.iter().copied()));
        summaries
    }
}

fn summarize(name: &str, values: impl Iterator<Item = f64> + Clone) -> ColumnSummary {
    let n = values.clone().count().max(1) as f64;
    let mean = values.clone().sum::<f64>() / n;
    let var = values.clone().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    ColumnSummary {
        name: name.to_string(),
        mean,
        std: var.sqrt(),
        min,
        max,
    }
}
