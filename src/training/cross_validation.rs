//! K-fold cross-validation

use super::gradient_boosting::GradientBoostingConfig;
use super::models::ModelFactory;
use crate::error::{EvalError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// K-fold splitter with an explicit seed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KFold {
    pub n_splits: usize,
    pub shuffle: bool,
    pub random_state: Option<u64>,
}

impl Default for KFold {
    fn default() -> Self {
        Self {
            n_splits: 5,
            shuffle: true,
            random_state: Some(42),
        }
    }
}

/// A single train/validation split
#[derive(Debug, Clone, PartialEq)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            ..Default::default()
        }
    }

    /// Set random state for reproducibility
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Generate train/validation splits over `n_samples` rows.
    ///
    /// The first `n_samples % n_splits` folds receive one extra row.
    pub fn split(&self, n_samples: usize) -> Result<Vec<CVSplit>> {
        if self.n_splits < 2 {
            return Err(EvalError::ConfigError(
                "n_splits must be at least 2".to_string(),
            ));
        }
        if n_samples < self.n_splits {
            return Err(EvalError::DataError(format!(
                "n_samples ({}) must be >= n_splits ({})",
                n_samples, self.n_splits
            )));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();

        if self.shuffle {
            let mut rng = match self.random_state {
                Some(seed) => ChaCha8Rng::seed_from_u64(seed),
                None => ChaCha8Rng::from_entropy(),
            };
            indices.shuffle(&mut rng);
        }

        let base = n_samples / self.n_splits;
        let remainder = n_samples % self.n_splits;

        let mut splits = Vec::with_capacity(self.n_splits);
        let mut current = 0;

        for fold_idx in 0..self.n_splits {
            let fold_size = if fold_idx < remainder { base + 1 } else { base };
            let test_indices: Vec<usize> = indices[current..current + fold_size].to_vec();
            let train_indices: Vec<usize> = indices[..current]
                .iter()
                .chain(indices[current + fold_size..].iter())
                .copied()
                .collect();

            splits.push(CVSplit {
                train_indices,
                test_indices,
                fold_idx,
            });

            current += fold_size;
        }

        Ok(splits)
    }
}

/// Held-out predictions of one fold
#[derive(Debug, Clone)]
pub struct FoldPrediction {
    pub fold_idx: usize,
    pub actual: Array1<f64>,
    pub predicted: Array1<f64>,
}

/// Fit a fresh model on the fold's train rows and predict its held-out rows
pub fn fit_predict_fold(
    factory: &dyn ModelFactory,
    params: &GradientBoostingConfig,
    x: &Array2<f64>,
    y: &Array1<f64>,
    split: &CVSplit,
) -> Result<FoldPrediction> {
    let x_train = x.select(Axis(0), &split.train_indices);
    let y_train = y.select(Axis(0), &split.train_indices);
    let x_val = x.select(Axis(0), &split.test_indices);

    let mut model = factory.build(params)?;
    model.fit(&x_train, &y_train)?;
    let predicted = model.predict(&x_val)?;

    Ok(FoldPrediction {
        fold_idx: split.fold_idx,
        actual: y.select(Axis(0), &split.test_indices),
        predicted,
    })
}

/// Fit and predict every fold in parallel, returned in fold order
pub fn cross_val_predict(
    factory: &dyn ModelFactory,
    params: &GradientBoostingConfig,
    x: &Array2<f64>,
    y: &Array1<f64>,
    splits: &[CVSplit],
) -> Result<Vec<FoldPrediction>> {
    splits
        .par_iter()
        .map(|split| fit_predict_fold(factory, params, x, y, split))
        .collect()
}

/// Mean and population standard deviation of per-fold scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldStatistics {
    /// Score of each fold
    pub scores: Vec<f64>,
    pub mean: f64,
    pub std: f64,
}

impl FoldStatistics {
    /// Summarize fold scores; `None` when there are no scores
    pub fn from_scores(scores: Vec<f64>) -> Option<Self> {
        if scores.is_empty() {
            return None;
        }
        let n = scores.len() as f64;
        let mean = scores.iter().sum::<f64>() / n;
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;

        Some(Self {
            scores,
            mean,
            std: variance.sqrt(),
        })
    }

    pub fn n_folds(&self) -> usize {
        self.scores.len()
    }
}
