//! Search configuration

use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the two-stage hyperparameter search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Random combinations drawn in the coarse stage
    pub n_iter: usize,

    /// Cross-validation folds used to score each candidate
    pub cv_folds: usize,

    /// Seed for candidate sampling and fold assignment
    pub random_state: u64,

    /// Worker threads for candidate evaluation (0 = all cores)
    pub n_jobs: usize,

    /// Increment offered for `n_estimators` during refinement
    pub n_estimators_step: usize,

    /// Upper bound on refined `n_estimators`
    pub max_n_estimators: usize,

    /// Upper bound on refined `max_depth`
    pub max_depth_cap: usize,

    /// Whether to run the refinement grid at all
    pub refine: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            n_iter: 20,
            cv_folds: 5,
            random_state: 42,
            n_jobs: 0,
            n_estimators_step: 50,
            max_n_estimators: 500,
            max_depth_cap: 8,
            refine: true,
        }
    }
}

impl SearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the coarse sample count
    pub fn with_n_iter(mut self, n: usize) -> Self {
        self.n_iter = n;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Builder method to bound parallelism
    pub fn with_n_jobs(mut self, n: usize) -> Self {
        self.n_jobs = n;
        self
    }

    pub fn with_refine(mut self, refine: bool) -> Self {
        self.refine = refine;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_iter == 0 {
            return Err(EvalError::ConfigError("search n_iter must be at least 1".to_string()));
        }
        if self.cv_folds < 2 {
            return Err(EvalError::ConfigError("search cv_folds must be at least 2".to_string()));
        }
        if self.max_n_estimators == 0 || self.max_depth_cap == 0 {
            return Err(EvalError::ConfigError(
                "refinement caps must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
