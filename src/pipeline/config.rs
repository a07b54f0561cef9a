//! Pipeline configuration

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};
use crate::optimizer::{BoostingSearchSpace, SearchConfig};

/// Configuration for one evaluation run.
///
/// Every field has a default, so a JSON file only needs the overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Feature column names, in model input order
    pub feature_columns: Vec<String>,

    pub target_column: String,

    /// Fraction of rows held out for testing, in (0, 1)
    pub test_fraction: f64,

    /// Seed for the split, the search and cross-validation
    pub random_state: u64,

    /// Folds for both candidate scoring and the final cross-validation
    pub cv_folds: usize,

    /// Fixed binarization threshold; the per-split median when unset
    pub threshold: Option<f64>,

    pub search: SearchConfig,

    pub search_space: BoostingSearchSpace,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            feature_columns: vec![
                "feature_1".to_string(),
                "feature_2".to_string(),
                "feature_3".to_string(),
            ],
            target_column: "target".to_string(),
            test_fraction: 0.3,
            random_state: 42,
            cv_folds: 5,
            threshold: None,
            search: SearchConfig::default(),
            search_space: BoostingSearchSpace::default(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a (possibly partial) configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            EvalError::ConfigError(format!("failed to open {}: {}", path.display(), e))
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            EvalError::ConfigError(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    pub fn with_feature_columns(mut self, columns: Vec<String>) -> Self {
        self.feature_columns = columns;
        self
    }

    pub fn with_target_column(mut self, column: impl Into<String>) -> Self {
        self.target_column = column.into();
        self
    }

    pub fn with_test_fraction(mut self, fraction: f64) -> Self {
        self.test_fraction = fraction;
        self
    }

    /// Set the seed used by every random step of the run
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_threshold(mut self, threshold: Option<f64>) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    pub fn with_search_space(mut self, space: BoostingSearchSpace) -> Self {
        self.search_space = space;
        self
    }

    /// Search settings with the run-level seed and fold count applied
    pub fn effective_search(&self) -> SearchConfig {
        SearchConfig {
            cv_folds: self.cv_folds,
            random_state: self.random_state,
            ..self.search.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.feature_columns.is_empty() {
            return Err(EvalError::ConfigError("no feature columns configured".to_string()));
        }
        if self.target_column.is_empty() {
            return Err(EvalError::ConfigError("target column is empty".to_string()));
        }
        if self.feature_columns.contains(&self.target_column) {
            return Err(EvalError::ConfigError(format!(
                "target column '{}' is also listed as a feature",
                self.target_column
            )));
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(EvalError::InvalidParameter {
                name: "test_fraction".to_string(),
                value: self.test_fraction.to_string(),
                reason: "must be in (0, 1)".to_string(),
            });
        }
        if let Some(t) = self.threshold {
            if !t.is_finite() {
                return Err(EvalError::InvalidParameter {
                    name: "threshold".to_string(),
                    value: t.to_string(),
                    reason: "must be finite".to_string(),
                });
            }
        }
        self.effective_search().validate()?;
        self.search_space.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.feature_columns, vec!["feature_1", "feature_2", "feature_3"]);
        assert_eq!(config.target_column, "target");
        assert_eq!(config.test_fraction, 0.3);
        assert_eq!(config.random_state, 42);
        assert_eq!(config.cv_folds, 5);
        assert!(config.threshold.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_effective_search_uses_run_seed() {
        let config = PipelineConfig::new().with_random_state(7).with_cv_folds(3);
        let search = config.effective_search();
        assert_eq!(search.random_state, 7);
        assert_eq!(search.cv_folds, 3);
        assert_eq!(search.n_iter, config.search.n_iter);
    }

    #[test]
    fn test_validate() {
        assert!(PipelineConfig::new().with_test_fraction(0.0).validate().is_err());
        assert!(PipelineConfig::new().with_test_fraction(1.0).validate().is_err());
        assert!(PipelineConfig::new().with_cv_folds(1).validate().is_err());
        assert!(PipelineConfig::new()
            .with_threshold(Some(f64::NAN))
            .validate()
            .is_err());
        assert!(PipelineConfig::new()
            .with_target_column("feature_1")
            .validate()
            .is_err());
        assert!(PipelineConfig::new().with_feature_columns(vec![]).validate().is_err());
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"target_column": "price", "threshold": 2.5, "search": {{"n_iter": 3}}}}"#
        )
        .unwrap();

        let config = PipelineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.target_column, "price");
        assert_eq!(config.threshold, Some(2.5));
        assert_eq!(config.search.n_iter, 3);
        assert_eq!(config.test_fraction, 0.3);
    }

    #[test]
    fn test_from_missing_file() {
        let result = PipelineConfig::from_json_file("/nonexistent/boosteval.json");
        assert!(matches!(result, Err(EvalError::ConfigError(_))));
    }
}
