//! Gradient boosting regressor
//!
//! Least-squares gradient boosting over [`DecisionTree`] base learners with
//! optional row subsampling (stochastic gradient boosting).

use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::decision_tree::DecisionTree;
use super::models::Estimator;
use crate::error::{EvalError, Result};

/// Gradient boosting hyperparameters.
///
/// Every field has a closed legal domain, checked by [`validate`](Self::validate).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientBoostingConfig {
    /// Number of boosting rounds (trees), >= 1
    pub n_estimators: usize,
    /// Shrinkage applied to each tree, in (0, 1]
    pub learning_rate: f64,
    /// Maximum tree depth, >= 1
    pub max_depth: usize,
    /// Minimum samples required to split a node, >= 2
    pub min_samples_split: usize,
    /// Minimum samples per leaf, >= 1
    pub min_samples_leaf: usize,
    /// Fraction of rows drawn for each tree, in (0, 1]
    pub subsample: f64,
    /// Random seed
    pub random_state: Option<u64>,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_split: 2,
            min_samples_leaf: 1,
            subsample: 1.0,
            random_state: Some(42),
        }
    }
}

impl GradientBoostingConfig {
    /// Check every hyperparameter against its legal domain
    pub fn validate(&self) -> Result<()> {
        fn invalid(name: &str, value: impl ToString, reason: &str) -> EvalError {
            EvalError::InvalidParameter {
                name: name.to_string(),
                value: value.to_string(),
                reason: reason.to_string(),
            }
        }

        if self.n_estimators == 0 {
            return Err(invalid("n_estimators", self.n_estimators, "must be at least 1"));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(invalid("learning_rate", self.learning_rate, "must be in (0, 1]"));
        }
        if self.max_depth == 0 {
            return Err(invalid("max_depth", self.max_depth, "must be at least 1"));
        }
        if self.min_samples_split < 2 {
            return Err(invalid("min_samples_split", self.min_samples_split, "must be at least 2"));
        }
        if self.min_samples_leaf == 0 {
            return Err(invalid("min_samples_leaf", self.min_samples_leaf, "must be at least 1"));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(invalid("subsample", self.subsample, "must be in (0, 1]"));
        }
        Ok(())
    }
}

/// Gradient Boosting Regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    config: GradientBoostingConfig,
    trees: Vec<DecisionTree>,
    initial_prediction: f64,
    feature_importances: Vec<f64>,
    n_features: Option<usize>,
}

impl GradientBoostingRegressor {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            initial_prediction: 0.0,
            feature_importances: Vec::new(),
            n_features: None,
        }
    }

    pub fn config(&self) -> &GradientBoostingConfig {
        &self.config
    }

    /// Fit the gradient boosting model
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.config.validate()?;

        let n_samples = x.nrows();
        let n_features = x.ncols();
        if n_samples != y.len() {
            return Err(EvalError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(EvalError::TrainingError("no training samples".to_string()));
        }
        if y.iter().any(|v| !v.is_finite()) {
            return Err(EvalError::TrainingError("target contains non-finite values".to_string()));
        }

        self.trees.clear();
        self.initial_prediction = y.mean().unwrap_or(0.0);
        let mut predictions = Array1::from_elem(n_samples, self.initial_prediction);

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        self.feature_importances = vec![0.0; n_features];

        for _ in 0..self.config.n_estimators {
            // Negative gradient of squared loss
            let residuals: Array1<f64> = if n_samples > 10000 {
                let preds = &predictions;
                let res: Vec<f64> = (0..n_samples)
                    .into_par_iter()
                    .map(|i| y[i] - preds[i])
                    .collect();
                Array1::from_vec(res)
            } else {
                y.iter()
                    .zip(predictions.iter())
                    .map(|(yi, pi)| yi - pi)
                    .collect()
            };

            let sample_indices = self.subsample_indices(n_samples, &mut rng);
            let x_sub = x.select(Axis(0), &sample_indices);
            let y_sub = residuals.select(Axis(0), &sample_indices);

            let mut tree = DecisionTree::new()
                .with_max_depth(self.config.max_depth)
                .with_min_samples_split(self.config.min_samples_split)
                .with_min_samples_leaf(self.config.min_samples_leaf);
            tree.fit(&x_sub, &y_sub)?;

            // Out-of-bag rows are updated too
            let tree_pred = tree.predict(x)?;
            predictions.scaled_add(self.config.learning_rate, &tree_pred);

            if let Some(tree_importance) = tree.feature_importances() {
                for (acc, imp) in self.feature_importances.iter_mut().zip(tree_importance.iter()) {
                    *acc += imp;
                }
            }

            self.trees.push(tree);
        }

        if predictions.iter().any(|p| !p.is_finite()) {
            return Err(EvalError::TrainingError(
                "boosting diverged to non-finite predictions".to_string(),
            ));
        }

        let total: f64 = self.feature_importances.iter().sum();
        if total > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= total;
            }
        }

        self.n_features = Some(n_features);
        Ok(())
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let n_features = self.n_features.ok_or(EvalError::ModelNotFitted)?;
        if x.ncols() != n_features {
            return Err(EvalError::ShapeError {
                expected: format!("{} features", n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let mut predictions = Array1::from_elem(x.nrows(), self.initial_prediction);
        for tree in &self.trees {
            let tree_pred = tree.predict(x)?;
            predictions.scaled_add(self.config.learning_rate, &tree_pred);
        }

        Ok(predictions)
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    fn subsample_indices(&self, n: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        if self.config.subsample >= 1.0 {
            return (0..n).collect();
        }
        let sample_size = ((n as f64) * self.config.subsample).ceil().max(1.0) as usize;
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(rng);
        indices.truncate(sample_size);
        indices.sort_unstable();
        indices
    }
}

impl Estimator for GradientBoostingRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        GradientBoostingRegressor::fit(self, x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        GradientBoostingRegressor::predict(self, x)
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.n_features
            .map(|_| Array1::from_vec(self.feature_importances.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_regression_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec((100, 2), (0..200).map(|i| i as f64 * 0.1).collect()).unwrap();

        let y: Array1<f64> = x
            .rows()
            .into_iter()
            .map(|row| row[0] * 2.0 + row[1] * 0.5 + 1.0)
            .collect();

        (x, y)
    }

    #[test]
    fn test_gradient_boosting_regressor() {
        let (x, y) = create_regression_data();
        let config = GradientBoostingConfig {
            n_estimators: 10,
            max_depth: 3,
            learning_rate: 0.1,
            ..Default::default()
        };

        let mut model = GradientBoostingRegressor::new(config);
        model.fit(&x, &y).unwrap();

        let predictions = model.predict(&x).unwrap();
        assert_eq!(predictions.len(), 100);

        let mse: f64 = y
            .iter()
            .zip(predictions.iter())
            .map(|(yi, pi)| (yi - pi).powi(2))
            .sum::<f64>()
            / y.len() as f64;

        let y_var = y.var(0.0);
        assert!(mse < y_var, "MSE ({}) should be less than variance ({})", mse, y_var);
    }

    #[test]
    fn test_more_rounds_fit_better() {
        let (x, y) = create_regression_data();
        let mse_for = |n_estimators| {
            let mut model = GradientBoostingRegressor::new(GradientBoostingConfig {
                n_estimators,
                ..Default::default()
            });
            model.fit(&x, &y).unwrap();
            let p = model.predict(&x).unwrap();
            (&y - &p).mapv(|e| e * e).mean().unwrap()
        };
        assert!(mse_for(50) < mse_for(5));
    }

    #[test]
    fn test_seeded_subsample_is_deterministic() {
        let (x, y) = create_regression_data();
        let config = GradientBoostingConfig {
            n_estimators: 20,
            subsample: 0.5,
            random_state: Some(3),
            ..Default::default()
        };

        let mut a = GradientBoostingRegressor::new(config.clone());
        let mut b = GradientBoostingRegressor::new(config);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_feature_importances() {
        let (x, y) = create_regression_data();
        let config = GradientBoostingConfig {
            n_estimators: 10,
            ..Default::default()
        };

        let mut model = GradientBoostingRegressor::new(config);
        model.fit(&x, &y).unwrap();

        let importances = model.feature_importances();
        assert_eq!(importances.len(), 2);

        let sum: f64 = importances.iter().sum();
        assert!((sum - 1.0).abs() < 0.01, "Sum of importances ({}) should be ~1", sum);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            GradientBoostingConfig { n_estimators: 0, ..Default::default() },
            GradientBoostingConfig { learning_rate: 1.5, ..Default::default() },
            GradientBoostingConfig { max_depth: 0, ..Default::default() },
            GradientBoostingConfig { min_samples_split: 1, ..Default::default() },
            GradientBoostingConfig { min_samples_leaf: 0, ..Default::default() },
            GradientBoostingConfig { subsample: 0.0, ..Default::default() },
            GradientBoostingConfig { learning_rate: f64::NAN, ..Default::default() },
        ];
        for config in &bad {
            assert!(config.validate().is_err(), "{:?} should be rejected", config);
        }
        assert!(GradientBoostingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_predict_before_fit() {
        let model = GradientBoostingRegressor::new(GradientBoostingConfig::default());
        assert!(matches!(
            model.predict(&Array2::zeros((1, 2))),
            Err(EvalError::ModelNotFitted)
        ));
    }
}
