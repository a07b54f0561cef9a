//! Estimator traits

use super::gradient_boosting::{GradientBoostingConfig, GradientBoostingRegressor};
use crate::error::Result;
use ndarray::{Array1, Array2};

/// A regression model with fit/predict capability.
///
/// The search and evaluation layers treat implementors as black boxes.
pub trait Estimator: Send + Sync + std::fmt::Debug {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Make predictions
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Get feature importances (if available)
    fn feature_importances(&self) -> Option<Array1<f64>> {
        None
    }
}

/// Builds fresh, unfitted estimators for a hyperparameter set.
///
/// Shared read-only across parallel search workers.
pub trait ModelFactory: Send + Sync {
    fn build(&self, params: &GradientBoostingConfig) -> Result<Box<dyn Estimator>>;
}

/// Factory for [`GradientBoostingRegressor`].
///
/// A seed carried by the parameters wins; the factory seed only fills in
/// parameters that have none.
#[derive(Debug, Clone)]
pub struct GradientBoostingFactory {
    random_state: Option<u64>,
}

impl GradientBoostingFactory {
    pub fn new(random_state: Option<u64>) -> Self {
        Self { random_state }
    }
}

impl ModelFactory for GradientBoostingFactory {
    fn build(&self, params: &GradientBoostingConfig) -> Result<Box<dyn Estimator>> {
        let config = GradientBoostingConfig {
            random_state: params.random_state.or(self.random_state),
            ..params.clone()
        };
        config.validate()?;
        Ok(Box::new(GradientBoostingRegressor::new(config)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_factory_builds_unfitted_model() {
        let factory = GradientBoostingFactory::new(Some(7));
        let model = factory.build(&GradientBoostingConfig::default()).unwrap();
        assert!(model.predict(&array![[1.0]]).is_err());
    }

    #[test]
    fn test_factory_keeps_parameter_seed() {
        let x = ndarray::Array2::from_shape_fn((40, 2), |(r, c)| ((r * (c + 2)) % 9) as f64);
        let y: Array1<f64> = x.rows().into_iter().map(|r| r[0] - 0.5 * r[1]).collect();
        let params = GradientBoostingConfig {
            n_estimators: 10,
            subsample: 0.5,
            random_state: Some(3),
            ..Default::default()
        };

        let fit = |factory: GradientBoostingFactory| {
            let mut model = factory.build(&params).unwrap();
            model.fit(&x, &y).unwrap();
            model.predict(&x).unwrap()
        };
        assert_eq!(fit(GradientBoostingFactory::new(Some(7))), fit(GradientBoostingFactory::new(Some(3))));
        assert_eq!(fit(GradientBoostingFactory::new(None)), fit(GradientBoostingFactory::new(Some(3))));
    }

    #[test]
    fn test_factory_rejects_invalid_params() {
        let factory = GradientBoostingFactory::new(Some(7));
        let params = GradientBoostingConfig {
            learning_rate: 0.0,
            ..Default::default()
        };
        assert!(factory.build(&params).is_err());
    }
}
