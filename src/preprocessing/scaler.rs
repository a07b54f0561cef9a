//! Feature standardization
//!
//! The scaler is fit on training features only; the resulting
//! [`ScalerState`] is then applied unchanged to every other partition.

use crate::error::{EvalError, Result};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Standard deviations at or below this are treated as zero
const MIN_STD: f64 = 1e-12;

/// Per-feature centering and scaling parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    /// Feature mean
    pub center: f64,
    /// Feature standard deviation, or 1.0 for constant features
    pub scale: f64,
}

/// Fitted standardization state. Read-only after fitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerState {
    params: Vec<ScalerParams>,
    /// Features whose training standard deviation was zero
    constant_features: Vec<usize>,
}

/// Z-score standardizer: `(x - mean) / std`
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardScaler;

impl StandardScaler {
    /// Compute per-feature mean and population standard deviation.
    ///
    /// A feature with zero standard deviation keeps scale 1.0, so it is only
    /// centered and never divided by zero.
    pub fn fit(x: &Array2<f64>) -> Result<ScalerState> {
        if x.nrows() == 0 {
            return Err(EvalError::DataError(
                "cannot fit scaler on zero rows".to_string(),
            ));
        }

        let mut params = Vec::with_capacity(x.ncols());
        let mut constant_features = Vec::new();

        for (idx, col) in x.axis_iter(Axis(1)).enumerate() {
            let center = col.mean().unwrap_or(0.0);
            let std = col.std(0.0);
            let scale = if std.is_finite() && std > MIN_STD {
                std
            } else {
                constant_features.push(idx);
                1.0
            };
            params.push(ScalerParams { center, scale });
        }

        if !constant_features.is_empty() {
            warn!(
                features = ?constant_features,
                "Constant features in training data; centering without scaling"
            );
        }

        Ok(ScalerState {
            params,
            constant_features,
        })
    }

    /// Fit on `x` and return both the state and the transformed matrix
    pub fn fit_transform(x: &Array2<f64>) -> Result<(ScalerState, Array2<f64>)> {
        let state = Self::fit(x)?;
        let scaled = state.transform(x)?;
        Ok((state, scaled))
    }
}

impl ScalerState {
    /// Apply the fitted transform
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_width(x)?;
        let mut out = x.to_owned();
        for (mut col, p) in out.axis_iter_mut(Axis(1)).zip(self.params.iter()) {
            col.mapv_inplace(|v| (v - p.center) / p.scale);
        }
        Ok(out)
    }

    pub fn means(&self) -> Vec<f64> {
        self.params.iter().map(|p| p.center).collect()
    }

    pub fn scales(&self) -> Vec<f64> {
        self.params.iter().map(|p| p.scale).collect()
    }

    pub fn constant_features(&self) -> &[usize] {
        &self.constant_features
    }

    pub fn n_features(&self) -> usize {
        self.params.len()
    }

    fn check_width(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.params.len() {
            return Err(EvalError::ShapeError {
                expected: format!("{} features", self.params.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_standard_scaler() {
        let x = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0], [5.0, 50.0]];
        let (state, scaled) = StandardScaler::fit_transform(&x).unwrap();

        for col in scaled.axis_iter(Axis(1)) {
            assert!(col.mean().unwrap().abs() < 1e-10);
            assert!((col.std(0.0) - 1.0).abs() < 1e-10);
        }
        assert_eq!(state.means(), vec![3.0, 30.0]);
        assert!(state.constant_features().is_empty());
    }

    #[test]
    fn test_constant_feature_is_centered_only() {
        let x = array![[1.0, 7.0], [2.0, 7.0], [3.0, 7.0]];
        let (state, scaled) = StandardScaler::fit_transform(&x).unwrap();

        assert_eq!(state.constant_features(), &[1]);
        assert_eq!(state.scales()[1], 1.0);
        assert!(scaled.column(1).iter().all(|&v| v == 0.0));

        let test = array![[2.0, 9.0]];
        let scaled_test = state.transform(&test).unwrap();
        assert_eq!(scaled_test[[0, 1]], 2.0);
        assert!(scaled_test.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_transform_does_not_refit() {
        let train = array![[0.0], [2.0], [4.0]];
        let state = StandardScaler::fit(&train).unwrap();
        let before = state.clone();

        let test = array![[100.0], [200.0]];
        let scaled = state.transform(&test).unwrap();

        assert_eq!(state, before);
        let expected = (100.0 - 2.0) / state.scales()[0];
        assert!((scaled[[0, 0]] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_width_mismatch() {
        let state = StandardScaler::fit(&array![[1.0, 2.0], [3.0, 4.0]]).unwrap();
        assert!(matches!(
            state.transform(&array![[1.0]]),
            Err(EvalError::ShapeError { .. })
        ));
    }
}
