//! Regression and classification metrics

use crate::error::{EvalError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Regression metrics of one prediction series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Root mean squared error
    pub rmse: f64,
    /// Mean absolute error
    pub mae: f64,
    /// Coefficient of determination; `None` when the actual values have zero variance
    pub r2: Option<f64>,
    pub n_samples: usize,
}

impl RegressionMetrics {
    pub fn compute(actual: &Array1<f64>, predicted: &Array1<f64>) -> Result<Self> {
        check_pair(actual, predicted)?;
        Ok(Self {
            rmse: mean_squared_error(actual, predicted)?.sqrt(),
            mae: mean_absolute_error(actual, predicted)?,
            r2: r2_score(actual, predicted)?,
            n_samples: actual.len(),
        })
    }
}

fn check_pair(actual: &Array1<f64>, predicted: &Array1<f64>) -> Result<()> {
    if actual.len() != predicted.len() {
        return Err(EvalError::MetricError(format!(
            "actual has {} values, predicted has {}",
            actual.len(),
            predicted.len()
        )));
    }
    if actual.is_empty() {
        return Err(EvalError::MetricError("empty prediction series".to_string()));
    }
    if actual.iter().chain(predicted.iter()).any(|v| !v.is_finite()) {
        return Err(EvalError::MetricError("non-finite value in prediction series".to_string()));
    }
    Ok(())
}

pub fn mean_squared_error(actual: &Array1<f64>, predicted: &Array1<f64>) -> Result<f64> {
    check_pair(actual, predicted)?;
    let sum: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    Ok(sum / actual.len() as f64)
}

pub fn root_mean_squared_error(actual: &Array1<f64>, predicted: &Array1<f64>) -> Result<f64> {
    mean_squared_error(actual, predicted).map(f64::sqrt)
}

pub fn mean_absolute_error(actual: &Array1<f64>, predicted: &Array1<f64>) -> Result<f64> {
    check_pair(actual, predicted)?;
    let sum: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).abs())
        .sum();
    Ok(sum / actual.len() as f64)
}

/// `1 - SS_res / SS_tot`, or `None` when `SS_tot` is zero
pub fn r2_score(actual: &Array1<f64>, predicted: &Array1<f64>) -> Result<Option<f64>> {
    check_pair(actual, predicted)?;

    let first = actual[0];
    if actual.iter().all(|&v| v == first) {
        return Ok(None);
    }

    let n = actual.len() as f64;
    let mean = actual.sum() / n;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    if ss_tot <= 0.0 {
        return Ok(None);
    }
    let ss_res: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum();

    Ok(Some(1.0 - ss_res / ss_tot))
}

/// Binary confusion counts with 1 as the positive class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl ConfusionMatrix {
    pub fn from_labels(actual: &Array1<u8>, predicted: &Array1<u8>) -> Result<Self> {
        if actual.len() != predicted.len() {
            return Err(EvalError::MetricError(format!(
                "actual has {} labels, predicted has {}",
                actual.len(),
                predicted.len()
            )));
        }
        if actual.is_empty() {
            return Err(EvalError::MetricError("empty label series".to_string()));
        }

        let mut cm = Self::default();
        for (&t, &p) in actual.iter().zip(predicted.iter()) {
            match (t == 1, p == 1) {
                (true, true) => cm.true_positives += 1,
                (false, true) => cm.false_positives += 1,
                (false, false) => cm.true_negatives += 1,
                (true, false) => cm.false_negatives += 1,
            }
        }
        Ok(cm)
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }
}

/// Classification metrics of a binarized prediction series.
///
/// Any metric whose denominator is zero is reported as 0.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub confusion: ConfusionMatrix,
}

impl ClassificationMetrics {
    pub fn compute(actual: &Array1<u8>, predicted: &Array1<u8>) -> Result<Self> {
        let cm = ConfusionMatrix::from_labels(actual, predicted)?;
        let tp = cm.true_positives as f64;

        let accuracy = ratio((cm.true_positives + cm.true_negatives) as f64, cm.total() as f64);
        let precision = ratio(tp, (cm.true_positives + cm.false_positives) as f64);
        let recall = ratio(tp, (cm.true_positives + cm.false_negatives) as f64);
        let f1 = ratio(2.0 * precision * recall, precision + recall);

        Ok(Self {
            accuracy,
            precision,
            recall,
            f1,
            confusion: cm,
        })
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_perfect_fit() {
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0];
        let m = RegressionMetrics::compute(&y, &y).unwrap();
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.r2, Some(1.0));
        assert_eq!(m.n_samples, 5);
    }

    #[test]
    fn test_regression_metrics() {
        let y_true = array![3.0, -0.5, 2.0, 7.0];
        let y_pred = array![2.5, 0.0, 2.0, 8.0];

        let m = RegressionMetrics::compute(&y_true, &y_pred).unwrap();
        assert!((m.rmse - 0.375f64.sqrt()).abs() < 1e-12);
        assert!((m.mae - 0.5).abs() < 1e-12);
        assert!((m.r2.unwrap() - 0.948_608_137_044_967_9).abs() < 1e-12);
    }

    #[test]
    fn test_r2_undefined_for_constant_actuals() {
        let y_true = array![0.1, 0.1, 0.1];
        let y_pred = array![0.0, 0.2, 0.1];
        assert_eq!(r2_score(&y_true, &y_pred).unwrap(), None);

        let m = RegressionMetrics::compute(&y_true, &y_pred).unwrap();
        assert!(m.r2.is_none());
        assert!(m.rmse.is_finite());
    }

    #[test]
    fn test_length_mismatch() {
        let result = RegressionMetrics::compute(&array![1.0, 2.0], &array![1.0]);
        assert!(matches!(result, Err(EvalError::MetricError(_))));
        let empty = Array1::<f64>::zeros(0);
        assert!(mean_absolute_error(&empty, &empty).is_err());
    }

    #[test]
    fn test_classification_metrics() {
        let y_true = array![1u8, 0, 1, 1, 0, 1, 0, 0];
        let y_pred = array![1u8, 0, 1, 0, 0, 1, 1, 0];

        let m = ClassificationMetrics::compute(&y_true, &y_pred).unwrap();
        assert_eq!(m.confusion.true_positives, 3);
        assert_eq!(m.confusion.false_positives, 1);
        assert_eq!(m.confusion.false_negatives, 1);
        assert_eq!(m.accuracy, 0.75);
        assert_eq!(m.precision, 0.75);
        assert_eq!(m.recall, 0.75);
        assert!((m.f1 - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_zero_division_policy() {
        let y_true = array![1u8, 1, 0, 0];
        let y_pred = array![0u8, 0, 0, 0];

        let m = ClassificationMetrics::compute(&y_true, &y_pred).unwrap();
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.f1, 0.0);
        assert_eq!(m.accuracy, 0.5);
    }

    #[test]
    fn test_no_actual_positives() {
        let y_true = array![0u8, 0, 0];
        let y_pred = array![0u8, 0, 0];

        let m = ClassificationMetrics::compute(&y_true, &y_pred).unwrap();
        assert_eq!(m.accuracy, 1.0);
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.precision, 0.0);
    }
}
