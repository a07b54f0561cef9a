//! Median-split binarization of continuous predictions

use crate::error::{EvalError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Where a binarization threshold came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdSource {
    /// Median of the split's actual values
    Median,
    /// Supplied by configuration
    Override,
}

/// Binary view of an (actual, predicted) series
#[derive(Debug, Clone, PartialEq)]
pub struct BinarizedPair {
    pub actual: Array1<u8>,
    pub predicted: Array1<u8>,
    pub threshold: f64,
    pub source: ThresholdSource,
}

/// Median with the interpolated midpoint for even lengths
pub fn median(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(EvalError::MetricError("median of an empty series".to_string()));
    }
    if values.iter().any(|v| v.is_nan()) {
        return Err(EvalError::MetricError("median of a series containing NaN".to_string()));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;

    Ok(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

/// Label 1 when the value is strictly greater than `threshold`, else 0
pub fn labels(values: &Array1<f64>, threshold: f64) -> Array1<u8> {
    values.mapv(|v| u8::from(v > threshold))
}

/// Binarize both series against one threshold.
///
/// Without an override the threshold is the median of `actual`.
pub fn binarize(
    actual: &Array1<f64>,
    predicted: &Array1<f64>,
    threshold: Option<f64>,
) -> Result<BinarizedPair> {
    if actual.len() != predicted.len() {
        return Err(EvalError::MetricError(format!(
            "actual has {} values, predicted has {}",
            actual.len(),
            predicted.len()
        )));
    }

    let (threshold, source) = match threshold {
        Some(t) if t.is_finite() => (t, ThresholdSource::Override),
        Some(t) => {
            return Err(EvalError::InvalidParameter {
                name: "threshold".to_string(),
                value: t.to_string(),
                reason: "must be finite".to_string(),
            })
        }
        None => (median(&actual.to_vec())?, ThresholdSource::Median),
    };

    Ok(BinarizedPair {
        actual: labels(actual, threshold),
        predicted: labels(predicted, threshold),
        threshold,
        source,
    })
}
