//! Immutable metrics report

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::evaluator::{Evaluation, SplitEvaluation};
use crate::training::FoldStatistics;

/// A single reported metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Scalar(f64),
    /// Mean and population standard deviation across folds
    Summary { mean: f64, std: f64 },
    /// The metric has no defined value, e.g. R² of a constant series
    Undefined,
}

impl MetricValue {
    pub fn scalar(&self) -> Option<f64> {
        match self {
            MetricValue::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, MetricValue::Undefined)
    }
}

impl From<Option<f64>> for MetricValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(MetricValue::Undefined, MetricValue::Scalar)
    }
}

impl From<&FoldStatistics> for MetricValue {
    fn from(stats: &FoldStatistics) -> Self {
        MetricValue::Summary {
            mean: stats.mean,
            std: stats.std,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Scalar(v) => write!(f, "{:.4}", v),
            MetricValue::Summary { mean, std } => write!(f, "{:.4} ± {:.4}", mean, std),
            MetricValue::Undefined => write!(f, "undefined"),
        }
    }
}

/// Metric name to value, plus free-form annotations.
///
/// Names are `<partition>.<metric>`, with partitions `train`, `test` and `cv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    metrics: BTreeMap<String, MetricValue>,
    annotations: Vec<String>,
}

impl MetricsReport {
    pub fn from_evaluation(evaluation: &Evaluation) -> Self {
        let mut metrics = BTreeMap::new();
        insert_split(&mut metrics, "train", &evaluation.train);
        insert_split(&mut metrics, "test", &evaluation.test);

        match &evaluation.cross_validation {
            Some(cv) => {
                metrics.insert("cv.rmse".to_string(), MetricValue::from(&cv.rmse));
                metrics.insert("cv.mae".to_string(), MetricValue::from(&cv.mae));
                metrics.insert(
                    "cv.r2".to_string(),
                    cv.r2.as_ref().map_or(MetricValue::Undefined, MetricValue::from),
                );
            }
            None => {
                for name in ["cv.rmse", "cv.mae", "cv.r2"] {
                    metrics.insert(name.to_string(), MetricValue::Undefined);
                }
            }
        }

        Self {
            metrics,
            annotations: evaluation.annotations.clone(),
        }
    }

    /// Prepend annotations raised before evaluation (search, scaling)
    pub fn with_annotations(mut self, annotations: impl IntoIterator<Item = String>) -> Self {
        let mut all: Vec<String> = annotations.into_iter().collect();
        all.append(&mut self.annotations);
        self.annotations = all;
        self
    }

    pub fn get(&self, name: &str) -> Option<&MetricValue> {
        self.metrics.get(name)
    }

    pub fn metrics(&self) -> &BTreeMap<String, MetricValue> {
        &self.metrics
    }

    pub fn annotations(&self) -> &[String] {
        &self.annotations
    }

    /// Metrics of one partition, with the partition prefix stripped
    pub fn partition<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a MetricValue)> + 'a {
        self.metrics.iter().filter_map(move |(name, value)| {
            name.strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix('.'))
                .map(|metric| (metric, value))
        })
    }
}

fn insert_split(metrics: &mut BTreeMap<String, MetricValue>, prefix: &str, split: &SplitEvaluation) {
    let r = &split.regression;
    let c = &split.classification;
    let entries = [
        ("rmse", MetricValue::Scalar(r.rmse)),
        ("mae", MetricValue::Scalar(r.mae)),
        ("r2", MetricValue::from(r.r2)),
        ("accuracy", MetricValue::Scalar(c.accuracy)),
        ("precision", MetricValue::Scalar(c.precision)),
        ("recall", MetricValue::Scalar(c.recall)),
        ("f1", MetricValue::Scalar(c.f1)),
        ("threshold", MetricValue::Scalar(split.threshold)),
    ];
    for (name, value) in entries {
        metrics.insert(format!("{}.{}", prefix, name), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::binarize::ThresholdSource;
    use crate::evaluation::evaluator::{CrossValidationSummary, PredictionSeries};
    use crate::evaluation::metrics::{ClassificationMetrics, ConfusionMatrix, RegressionMetrics};

    fn split(r2: Option<f64>, threshold: f64) -> SplitEvaluation {
        SplitEvaluation {
            regression: RegressionMetrics {
                rmse: 0.5,
                mae: 0.4,
                r2,
                n_samples: 2,
            },
            classification: ClassificationMetrics {
                accuracy: 1.0,
                precision: 1.0,
                recall: 1.0,
                f1: 1.0,
                confusion: ConfusionMatrix::default(),
            },
            threshold,
            threshold_source: ThresholdSource::Median,
            predictions: PredictionSeries {
                actual: vec![1.0, 2.0],
                predicted: vec![1.5, 1.5],
                residual: vec![-0.5, 0.5],
            },
        }
    }

    #[test]
    fn test_report_keys() {
        let evaluation = Evaluation {
            train: split(Some(0.9), 1.5),
            test: split(None, 2.5),
            cross_validation: Some(CrossValidationSummary {
                rmse: FoldStatistics::from_scores(vec![1.0, 3.0]).unwrap(),
                mae: FoldStatistics::from_scores(vec![1.0, 1.0]).unwrap(),
                r2: None,
                n_folds: 2,
                undefined_r2_folds: 2,
            }),
            annotations: vec!["test.r2 undefined".to_string()],
        };

        let report = MetricsReport::from_evaluation(&evaluation)
            .with_annotations(vec!["search fell back".to_string()]);

        assert_eq!(report.get("train.r2"), Some(&MetricValue::Scalar(0.9)));
        assert!(report.get("test.r2").unwrap().is_undefined());
        assert_eq!(report.get("train.threshold").and_then(|v| v.scalar()), Some(1.5));
        assert_eq!(report.get("test.threshold").and_then(|v| v.scalar()), Some(2.5));
        assert_eq!(
            report.get("cv.rmse"),
            Some(&MetricValue::Summary { mean: 2.0, std: 1.0 })
        );
        assert!(report.get("cv.r2").unwrap().is_undefined());
        assert_eq!(report.annotations()[0], "search fell back");
        assert_eq!(report.annotations().len(), 2);
        assert_eq!(report.partition("cv").count(), 3);
        assert_eq!(report.partition("train").count(), 8);
    }

    #[test]
    fn test_metric_value_display_and_json() {
        assert_eq!(MetricValue::Scalar(0.5).to_string(), "0.5000");
        assert_eq!(MetricValue::Undefined.to_string(), "undefined");

        let json = serde_json::to_string(&MetricValue::Undefined).unwrap();
        assert_eq!(json, "null");
        let back: MetricValue = serde_json::from_str(r#"{"mean":1.0,"std":0.0}"#).unwrap();
        assert_eq!(back, MetricValue::Summary { mean: 1.0, std: 0.0 });
    }
}
