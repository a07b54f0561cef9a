//! Error types for the boosteval pipeline

use thiserror::Error;

/// Result type alias for boosteval operations
pub type Result<T> = std::result::Result<T, EvalError>;

/// Main error type for the evaluation pipeline
#[derive(Error, Debug)]
pub enum EvalError {
    /// Malformed input, missing columns, empty partitions. Fatal.
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Training error: {0}")]
    TrainingError(String),

    /// The hyperparameter search could not complete. Recovered by the
    /// default-parameter fallback.
    #[error("Search error: {0}")]
    SearchError(String),

    /// Metric inputs were unusable (length mismatch, empty series, NaN).
    #[error("Metric error: {0}")]
    MetricError(String),

    /// Printing or plotting failed. Never propagated out of the pipeline.
    #[error("Presentation error: {0}")]
    PresentationError(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<polars::error::PolarsError> for EvalError {
    fn from(err: polars::error::PolarsError) -> Self {
        EvalError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for EvalError {
    fn from(err: serde_json::Error) -> Self {
        EvalError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for EvalError {
    fn from(err: ndarray::ShapeError) -> Self {
        EvalError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
