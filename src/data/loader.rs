//! CSV loading and column selection

use super::Dataset;
use crate::error::{EvalError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// Loader for delimited tabular files
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Column separator
    delimiter: u8,
    /// Rows used for schema inference
    infer_schema_length: usize,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            infer_schema_length: 1000,
        }
    }

    /// Set the column separator
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Load a delimited file with a header row
    pub fn load_csv(&self, path: &Path) -> Result<DataFrame> {
        if !path.exists() {
            return Err(EvalError::DataError(format!(
                "input file not found: {}",
                path.display()
            )));
        }

        let start = Instant::now();
        let parse_opts = CsvParseOptions::default().with_separator(self.delimiter);

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .with_parse_options(parse_opts)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;

        debug!(
            path = %path.display(),
            rows = df.height(),
            cols = df.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded CSV"
        );

        Ok(df)
    }

    /// Load a file and select the named feature and target columns
    pub fn load_dataset(
        &self,
        path: &Path,
        feature_columns: &[String],
        target_column: &str,
    ) -> Result<Dataset> {
        let df = self.load_csv(path)?;
        dataframe_to_dataset(&df, feature_columns, target_column)
    }
}

/// Extract named columns of a DataFrame into a [`Dataset`]
pub fn dataframe_to_dataset(
    df: &DataFrame,
    feature_columns: &[String],
    target_column: &str,
) -> Result<Dataset> {
    if feature_columns.is_empty() {
        return Err(EvalError::DataError("no feature columns configured".to_string()));
    }
    if feature_columns.iter().any(|c| c == target_column) {
        return Err(EvalError::DataError(format!(
            "target column '{}' is also listed as a feature",
            target_column
        )));
    }
    if df.height() == 0 {
        return Err(EvalError::DataError("input has no rows".to_string()));
    }

    let col_data: Vec<Vec<f64>> = feature_columns
        .iter()
        .map(|name| column_values(df, name))
        .collect::<Result<Vec<_>>>()?;
    let target = Array1::from_vec(column_values(df, target_column)?);

    let n_rows = df.height();
    let x = Array2::from_shape_fn((n_rows, col_data.len()), |(r, c)| col_data[c][r]);

    Dataset::new(x, target, feature_columns.to_vec(), target_column)
}

fn column_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| EvalError::FeatureNotFound(name.to_string()))?;

    let series = column
        .as_materialized_series()
        .cast(&DataType::Float64)
        .map_err(|e| EvalError::DataError(format!("column '{}': {}", name, e)))?;

    if series.null_count() > 0 {
        return Err(EvalError::DataError(format!(
            "column '{}' has {} missing or non-numeric values",
            name,
            series.null_count()
        )));
    }

    let values = series
        .f64()
        .map_err(|e| EvalError::DataError(e.to_string()))?
        .into_no_null_iter()
        .collect();

    Ok(values)
}
