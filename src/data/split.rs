//! Seeded train/test partitioning

use super::Dataset;
use crate::error::{EvalError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Disjoint train/test partition of a dataset
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train: Dataset,
    pub test: Dataset,
    /// Row indices of the source dataset assigned to train
    pub train_indices: Vec<usize>,
    /// Row indices of the source dataset assigned to test
    pub test_indices: Vec<usize>,
}

/// Partition `dataset` into train and test sets.
///
/// The test set receives `ceil(n * test_fraction)` rows drawn from a seeded
/// permutation; the same seed and dataset always yield the same partition.
pub fn train_test_split(dataset: &Dataset, test_fraction: f64, seed: u64) -> Result<TrainTestSplit> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(EvalError::InvalidParameter {
            name: "test_fraction".to_string(),
            value: test_fraction.to_string(),
            reason: "must be strictly between 0 and 1".to_string(),
        });
    }

    let n_samples = dataset.n_samples();
    // Tolerance keeps products like 30 * 0.1 from rounding up to 4
    let n_test = (n_samples as f64 * test_fraction - 1e-9).ceil() as usize;
    let n_train = n_samples.saturating_sub(n_test);

    if n_test == 0 || n_train == 0 {
        return Err(EvalError::DataError(format!(
            "cannot split {} rows with test fraction {}: train has {} rows, test has {}",
            n_samples, test_fraction, n_train, n_test
        )));
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test_indices = indices[..n_test].to_vec();
    let train_indices = indices[n_test..].to_vec();

    Ok(TrainTestSplit {
        train: dataset.select(&train_indices)?,
        test: dataset.select(&test_indices)?,
        train_indices,
        test_indices,
    })
}
