//! Integration test: splitting, scaling, cross-validation and metric properties

use ndarray::{array, Array1, Array2, Axis};

use boosteval::data::{train_test_split, Dataset};
use boosteval::evaluation::{binarize, ClassificationMetrics, RegressionMetrics, ThresholdSource};
use boosteval::preprocessing::StandardScaler;
use boosteval::training::KFold;

fn dataset(n: usize) -> Dataset {
    let x = Array2::from_shape_fn((n, 3), |(r, c)| (r * 10 + c) as f64);
    let y = Array1::from_shape_fn(n, |i| i as f64);
    Dataset::new(
        x,
        y,
        vec!["feature_1".into(), "feature_2".into(), "feature_3".into()],
        "target",
    )
    .unwrap()
}

#[test]
fn test_split_sizes_and_disjointness() {
    let split = train_test_split(&dataset(10), 0.3, 42).unwrap();
    assert_eq!(split.test.n_samples(), 3);
    assert_eq!(split.train.n_samples(), 7);

    let mut all: Vec<usize> = split
        .train_indices
        .iter()
        .chain(split.test_indices.iter())
        .copied()
        .collect();
    all.sort_unstable();
    assert_eq!(all, (0..10).collect::<Vec<_>>());
}

#[test]
fn test_split_rounds_test_size_up() {
    let split = train_test_split(&dataset(11), 0.3, 0).unwrap();
    assert_eq!(split.test.n_samples(), 4);
    assert_eq!(split.train.n_samples(), 7);

    let exact = train_test_split(&dataset(30), 0.1, 0).unwrap();
    assert_eq!(exact.test.n_samples(), 3);
}

#[test]
fn test_split_is_seeded() {
    let d = dataset(25);
    let a = train_test_split(&d, 0.3, 5).unwrap();
    let b = train_test_split(&d, 0.3, 5).unwrap();
    let c = train_test_split(&d, 0.3, 6).unwrap();
    assert_eq!(a.test_indices, b.test_indices);
    assert_ne!(a.test_indices, c.test_indices);
}

#[test]
fn test_split_too_small() {
    assert!(train_test_split(&dataset(1), 0.3, 42).is_err());
}

#[test]
fn test_scaling_uses_training_statistics_only() {
    let split = train_test_split(&dataset(20), 0.3, 42).unwrap();
    let (state, train_scaled) = StandardScaler::fit_transform(split.train.features()).unwrap();
    let test_scaled = state.transform(split.test.features()).unwrap();

    for col in train_scaled.axis_iter(Axis(1)) {
        assert!(col.mean().unwrap().abs() < 1e-9);
        assert!((col.std(0.0) - 1.0).abs() < 1e-9);
    }

    let train_means = split.train.features().mean_axis(Axis(0)).unwrap();
    for (c, mean) in train_means.iter().enumerate() {
        assert_eq!(state.means()[c], *mean);
        let expected = (split.test.features()[[0, c]] - mean) / state.scales()[c];
        assert!((test_scaled[[0, c]] - expected).abs() < 1e-12);
    }
}

#[test]
fn test_kfold_is_deterministic_and_partitions() {
    let a = KFold::new(5).with_random_state(42).split(37).unwrap();
    let b = KFold::new(5).with_random_state(42).split(37).unwrap();
    assert_eq!(a, b);

    let mut seen: Vec<usize> = a.iter().flat_map(|s| s.test_indices.clone()).collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..37).collect::<Vec<_>>());
}

#[test]
fn test_median_threshold() {
    let actual = array![1.0, 2.0, 3.0, 4.0, 5.0];
    let pair = binarize(&actual, &actual, None).unwrap();
    assert_eq!(pair.threshold, 3.0);
    assert_eq!(pair.source, ThresholdSource::Median);
    assert_eq!(pair.actual, array![0u8, 0, 0, 1, 1]);
}

#[test]
fn test_perfect_fit_metrics() {
    let y = array![0.5, 1.5, 2.5, 10.0];
    let reg = RegressionMetrics::compute(&y, &y).unwrap();
    assert_eq!(reg.rmse, 0.0);
    assert_eq!(reg.mae, 0.0);
    assert_eq!(reg.r2, Some(1.0));

    let pair = binarize(&y, &y, None).unwrap();
    let cls = ClassificationMetrics::compute(&pair.actual, &pair.predicted).unwrap();
    assert_eq!(cls.accuracy, 1.0);
    assert_eq!(cls.precision, 1.0);
    assert_eq!(cls.recall, 1.0);
    assert_eq!(cls.f1, 1.0);
}

#[test]
fn test_constant_actuals_give_undefined_r2() {
    let actual = array![3.0, 3.0, 3.0, 3.0];
    let predicted = array![2.0, 3.0, 4.0, 3.0];
    let reg = RegressionMetrics::compute(&actual, &predicted).unwrap();
    assert!(reg.r2.is_none());
    assert!(reg.rmse.is_finite());
    assert!(reg.mae.is_finite());
}

#[test]
fn test_zero_division_policy() {
    // Median of a constant series labels every row negative
    let actual = array![2.0, 2.0, 2.0];
    let predicted = array![1.0, 1.5, 2.0];
    let pair = binarize(&actual, &predicted, None).unwrap();
    let cls = ClassificationMetrics::compute(&pair.actual, &pair.predicted).unwrap();

    assert_eq!(cls.precision, 0.0);
    assert_eq!(cls.recall, 0.0);
    assert_eq!(cls.f1, 0.0);
    assert_eq!(cls.accuracy, 1.0);
}
