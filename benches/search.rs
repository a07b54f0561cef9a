use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use boosteval::optimizer::{BoostingSearchSpace, SearchConfig, TwoStageSearch};
use boosteval::training::{GradientBoostingConfig, GradientBoostingFactory, GradientBoostingRegressor};

fn create_regression_data(n_rows: usize, n_features: usize) -> (Array2<f64>, Array1<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let x = Array2::from_shape_fn((n_rows, n_features), |_| rng.gen::<f64>() * 10.0);
    let y = x
        .rows()
        .into_iter()
        .map(|row| row.sum() + row[0] * row[0] * 0.1)
        .collect();
    (x, y)
}

fn bench_boosting_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("gradient_boosting");
    group.sample_size(10);

    for n_rows in [500, 2000, 5000].iter() {
        let (x, y) = create_regression_data(*n_rows, 3);
        group.bench_with_input(BenchmarkId::new("fit", n_rows), n_rows, |b, _| {
            b.iter(|| {
                let mut model = GradientBoostingRegressor::new(GradientBoostingConfig::default());
                model.fit(black_box(&x), black_box(&y)).unwrap();
                model
            })
        });
    }
    group.finish();
}

fn bench_two_stage_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    group.sample_size(10);

    let space = BoostingSearchSpace {
        n_estimators: vec![20, 50],
        ..Default::default()
    };

    for n_iter in [4, 8].iter() {
        let (x, y) = create_regression_data(400, 3);
        group.bench_with_input(BenchmarkId::new("two_stage", n_iter), n_iter, |b, &n_iter| {
            b.iter(|| {
                TwoStageSearch::new(Arc::new(GradientBoostingFactory::new(Some(42))))
                    .with_space(space.clone())
                    .with_config(SearchConfig::new().with_n_iter(n_iter))
                    .run(black_box(&x), black_box(&y))
                    .unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_boosting_fit, bench_two_stage_search);
criterion_main!(benches);
