//! Criterion benchmarks for concord-forest: tree induction, forest training
//! and majority-vote prediction.

use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use concord_forest::{DecisionTreeConfig, LabeledSample, RandomForestConfig};

fn make_classification(
    n_samples: usize,
    n_features: usize,
    n_classes: usize,
    seed: u64,
) -> Vec<LabeledSample> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n_samples)
        .map(|i| {
            let class = i % n_classes;
            let row: Vec<f64> = (0..n_features)
                .map(|f| {
                    let base = if f < 3 { class as f64 * 3.0 } else { 0.0 };
                    base + rng.r#gen::<f64>() * 0.5
                })
                .collect();
            LabeledSample::new(row, class)
        })
        .collect()
}

fn bench_forest_train(c: &mut Criterion) {
    let samples = make_classification(500, 20, 3, 42);
    let cfg = RandomForestConfig::new(100).unwrap().with_seed(42);

    c.bench_function("forest_train_500x20_3class_100trees", |b| {
        b.iter(|| cfg.fit(&samples).unwrap());
    });
}

fn bench_forest_predict_batch(c: &mut Criterion) {
    let samples = make_classification(500, 20, 3, 42);
    let forest = RandomForestConfig::new(100)
        .unwrap()
        .with_seed(42)
        .fit(&samples)
        .unwrap()
        .into_forest();
    let rows: Vec<Vec<f64>> = samples.into_iter().map(|s| s.features).collect();

    c.bench_function("forest_predict_batch_500x20_100trees", |b| {
        b.iter(|| forest.predict_batch(&rows).unwrap());
    });
}

fn bench_single_tree(c: &mut Criterion) {
    let samples = make_classification(500, 20, 3, 42);
    let cfg = DecisionTreeConfig::new().with_max_features(Some(5));

    c.bench_function("tree_fit_500x20_3class", |b| {
        b.iter(|| cfg.fit(&samples).unwrap());
    });
}

criterion_group!(
    benches,
    bench_forest_train,
    bench_forest_predict_batch,
    bench_single_tree
);
criterion_main!(benches);
