//! Inference benchmark: feature vector → dense network forward pass, per model.

use adaptive_engine::model::{Architecture, Network};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_style_forward(c: &mut Criterion) {
    let net = Network::new(Architecture::learning_style(), 42).unwrap();
    let x = vec![0.1f32; 10];

    c.bench_function("style_forward_10d", |b| {
        b.iter(|| net.forward(black_box(&x)).unwrap())
    });
}

fn bench_difficulty_forward(c: &mut Criterion) {
    let net = Network::new(Architecture::difficulty(), 42).unwrap();
    let x = vec![0.1f32; 5];

    c.bench_function("difficulty_forward_5d", |b| {
        b.iter(|| net.forward(black_box(&x)).unwrap())
    });
}

fn bench_difficulty_training_epoch(c: &mut Criterion) {
    use adaptive_engine::model::FitOptions;

    let xs: Vec<Vec<f32>> = (0..64).map(|i| vec![i as f32 / 64.0; 5]).collect();
    let ys: Vec<Vec<f32>> = (0..64).map(|i| vec![i as f32 / 64.0]).collect();
    let options = FitOptions {
        epochs: 1,
        batch_size: 16,
        validation_split: 0.2,
        learning_rate: 0.001,
        seed: 42,
    };

    c.bench_function("difficulty_fit_1_epoch_64_samples", |b| {
        b.iter_batched(
            || Network::new(Architecture::difficulty(), 42).unwrap(),
            |mut net| black_box(net.fit(&xs, &ys, options).unwrap()),
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    bench_style_forward,
    bench_difficulty_forward,
    bench_difficulty_training_epoch
);
criterion_main!(benches);
