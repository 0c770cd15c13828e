use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use vbm_prob::math::{fast_exp, softmax};

fn bench_exp(c: &mut Criterion) {
    let xs: Vec<f64> = (0..4096).map(|i| -30.0 + (i as f64) * 0.0073).collect();

    let mut group = c.benchmark_group("exp");
    group.bench_function("fast_exp", |b| {
        b.iter(|| xs.iter().map(|&x| fast_exp(black_box(x))).sum::<f64>())
    });
    group.bench_function("std_exp", |b| b.iter(|| xs.iter().map(|&x| black_box(x).exp()).sum::<f64>()));
    group.finish();
}

fn bench_softmax(c: &mut Criterion) {
    let mut group = c.benchmark_group("softmax");
    for k in [2usize, 6, 16, 64] {
        let logits: Vec<f64> = (0..k).map(|i| -(i as f64) * 0.7 + 3.0).collect();
        group.bench_with_input(BenchmarkId::from_parameter(k), &logits, |b, logits| {
            b.iter(|| {
                let mut p = logits.clone();
                black_box(softmax(black_box(&mut p)))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_exp, bench_softmax);
criterion_main!(benches);
