//! Benchmarks for the scoring and augmentation paths
//!
//! Run with: cargo bench -p headkin-core --bench preprocess_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use headkin_core::filter::ButterworthLowpass;
use headkin_core::ode::{SolverMethod, SolverOptions};
use headkin_core::prelude::*;
use headkin_core::DamageParams;
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;
use std::time::Duration;

const FS: f64 = 3200.0;

/// Half-sine impact with sensor noise.
fn noisy_impact(samples: usize, seed: u64) -> (KinematicProfile, TimeVector) {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 25.0).unwrap();
    let pulse = samples / 3;
    let rows: Vec<[f64; 3]> = (0..samples)
        .map(|i| {
            let s = if (pulse..2 * pulse).contains(&i) {
                (PI * (i - pulse) as f64 / pulse as f64).sin()
            } else {
                0.0
            };
            [
                -3800.0 * s + noise.sample(&mut rng),
                1500.0 * s + noise.sample(&mut rng),
                700.0 * s + noise.sample(&mut rng),
            ]
        })
        .collect();
    (
        KinematicProfile::from_rows(&rows).unwrap(),
        TimeVector::uniform(samples, FS).unwrap(),
    )
}

// ============================================================================
// Injury Metrics
// ============================================================================

fn bench_damage(c: &mut Criterion) {
    let mut group = c.benchmark_group("damage");
    let (profile, time) = noisy_impact(192, 1);

    for method in [SolverMethod::Rk45, SolverMethod::Trapezoid] {
        let integrator =
            DamageIntegrator::new(DamageParams::default(), method, SolverOptions::default())
                .unwrap();
        group.bench_with_input(BenchmarkId::new("solve", method), &method, |b, _| {
            b.iter(|| integrator.damage(black_box(&profile), black_box(&time)))
        });
    }

    group.finish();
}

fn bench_ubric(c: &mut Criterion) {
    let mut group = c.benchmark_group("ubric");

    for samples in [192, 1024, 8192] {
        let (profile, time) = noisy_impact(samples, 2);
        let scorer = UbricScorer::default();
        group.throughput(Throughput::Elements(samples as u64));
        group.bench_with_input(BenchmarkId::new("score", samples), &samples, |b, _| {
            b.iter(|| scorer.score(black_box(&profile), black_box(&time)))
        });
    }

    group.finish();
}

// ============================================================================
// Augmentation
// ============================================================================

fn bench_augment(c: &mut Criterion) {
    let mut group = c.benchmark_group("augment");
    let (profile, _) = noisy_impact(192, 3);

    for mode in [PadMode::Repeat, PadMode::Edge, PadMode::Zero] {
        let augmenter = Augmenter::new(AugmentConfig {
            pad_mode: mode,
            ..Default::default()
        })
        .unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        group.bench_function(format!("six_perms_{:?}", mode).to_lowercase(), |b| {
            b.iter(|| augmenter.augment(black_box(&profile), &mut rng))
        });
    }

    group.finish();
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter");
    let (profile, _) = noisy_impact(4096, 4);
    let channel = profile.channel(0);

    for order in [2, 4, 8] {
        let lpf = ButterworthLowpass::new(order, 300.0, FS).unwrap();
        group.throughput(Throughput::Elements(channel.len() as u64));
        group.bench_with_input(BenchmarkId::new("filtfilt", order), &order, |b, _| {
            b.iter(|| lpf.filtfilt(black_box(&channel)))
        });
    }

    group.finish();
}

criterion_group!(
    name = metric_benches;
    config = Criterion::default().measurement_time(Duration::from_secs(5));
    targets = bench_damage, bench_ubric
);

criterion_group!(
    name = augment_benches;
    config = Criterion::default();
    targets = bench_augment, bench_filter
);

criterion_main!(metric_benches, augment_benches);
