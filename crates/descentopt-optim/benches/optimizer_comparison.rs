//! Benchmarks comparing the conjugate gradient strategies and Newton's method
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use descentopt_core::test_utils::{ConvexQuadratic, Rosenbrock};
use descentopt_optim::{CGConfig, ConjugateGradient, Newton, NewtonConfig, StrategyKind};

fn benchmark_cg_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("cg_strategies");

    for &dim in &[2, 10, 50] {
        let model = Rosenbrock::new(dim);
        for kind in StrategyKind::ALL {
            group.bench_with_input(BenchmarkId::new(kind.code(), dim), &dim, |b, _| {
                b.iter(|| {
                    let config = CGConfig::<f64>::new()
                        .with_strategy(kind)
                        .with_max_iterations(500);
                    let mut cg = ConjugateGradient::new(black_box(&model), config).unwrap();
                    cg.run()
                });
            });
        }
    }

    group.finish();
}

fn benchmark_quadratic(c: &mut Criterion) {
    let mut group = c.benchmark_group("convex_quadratic");

    for &dim in &[10, 100] {
        let model = ConvexQuadratic::<f64>::diagonal(dim);

        group.bench_with_input(BenchmarkId::new("cg_hz", dim), &dim, |b, _| {
            b.iter(|| {
                let mut cg = ConjugateGradient::new(black_box(&model), CGConfig::new()).unwrap();
                cg.solve()
            });
        });

        group.bench_with_input(BenchmarkId::new("newton", dim), &dim, |b, _| {
            b.iter(|| {
                let mut newton = Newton::new(black_box(&model), NewtonConfig::new()).unwrap();
                newton.search()
            });
        });
    }

    group.finish();
}

fn benchmark_newton_rosenbrock(c: &mut Criterion) {
    let model = Rosenbrock::new(20);
    c.bench_function("newton_rosenbrock_20", |b| {
        b.iter(|| {
            let mut newton =
                Newton::new(black_box(&model), NewtonConfig::<f64>::new()).unwrap();
            newton.run()
        });
    });
}

criterion_group!(
    benches,
    benchmark_cg_strategies,
    benchmark_quadratic,
    benchmark_newton_rosenbrock
);
criterion_main!(benches);
