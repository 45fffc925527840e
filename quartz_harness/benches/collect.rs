//! Collector throughput benchmarks.
//!
//! Two angles: steady-state collection cost over a stable graph (after the
//! first cycle the dead set is empty, isolating trace throughput), and
//! build-then-collect over the structured patterns.

use criterion::{
    criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput,
};
use quartz_gc::GcConfig;
use quartz_harness::{standard_tester, GraphTester};

fn parallel_config() -> GcConfig {
    GcConfig {
        max_threads: 0,
        // Low threshold so every benchmarked size takes the parallel path.
        parallel_threshold: 500,
        ..Default::default()
    }
}

// =============================================================================
// Steady-state collection
// =============================================================================

fn bench_steady_state(c: &mut Criterion) {
    let mut group = c.benchmark_group("collect_steady_state");

    for &size in &[1_000usize, 10_000, 50_000] {
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("sequential", size), &size, |b, &n| {
            let mut tester = standard_tester(GcConfig::single_threaded());
            tester.random(n, 3, 42);
            tester.gc_mut().collect(true);
            b.iter(|| tester.gc_mut().collect(true));
        });

        group.bench_with_input(BenchmarkId::new("parallel", size), &size, |b, &n| {
            let mut tester = standard_tester(parallel_config());
            tester.random(n, 3, 42);
            tester.gc_mut().collect(true);
            b.iter(|| tester.gc_mut().collect(true));
        });
    }

    group.finish();
}

// =============================================================================
// Pattern build + full reclamation
// =============================================================================

fn bench_build_and_reclaim(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_and_reclaim");

    let cases: &[(&str, fn(&mut GraphTester))] = &[
        ("chain_5k", |t| {
            t.chain(5_000, 1);
        }),
        ("grid_70x70", |t| {
            t.grid(70, 70, 1);
        }),
        ("diamond_12x3", |t| {
            t.diamond(12, 3, 1);
        }),
    ];

    for (name, build) in cases {
        group.bench_function(*name, |b| {
            b.iter_batched(
                || standard_tester(GcConfig::single_threaded()),
                |mut tester| {
                    build(&mut tester);
                    tester.gc_mut().collect(true);
                    tester.detach_roots(usize::MAX, 0.0);
                    tester.gc_mut().collect(true);
                    tester
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

// =============================================================================
// Churn
// =============================================================================

fn bench_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("churn");
    group.sample_size(20);

    group.bench_function("steps50_alloc20_break10_gc5", |b| {
        b.iter_batched(
            || standard_tester(GcConfig::single_threaded()),
            |mut tester| {
                tester.churn(50, 20, 10.0, 5, 2025);
                tester
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_steady_state, bench_build_and_reclaim, bench_churn);
criterion_main!(benches);
