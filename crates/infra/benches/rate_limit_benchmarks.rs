use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use std::sync::Arc;
use std::time::Duration;

use photobooth_infra::rate_limit::FixedWindowLimiter;

/// Admission checks under capacity (every call increments the counter).
fn bench_admit_under_capacity(c: &mut Criterion) {
    let mut group = c.benchmark_group("rate_limit/under_capacity");
    group.throughput(Throughput::Elements(1));

    group.bench_function("admit", |b| {
        let limiter = FixedWindowLimiter::new(u32::MAX, Duration::from_secs(60));
        b.iter(|| black_box(limiter.admit(black_box("upload"))));
    });

    group.finish();
}

/// Admission checks at capacity (every call is rejected with a retry hint).
fn bench_admit_at_capacity(c: &mut Criterion) {
    let mut group = c.benchmark_group("rate_limit/at_capacity");
    group.throughput(Throughput::Elements(1));

    group.bench_function("admit", |b| {
        let limiter = FixedWindowLimiter::new(0, Duration::from_secs(60));
        b.iter(|| black_box(limiter.admit(black_box("upload"))));
    });

    group.finish();
}

/// Contended admission: several threads hammering one shared limiter.
fn bench_admit_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("rate_limit/contended");

    for threads in [2usize, 4, 8] {
        group.throughput(Throughput::Elements(1000));
        group.bench_with_input(
            BenchmarkId::from_parameter(threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    let limiter =
                        Arc::new(FixedWindowLimiter::new(u32::MAX, Duration::from_secs(60)));
                    let handles: Vec<_> = (0..threads)
                        .map(|_| {
                            let limiter = limiter.clone();
                            std::thread::spawn(move || {
                                for _ in 0..(1000 / threads) {
                                    black_box(limiter.admit("upload"));
                                }
                            })
                        })
                        .collect();
                    for handle in handles {
                        handle.join().unwrap();
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_admit_under_capacity,
    bench_admit_at_capacity,
    bench_admit_contended
);
criterion_main!(benches);
