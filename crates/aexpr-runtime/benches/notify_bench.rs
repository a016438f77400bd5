//! Benchmarks for the write → re-evaluate → notify path.
//!
//! Run with: cargo bench -p aexpr-runtime --bench notify_bench

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use aexpr_runtime::{Reactive, Reactor, Scope, Value};

// =============================================================================
// Fan-out: one property, N dependent expressions
// =============================================================================

const FAN_OUT: &[usize] = &[1, 16, 256];

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("aexpr/notify/fan_out");

    for &count in FAN_OUT {
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("source", count), &count, |b, &count| {
            let reactor = Reactor::new();
            let obj = reactor.object([("a", Value::from(0)), ("b", Value::from(1))]);
            for _ in 0..count {
                reactor
                    .track_source("o.a + o.b", Scope::new().with("o", obj), [])
                    .expect("track")
                    .on_change(|v| {
                        black_box(v);
                    });
            }
            let mut next = 0.0;
            b.iter(|| {
                next += 1.0;
                reactor.set(obj, "a", next).expect("write");
            });
        });

        group.bench_with_input(BenchmarkId::new("native", count), &count, |b, &count| {
            let reactor = Reactor::new();
            let obj = reactor.object([("a", Value::from(0)), ("b", Value::from(1))]);
            for _ in 0..count {
                reactor
                    .track_fn(move |host, _| {
                        Ok(Value::Number(host.number(obj, "a")? + host.number(obj, "b")?))
                    })
                    .expect("track")
                    .on_change(|v| {
                        black_box(v);
                    });
            }
            let mut next = 0.0;
            b.iter(|| {
                next += 1.0;
                reactor.set(obj, "a", next).expect("write");
            });
        });
    }

    group.finish();
}

// =============================================================================
// Unchanged result: equality gate short-circuits handlers
// =============================================================================

fn bench_equality_gate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aexpr/notify/unchanged");
    group.bench_function("product_with_zero", |b| {
        let reactor = Reactor::new();
        let obj = reactor.object([("a", Value::from(0)), ("b", Value::from(1))]);
        reactor
            .track_source("o.a * o.b", Scope::new().with("o", obj), [])
            .expect("track")
            .on_change(|_| unreachable!("result never changes"));
        let mut next = 0.0;
        b.iter(|| {
            next += 1.0;
            reactor.set(obj, "b", next).expect("write");
        });
    });
    group.finish();
}

// =============================================================================
// Polling
// =============================================================================

fn bench_check_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("aexpr/ticking/check_all");
    for &count in FAN_OUT {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let reactor = Reactor::new();
            let obj = reactor.object([("a", Value::from(1))]);
            for _ in 0..count {
                reactor
                    .tick_source("o.a * 2", Scope::new().with("o", obj))
                    .expect("tick");
            }
            b.iter(|| reactor.check_all().expect("poll"));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_fan_out, bench_equality_gate, bench_check_all);
criterion_main!(benches);
