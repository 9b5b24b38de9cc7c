//! # Publish Path Benchmark
//!
//! Measures the per-frame cost of streaming to known subjects, the path a
//! simulation hits thousands of times per step.
//!
//! Compares:
//! 1. Pose-only updates
//! 2. Pose + property updates (schema check)
//! 3. Data-only updates
//! 4. Dropped updates (no session), which must stay cheap

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use vizlink_bridge::{Bridge, BridgeConfig, LoopbackConfig, LoopbackTransport};
use std::sync::Arc;
use vizlink_shared::{Transform, Vec3};

const SUBJECT_COUNTS: [u32; 3] = [1, 100, 1_000];

/// Bridge with a bus large enough that the channel never fills mid-run.
///
/// The receiver is drained after every batch so memory stays flat.
fn active_bridge(subjects: u32) -> (Bridge, LoopbackTransport, Vec<String>) {
    let transport = LoopbackTransport::new(&LoopbackConfig { capacity: 1 << 20 });
    let bridge = Bridge::new(Arc::new(transport.clone()), BridgeConfig::without_cooldown());
    bridge.initialize("Bench").unwrap();
    let names: Vec<String> = (0..subjects).map(|i| format!("Subject_{i:05}")).collect();
    for name in &names {
        bridge.register_transform_with_properties(name, &["Speed", "Load"]).unwrap();
        bridge.register_data(&format!("{name}_stats"), &["Throughput", "Utilization", "Queue"]).unwrap();
    }
    let _ = transport.drain();
    (bridge, transport, names)
}

// =============================================================================
// POSE BENCHMARKS
// =============================================================================

fn bench_update_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_transform");
    for count in SUBJECT_COUNTS {
        let (bridge, transport, names) = active_bridge(count);
        let pose = Transform::from_position(Vec3::new(150.0, -20.0, 0.0));
        group.throughput(Throughput::Elements(u64::from(count)));
        group.bench_with_input(BenchmarkId::from_parameter(count), &names, |b, names| {
            b.iter(|| {
                for name in names {
                    bridge.update_transform(black_box(name), black_box(&pose));
                }
                black_box(transport.drain().len())
            });
        });
    }
    group.finish();
}

fn bench_update_transform_with_properties(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_transform_with_properties");
    for count in SUBJECT_COUNTS {
        let (bridge, transport, names) = active_bridge(count);
        let pose = Transform::IDENTITY;
        let values = [2.5_f32, 0.75];
        group.throughput(Throughput::Elements(u64::from(count)));
        group.bench_with_input(BenchmarkId::from_parameter(count), &names, |b, names| {
            b.iter(|| {
                for name in names {
                    bridge.update_transform_with_properties(black_box(name), &pose, black_box(&values));
                }
                black_box(transport.drain().len())
            });
        });
    }
    group.finish();
}

// =============================================================================
// DATA BENCHMARKS
// =============================================================================

fn bench_update_data(c: &mut Criterion) {
    let (bridge, transport, names) = active_bridge(100);
    let stats: Vec<String> = names.iter().map(|n| format!("{n}_stats")).collect();
    let values = [120.0_f32, 0.5, 7.0];

    c.bench_function("update_data_100", |b| {
        b.iter(|| {
            for name in &stats {
                bridge.update_data(black_box(name), black_box(&values), None);
            }
            black_box(transport.drain().len())
        });
    });
}

fn bench_dropped_without_session(c: &mut Criterion) {
    let (bridge, _transport) = Bridge::loopback(BridgeConfig::default());
    let pose = Transform::IDENTITY;

    c.bench_function("update_transform_not_initialized", |b| {
        b.iter(|| bridge.update_transform(black_box("Box1"), black_box(&pose)));
    });
}

criterion_group!(
    benches,
    bench_update_transform,
    bench_update_transform_with_properties,
    bench_update_data,
    bench_dropped_without_session,
);
criterion_main!(benches);
