//! Engine benchmarks for the per-frame read path.
//!
//! The host calls `snapshot` + `sample_all` + `project` every animation
//! frame, so those three dominate the interactive budget. Run with:
//! `cargo bench` or `cargo criterion`.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use ownsim::clock::SimTime;
use ownsim::graph::{EdgeKind, GraphStore, NodeKind};
use ownsim::metrics::{default_channels, sample_all, MetricsContext};
use ownsim::projection::project;
use ownsim::scenario::LayoutRule;

/// A store with `n` nodes, one raw pointer each, and a shared spine.
fn populated_store(n: u32) -> GraphStore {
    let mut store = GraphStore::new();
    let spine = store.add_node("spine", NodeKind::Resource, 0.0);
    store
        .add_edge(EdgeKind::OwningShared, "spine_owner", Some(spine))
        .unwrap();
    for i in 0..n {
        let node = store.add_node(format!("n{i}"), NodeKind::Target, f64::from(i));
        store
            .add_edge(EdgeKind::RawPointer, format!("p{i}"), Some(node))
            .unwrap();
        store
            .add_edge(EdgeKind::WeakObserver, format!("w{i}"), Some(spine))
            .unwrap();
    }
    store
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_snapshot");
    group.sample_size(100);
    group.confidence_level(0.95);

    for n in [8u32, 64, 256].iter() {
        let store = populated_store(*n);
        group.bench_with_input(BenchmarkId::new("snapshot", n), n, |b, _| {
            b.iter(|| black_box(store.snapshot()));
        });
    }

    group.finish();
}

fn bench_sample_all(c: &mut Criterion) {
    let channels = default_channels();
    let ctx = MetricsContext {
        scenario_seed: 0x51ab_b00c,
        step_index: 3,
        total_steps: 8,
        last_safety: ownsim::scenario::SafetyClass::UndefinedBehavior,
    };

    c.bench_function("metrics_sample_all", |b| {
        let mut t = SimTime::ZERO;
        b.iter(|| {
            t = t.add_nanos(16_666_667);
            black_box(sample_all(&channels, &ctx, t))
        });
    });
}

fn bench_project(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_projection");
    group.sample_size(100);
    group.confidence_level(0.95);

    let channels = default_channels();
    let ctx = MetricsContext {
        scenario_seed: 7,
        step_index: 1,
        total_steps: 4,
        last_safety: ownsim::scenario::SafetyClass::Safe,
    };
    let t = SimTime::from_secs(12.5);
    let samples = sample_all(&channels, &ctx, t);

    for (layout, name) in [
        (LayoutRule::Hierarchical, "hierarchical"),
        (LayoutRule::Radial, "radial"),
        (LayoutRule::Grid, "grid"),
    ] {
        for n in [8u32, 64, 256].iter() {
            let snapshot = populated_store(*n).snapshot();
            group.bench_with_input(
                BenchmarkId::new(name, n),
                n,
                |b, _| {
                    b.iter(|| black_box(project(&snapshot, &samples, t, layout)));
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_snapshot, bench_sample_all, bench_project);
criterion_main!(benches);
