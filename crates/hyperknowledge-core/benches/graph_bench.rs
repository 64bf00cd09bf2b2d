//! # Graph Benchmarks
//!
//! Performance benchmarks for hyperknowledge-core store operations.
//!
//! Run with: `cargo bench -p hyperknowledge-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use hyperknowledge_core::{EntityId, GraphBuilder, HyperGraph, snapshot_checksum};
use serde_json::json;
use std::hint::black_box;

/// A chain of facts: n0 -next-> n1 -next-> n2 ...
fn create_chain_graph(size: usize) -> HyperGraph {
    let mut builder = GraphBuilder::new();
    for i in 1..size {
        builder
            .add_fact(
                &EntityId::from(format!("n{}", i - 1)),
                &EntityId::from("next"),
                &EntityId::from(format!("n{}", i)),
                None,
            )
            .expect("fact");
    }
    builder.into_graph()
}

/// One hub linked to every spoke.
fn create_star_graph(size: usize) -> HyperGraph {
    let mut builder = GraphBuilder::new();
    for i in 1..size {
        builder
            .add_fact(
                &EntityId::from("hub"),
                &EntityId::from("spoke"),
                &EntityId::from(format!("s{}", i)),
                None,
            )
            .expect("fact");
    }
    builder.into_graph()
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_node_insertion(c: &mut Criterion) {
    let mut group = c.benchmark_group("node_insertion");

    for size in [100, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let mut graph = HyperGraph::new();
                for i in 0..size {
                    let _ = graph.add_entity(&json!({
                        "id": format!("n{}", i), "type": "node", "parent": null
                    }));
                }
                black_box(graph)
            });
        });
    }

    group.finish();
}

fn bench_fact_building(c: &mut Criterion) {
    let mut group = c.benchmark_group("fact_building");

    for size in [100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| black_box(create_chain_graph(size)));
        });
    }

    group.finish();
}

fn bench_neighbors(c: &mut Criterion) {
    let mut group = c.benchmark_group("neighbors");

    for size in [100, 1000, 10000].iter() {
        let graph = create_star_graph(*size);
        let hub = EntityId::from("hub");

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(graph.get_neighbors(&hub).len()));
        });
    }

    group.finish();
}

fn bench_remove_hub(c: &mut Criterion) {
    let mut group = c.benchmark_group("remove_hub");

    for size in [100, 1000].iter() {
        let graph = create_star_graph(*size);
        let hub = EntityId::from("hub");

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut graph = graph.clone();
                black_box(graph.remove_entity(&hub))
            });
        });
    }

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    for size in [100, 1000].iter() {
        let graph = create_chain_graph(*size);
        let text = graph.serialize().expect("serialize");

        group.bench_with_input(BenchmarkId::new("serialize", size), size, |b, _| {
            b.iter(|| black_box(graph.serialize()));
        });
        group.bench_with_input(BenchmarkId::new("deserialize", size), size, |b, _| {
            b.iter(|| black_box(HyperGraph::deserialize(&text)));
        });
        group.bench_with_input(BenchmarkId::new("checksum", size), size, |b, _| {
            b.iter(|| black_box(snapshot_checksum(&graph)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_node_insertion,
    bench_fact_building,
    bench_neighbors,
    bench_remove_hub,
    bench_snapshot,
);
criterion_main!(benches);
