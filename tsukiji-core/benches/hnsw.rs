//! HNSW build and search benchmarks.
//!
//! Measures sequential prepare/complete insertion, pipelined insertion and
//! query latency across search breadths on uniform synthetic vectors.

use std::sync::Arc;

use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::{Rng, SeedableRng, rngs::SmallRng};
use tsukiji_core::{
    HnswIndex, HnswParams, Pipeline, PipelineConfig, SquaredEuclidean, VectorStore,
};

const SEED: u64 = 42;
const DIMENSIONS: usize = 32;
const POINT_COUNTS: &[usize] = &[500, 2_000];
const MAX_CONNECTIONS: &[usize] = &[8, 16];
const SEARCH_POINTS: usize = 5_000;
const SEARCH_EFS: &[usize] = &[16, 64, 200];

fn uniform(count: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..count)
        .map(|_| (0..DIMENSIONS).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect()
}

fn params(m: usize) -> HnswParams {
    HnswParams::new(m, m * 8)
        .unwrap_or_else(|err| panic!("benchmark parameters rejected: {err}"))
        .with_rng_seed(SEED)
}

fn build(vectors: &[Vec<f32>], m: usize) -> HnswIndex<Arc<VectorStore>> {
    let store = Arc::new(VectorStore::new());
    let index = HnswIndex::new(params(m), Arc::clone(&store), SquaredEuclidean);
    for (doc, vector) in (0_u32..).zip(vectors) {
        store.set(doc, vector.clone());
        let prepared = index
            .prepare_add(index.take_guard(), doc, vector.clone())
            .unwrap_or_else(|err| panic!("prepare failed for {doc}: {err}"));
        index
            .complete_add(prepared)
            .unwrap_or_else(|err| panic!("complete failed for {doc}: {err}"));
    }
    index
}

fn hnsw_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("hnsw_build");
    group.sample_size(10);
    for &count in POINT_COUNTS {
        let vectors = uniform(count, SEED);
        group.throughput(Throughput::Elements(count as u64));
        for &m in MAX_CONNECTIONS {
            group.bench_with_input(
                BenchmarkId::new(format!("m{m}"), count),
                &vectors,
                |b, vectors| b.iter(|| build(vectors, m)),
            );
        }
    }
    group.finish();
}

fn hnsw_pipeline_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("hnsw_pipeline_build");
    group.sample_size(10);
    let vectors = uniform(2_000, SEED);
    group.throughput(Throughput::Elements(vectors.len() as u64));
    for threads in [1_usize, 4, 10] {
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter_batched(
                || {
                    let config = PipelineConfig::default()
                        .with_prepare_threads(threads)
                        .unwrap_or_else(|err| panic!("config rejected: {err}"));
                    Pipeline::new(params(16), SquaredEuclidean, config)
                        .unwrap_or_else(|err| panic!("pipeline failed to start: {err}"))
                },
                |pipeline| {
                    for (doc, vector) in (0_u32..).zip(&vectors) {
                        pipeline
                            .submit_add(doc, vector.clone())
                            .unwrap_or_else(|err| panic!("submit failed: {err}"));
                    }
                    pipeline
                        .drain()
                        .unwrap_or_else(|err| panic!("drain failed: {err}"));
                    pipeline
                },
                BatchSize::PerIteration,
            );
        });
    }
    group.finish();
}

fn hnsw_search(c: &mut Criterion) {
    let index = build(&uniform(SEARCH_POINTS, SEED), 16);
    let queries = uniform(64, SEED + 1);
    let mut group = c.benchmark_group("hnsw_search");
    for &ef in SEARCH_EFS {
        group.bench_with_input(BenchmarkId::new("k10", ef), &ef, |b, &ef| {
            let mut next = 0;
            b.iter(|| {
                let query = &queries[next % queries.len()];
                next += 1;
                index
                    .search(query, 10, ef)
                    .unwrap_or_else(|err| panic!("search failed: {err}"))
            });
        });
    }
    group.finish();
}

criterion_group!(benches, hnsw_build, hnsw_pipeline_build, hnsw_search);
criterion_main!(benches);
