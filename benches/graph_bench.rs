//! Benchmarks for job-graph construction.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use joint_calling::prelude::*;

fn graph_benchmark(c: &mut Criterion) {
    let store = MemoryArtifactStore::new();
    store.add_all([
        "gs://b/raw.mt",
        "gs://b/work/hard-filters.ht",
        "gs://b/work/meta.ht",
    ]);
    let config = VariantQcConfig::new(
        "bench-project",
        "gs://b/work",
        "gs://b/raw.mt",
        "gs://b/filtered.mt",
        "gs://b/release/chr{CHROM}.vcf.bgz",
        1000,
        FilterCutoffs::bins(90, 80),
    );

    c.bench_function("variant_qc_graph_construction", |bench| {
        bench.iter(|| {
            let mut batch = Batch::new("bench");
            let jobs =
                add_variant_qc_jobs(&mut batch, &store, black_box(&config), &[]).unwrap();
            black_box(jobs)
        })
    });

    c.bench_function("variant_qc_graph_plan", |bench| {
        let mut batch = Batch::new("bench");
        add_variant_qc_jobs(&mut batch, &store, &config, &[]).unwrap();
        bench.iter(|| black_box(batch.plan().unwrap()))
    });
}

criterion_group!(benches, graph_benchmark);
criterion_main!(benches);
