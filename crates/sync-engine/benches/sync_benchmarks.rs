//! Benchmarks for the per-record work of a sync pass
//!
//! Run with: cargo bench --package momentum-sync

use criterion::{criterion_group, criterion_main, Criterion};
use momentum_core::{SyncRecord, Task};
use momentum_sync::{batches, decide, RemoteRecord, DEFAULT_BATCH_SIZE};
use std::hint::black_box;

fn sample_tasks(count: usize) -> Vec<Task> {
    (0..count)
        .map(|i| Task::new(format!("Task {}", i)))
        .collect()
}

fn bench_content_hash(c: &mut Criterion) {
    let tasks = sample_tasks(1_000);

    c.bench_function("content_hash_1000_tasks", |b| {
        b.iter(|| {
            for task in &tasks {
                black_box(task.content_hash());
            }
        });
    });
}

fn bench_remote_conversion(c: &mut Criterion) {
    let tasks = sample_tasks(1_000);

    c.bench_function("remote_record_from_1000_tasks", |b| {
        b.iter(|| {
            for task in &tasks {
                black_box(RemoteRecord::from_record(task).ok());
            }
        });
    });
}

fn bench_decide(c: &mut Criterion) {
    let hashes: Vec<String> = sample_tasks(1_000)
        .iter()
        .filter_map(|task| task.content_hash().ok())
        .collect();

    c.bench_function("decide_1000_records", |b| {
        b.iter(|| {
            for (i, hash) in hashes.iter().enumerate() {
                let base = (i % 3 != 0).then_some(hash.as_str());
                let server = (i % 2 == 0).then_some(hash.as_str());
                black_box(decide(base, Some(hash), server));
            }
        });
    });
}

fn bench_batching(c: &mut Criterion) {
    let tasks = sample_tasks(10_000);

    c.bench_function("batch_10000_records", |b| {
        b.iter(|| {
            let sizes: usize = batches(&tasks, DEFAULT_BATCH_SIZE).map(|chunk| chunk.len()).sum();
            black_box(sizes);
        });
    });
}

criterion_group!(
    benches,
    bench_content_hash,
    bench_remote_conversion,
    bench_decide,
    bench_batching
);
criterion_main!(benches);
