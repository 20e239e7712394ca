//! Record store benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pagefill_bench::{batch_with_duplicates, populated_store, shuffled_records};
use pagefill_storage::{FileRecordStore, InMemoryRecordStore, RecordStore, ScanDirection};
use tempfile::TempDir;

/// Benchmark in-memory batch inserts of fresh records.
fn bench_memory_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_insert");

    for size in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let batch = shuffled_records(0, size);

            b.iter(|| {
                let store = InMemoryRecordStore::new();
                let inserted = store.insert_ignoring_duplicates(black_box(&batch)).unwrap();
                black_box(inserted);
            });
        });
    }

    group.finish();
}

/// Benchmark inserts where half the batch is already stored.
fn bench_memory_insert_duplicates(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_insert_duplicates");

    for size in [100, 1000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let store = InMemoryRecordStore::new();
            let batch = batch_with_duplicates(size);
            store.insert_ignoring_duplicates(&batch).unwrap();

            b.iter(|| {
                let inserted = store.insert_ignoring_duplicates(black_box(&batch)).unwrap();
                black_box(inserted);
            });
        });
    }

    group.finish();
}

/// Benchmark ordered scans in both directions.
fn bench_memory_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_scan");
    let store = populated_store(100_000);

    for limit in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*limit as u64));
        group.bench_with_input(BenchmarkId::new("forward", limit), limit, |b, &limit| {
            b.iter(|| {
                let records = store
                    .scan_ordered(black_box(50_000), ScanDirection::Forward, limit)
                    .unwrap();
                black_box(records);
            });
        });
        group.bench_with_input(BenchmarkId::new("backward", limit), limit, |b, &limit| {
            b.iter(|| {
                let records = store
                    .scan_ordered(black_box(50_000), ScanDirection::Backward, limit)
                    .unwrap();
                black_box(records);
            });
        });
    }

    group.finish();
}

/// Benchmark file store appends of fresh windows.
fn bench_file_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_insert");

    // Use larger sample size for file operations
    group.sample_size(50);

    for size in [10, 100].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let temp_dir = TempDir::new().unwrap();
            let store = FileRecordStore::open(&temp_dir.path().join("bench.bin")).unwrap();
            let mut next = 0;

            b.iter(|| {
                let batch = shuffled_records(next, size);
                next += size as i64;
                let inserted = store.insert_ignoring_duplicates(black_box(&batch)).unwrap();
                black_box(inserted);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_memory_insert,
    bench_memory_insert_duplicates,
    bench_memory_scan,
    bench_file_insert
);
criterion_main!(benches);
