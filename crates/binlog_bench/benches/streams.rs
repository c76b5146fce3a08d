//! Output stream benchmarks.

use binlog_bench::{random_data, PAYLOAD_SIZES};
use binlog_core::{Config, LogWriter};
use binlog_stream::{
    BufferedFileStream, BufferedOptions, CompressedStream, MappedFileStream, MappedOptions,
    MemoryStream, NoneCompressor, OutputStream,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::TempDir;

/// Bytes a stream holds before a benchmark wraps it back to the start.
const CAPACITY: u64 = 64 * 1024 * 1024;

/// Benchmark MemoryStream writes as a baseline.
fn bench_memory_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_write");

    for size in PAYLOAD_SIZES.iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut stream = MemoryStream::new();
            let data = random_data(size);

            b.iter(|| {
                stream.write(black_box(&data)).unwrap();
                if stream.position() > CAPACITY {
                    stream.truncate(0).unwrap();
                }
            });
        });
    }

    group.finish();
}

/// Benchmark BufferedFileStream writes for several cache sizes.
fn bench_buffered_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffered_write");
    group.sample_size(50);

    for cache_size in [512usize, 4096, 65536] {
        for size in PAYLOAD_SIZES.iter() {
            group.throughput(Throughput::Bytes(*size as u64));
            group.bench_with_input(
                BenchmarkId::new(format!("cache_{cache_size}"), size),
                size,
                |b, &size| {
                    let temp_dir = TempDir::new().unwrap();
                    let path = temp_dir.path().join("bench.log");
                    let mut stream = BufferedFileStream::create(
                        &path,
                        &BufferedOptions::new().cache_size(cache_size),
                    )
                    .unwrap();
                    let data = random_data(size);

                    b.iter(|| {
                        stream.write(black_box(&data)).unwrap();
                    });
                },
            );
        }
    }

    group.finish();
}

/// Benchmark MappedFileStream writes, wrapping at capacity.
fn bench_mapped_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("mapped_write");
    group.sample_size(50);

    for size in PAYLOAD_SIZES.iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let temp_dir = TempDir::new().unwrap();
            let path = temp_dir.path().join("bench.log");
            let mut stream =
                MappedFileStream::create(&path, &MappedOptions::with_capacity(CAPACITY))
                    .unwrap();
            let data = random_data(size);

            b.iter(|| {
                if stream.remaining() < size as u64 {
                    stream.seek(0).unwrap();
                }
                stream.write(black_box(&data)).unwrap();
            });

            stream.seek(0).unwrap();
            stream.close().unwrap();
        });
    }

    group.finish();
}

/// Benchmark CompressedStream writes into a NoneCompressor.
fn bench_compressed_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("compressed_write");

    for size in PAYLOAD_SIZES.iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut compressor = NoneCompressor::new();
            let data = random_data(size);

            b.iter(|| {
                {
                    let mut stream = CompressedStream::with_compressor(&mut compressor);
                    stream.write(black_box(&data)).unwrap();
                }
                compressor.reset();
            });
        });
    }

    group.finish();
}

/// Benchmark sync cost per strategy after a single page of writes.
fn bench_sync(c: &mut Criterion) {
    let mut group = c.benchmark_group("sync");
    group.sample_size(20); // Sync is slow

    let data = random_data(4096);

    group.bench_function("buffered", |b| {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bench.log");
        let mut stream = BufferedFileStream::create(&path, &BufferedOptions::new()).unwrap();

        b.iter(|| {
            stream.write(&data).unwrap();
            stream.flush().unwrap();
            stream.sync().unwrap();
        });
    });

    group.bench_function("mapped", |b| {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bench.log");
        let mut stream =
            MappedFileStream::create(&path, &MappedOptions::with_capacity(CAPACITY))
                .unwrap();

        b.iter(|| {
            if stream.remaining() < data.len() as u64 {
                stream.seek(0).unwrap();
            }
            stream.write(&data).unwrap();
            stream.sync().unwrap();
        });
    });

    group.finish();
}

/// Benchmark LogWriter append + commit without per-commit sync.
fn bench_writer_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("writer_commit");
    group.sample_size(50);

    let configs = [
        ("buffered", Config::new().sync_on_commit(false)),
        (
            "mapped",
            Config::new().mapped(CAPACITY).sync_on_commit(false),
        ),
    ];

    for (name, config) in configs.iter() {
        group.throughput(Throughput::Bytes(1024));
        group.bench_function(*name, |b| {
            let temp_dir = TempDir::new().unwrap();
            let path = temp_dir.path().join("bench.log");
            let writer = LogWriter::create(&path, config).unwrap();
            let data = random_data(1024);

            b.iter(|| {
                if writer.position() + data.len() as u64 > CAPACITY {
                    writer.truncate(binlog_core::HEADER_SIZE as u64).unwrap();
                }
                writer.append(black_box(&data)).unwrap();
                writer.commit().unwrap();
            });

            writer.close().unwrap();
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_memory_write,
    bench_buffered_write,
    bench_mapped_write,
    bench_compressed_write,
    bench_sync,
    bench_writer_commit,
);

criterion_main!(benches);
