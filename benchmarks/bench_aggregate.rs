use std::hint::black_box;
use std::io::Cursor;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use chunkagg::{reduce, select_top, AggregatorConfig, ChunkSource, Coordinator, KeyCounts};

fn build_input(records: usize, distinct: usize) -> Arc<Vec<u8>> {
    let mut out = String::from("id,name,subject\n");
    for i in 0..records {
        out.push_str(&format!("{},user{},hello\n", i, (i * 31) % distinct));
    }
    Arc::new(out.into_bytes())
}

fn source(input: &Arc<Vec<u8>>, chunk_size: usize) -> ChunkSource {
    ChunkSource::from_reader(
        Box::new(Cursor::new(input.as_ref().clone())),
        "bench",
        b',',
        chunk_size,
    )
    .unwrap()
}

fn bench_pool_sizes(c: &mut Criterion) {
    let input = build_input(200_000, 1_000);
    let mut group = c.benchmark_group("aggregate_pool_size");
    group.sample_size(10);

    for pool_size in [1, 2, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(pool_size), &pool_size, |b, &pool| {
            b.iter(|| {
                let config = AggregatorConfig::default()
                    .with_chunk_size(10_000)
                    .with_pool_size(pool);
                let report = Coordinator::new(config)
                    .run_with_source(source(&input, 10_000))
                    .unwrap();
                black_box(report.ranked);
            });
        });
    }
    group.finish();
}

fn bench_chunk_sizes(c: &mut Criterion) {
    let input = build_input(200_000, 1_000);
    let mut group = c.benchmark_group("aggregate_chunk_size");
    group.sample_size(10);

    for chunk_size in [100, 1_000, 10_000, 50_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(chunk_size),
            &chunk_size,
            |b, &chunk_size| {
                b.iter(|| {
                    let config = AggregatorConfig::default()
                        .with_chunk_size(chunk_size)
                        .with_pool_size(4);
                    let report = Coordinator::new(config)
                        .run_with_source(source(&input, chunk_size))
                        .unwrap();
                    black_box(report.ranked);
                });
            },
        );
    }
    group.finish();
}

fn bench_reduce_and_rank(c: &mut Criterion) {
    let partials: Vec<KeyCounts> = (0..64)
        .map(|p| {
            (0..5_000)
                .map(|k| (format!("user{}", (k * 7 + p) % 20_000), 1u64))
                .collect()
        })
        .collect();

    c.bench_function("reduce_64_partials", |b| {
        b.iter(|| black_box(reduce(black_box(partials.clone()))));
    });

    let global = reduce(partials);
    c.bench_function("select_top_10", |b| {
        b.iter(|| black_box(select_top(black_box(&global), 10)));
    });
}

criterion_group!(benches, bench_pool_sizes, bench_chunk_sizes, bench_reduce_and_rank);
criterion_main!(benches);
