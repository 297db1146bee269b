//! Benchmark: petek-map single-writer throughput.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use petek_map::{MapConfig, U64U64Map};

const OPS: u64 = 10_000;

fn bench_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_put");
    group.throughput(Throughput::Elements(OPS));

    group.bench_function("u64_to_u64", |b| {
        b.iter(|| {
            let mut map = U64U64Map::new().unwrap();
            for i in 0..OPS {
                map.put(black_box(i), black_box(i * 2)).unwrap();
            }
            map.close();
        });
    });

    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_get");
    group.throughput(Throughput::Elements(OPS));

    group.bench_function("u64_to_u64", |b| {
        let mut map = U64U64Map::new().unwrap();
        for i in 0..OPS {
            map.put(i, i * 2).unwrap();
        }
        b.iter(|| {
            let mut sum = 0u64;
            for i in 0..OPS {
                if let Some(value) = map.get(black_box(i)).unwrap() {
                    sum += value;
                }
            }
            sum
        });
        map.close();
    });

    group.finish();
}

fn bench_put_small_buckets(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_put_split_heavy");
    group.throughput(Throughput::Elements(OPS));

    // small buckets force frequent splits and directory doubling
    group.bench_function("u64_to_u64", |b| {
        let config = MapConfig::new()
            .initial_table_size(2)
            .min_block_count_per_bucket(2);
        b.iter(|| {
            let mut map = U64U64Map::with_config(&config).unwrap();
            for i in 0..OPS {
                map.put(black_box(i), black_box(i)).unwrap();
            }
            map.close();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_put, bench_get, bench_put_small_buckets);
criterion_main!(benches);
