use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dirkv_store::cache::DataCache;
use dirkv_store::path::{Encoding, Path};

fn fill(cache: &DataCache, n: usize) {
    for i in 0..n {
        let p = Path::new(["bench", &format!("{i}.json.db")], Encoding::Json);
        cache.set(p, bytes::Bytes::from_static(b"payload"));
    }
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("DataCache");

    group.bench_function("set_within_capacity", |b| {
        let cache = DataCache::new(10_000, 65_536);
        b.iter(|| fill(black_box(&cache), 1_000));
    });

    group.bench_function("get_hot_path", |b| {
        let cache = DataCache::new(10_000, 65_536);
        fill(&cache, 1_000);
        let p = Path::new(["bench", "500.json.db"], Encoding::Json);
        b.iter(|| black_box(cache.get(black_box(&p))));
    });

    group.bench_function("set_with_eviction_pressure", |b| {
        let cache = DataCache::new(100, 65_536);
        b.iter(|| fill(black_box(&cache), 1_000));
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
