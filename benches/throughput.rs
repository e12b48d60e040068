use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::Rng;
use shard_kv::{BoundedCache, Cache, ExpiringCache};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const THREAD_COUNT: usize = 8;
const OPERATIONS_PER_THREAD: usize = 50_000;
const KEY_SPACE: u64 = 20_000;

#[derive(Clone, Copy)]
enum Variant {
    Unbounded,
    Expiring,
    Bounded,
}

impl Variant {
    fn name(self) -> &'static str {
        match self {
            Variant::Unbounded => "unbounded",
            Variant::Expiring => "expiring",
            Variant::Bounded => "bounded",
        }
    }
}

trait MixedLoad: Send + Sync + 'static {
    fn write(&self, key: u64, value: u64);
    fn read(&self, key: u64) -> Option<u64>;
}

impl MixedLoad for Cache<u64, u64> {
    fn write(&self, key: u64, value: u64) {
        self.set(key, value);
    }

    fn read(&self, key: u64) -> Option<u64> {
        self.get(&key)
    }
}

impl MixedLoad for ExpiringCache<u64, u64> {
    fn write(&self, key: u64, value: u64) {
        self.set(key, value);
    }

    fn read(&self, key: u64) -> Option<u64> {
        self.get(&key)
    }
}

impl MixedLoad for BoundedCache<u64, u64> {
    fn write(&self, key: u64, value: u64) {
        self.set(key, value);
    }

    fn read(&self, key: u64) -> Option<u64> {
        self.get_renew(&key)
    }
}

fn run<C: MixedLoad>(cache: Arc<C>, write_ratio: usize) {
    for key in 0..KEY_SPACE / 2 {
        cache.write(key, key);
    }

    let handles: Vec<_> = (0..THREAD_COUNT)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                let mut rng = rand::thread_rng();
                for i in 0..OPERATIONS_PER_THREAD {
                    let key = rng.gen_range(0..KEY_SPACE);
                    // write_ratio writes per 10 operations
                    if i % 10 < write_ratio {
                        cache.write(key, key);
                    } else {
                        let _ = cache.read(key);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

fn bench_variant(variant: Variant, write_ratio: usize) {
    let capacity = 10_000;
    let shards = 64;
    match variant {
        Variant::Unbounded => run(Arc::new(Cache::new(capacity, shards)), write_ratio),
        Variant::Expiring => run(
            Arc::new(Cache::with_ttl(Duration::from_secs(60), capacity, shards)),
            write_ratio,
        ),
        Variant::Bounded => run(Arc::new(Cache::bounded(capacity, shards)), write_ratio),
    }
}

fn mixed_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixed get/set");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(10);

    for write_ratio in [1, 5, 8] {
        for variant in [Variant::Unbounded, Variant::Expiring, Variant::Bounded] {
            group.bench_with_input(
                BenchmarkId::new(variant.name(), format!("{}% writes", write_ratio * 10)),
                &write_ratio,
                |b, write_ratio| {
                    b.iter(|| bench_variant(variant, *write_ratio));
                },
            );
        }
    }

    group.finish();
}

fn sweep(c: &mut Criterion) {
    c.bench_function("delete_expired 10k", |b| {
        b.iter_with_setup(
            || {
                let cache = Cache::with_ttl(Duration::ZERO, 10_000, 16);
                for key in 0..10_000u64 {
                    cache.set(key, key);
                }
                cache
            },
            |cache| cache.delete_expired(),
        );
    });
}

criterion_group!(benches, mixed_throughput, sweep);
criterion_main!(benches);
