use shard_kv::{Cache, CacheBuilder, CacheError};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

const THREADS: usize = 8;

#[test]
fn it_lets_exactly_one_concurrent_add_win_per_key() {
    // given
    let cache: Arc<Cache<u32, usize>> = Arc::new(Cache::new(1_024, 16));
    let wins = Arc::new(AtomicUsize::new(0));

    // when
    let handles: Vec<_> = (0..THREADS)
        .map(|thread_id| {
            let cache = Arc::clone(&cache);
            let wins = Arc::clone(&wins);
            thread::spawn(move || {
                for key in 0..500 {
                    match cache.add(key, thread_id) {
                        Ok(()) => {
                            wins.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(err) => assert_eq!(err, CacheError::DuplicateKey),
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // then
    assert_eq!(wins.load(Ordering::Relaxed), 500);
    assert_eq!(cache.count(), 500);
}

#[test]
fn it_never_exceeds_capacity_under_concurrent_writes() {
    // given
    let evicted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&evicted);
    let cache = Arc::new(
        CacheBuilder::new(256)
            .shards(8)
            .on_evict(move |_key: u32, _value: u32| {
                counter.fetch_add(1, Ordering::Relaxed);
            })
            .build_bounded(),
    );

    // when
    let handles: Vec<_> = (0..THREADS as u32)
        .map(|thread_id| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..2_000u32 {
                    // distinct keys per thread, so every set inserts
                    let key = thread_id * 2_000 + i;
                    cache.set(key, key);
                    assert!(cache.shard_len(&key) <= cache.shard_capacity(&key));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // then
    assert!(cache.count() <= 256);
    assert!(cache.shard_lens().iter().all(|len| *len <= 32));
    assert_eq!(
        evicted.load(Ordering::Relaxed),
        THREADS * 2_000 - cache.count()
    );
}

#[test]
fn it_serializes_set_or_update_per_key() {
    // given
    let cache: Arc<Cache<&'static str, usize>> = Arc::new(Cache::new(16, 4));
    let inserts = Arc::new(AtomicUsize::new(0));

    // when
    let handles: Vec<_> = (0..THREADS)
        .map(|thread_id| {
            let cache = Arc::clone(&cache);
            let inserts = Arc::clone(&inserts);
            thread::spawn(move || {
                for i in 0..1_000 {
                    if cache.set_or_update("shared", thread_id * 1_000 + i).is_none() {
                        inserts.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // then
    assert_eq!(inserts.load(Ordering::Relaxed), 1);
    assert_eq!(cache.count(), 1);
}

#[test]
fn it_sweeps_while_other_threads_write() {
    // given
    let swept = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&swept);
    let cache = Arc::new(
        CacheBuilder::new(4_096)
            .shards(16)
            .ttl(Duration::from_millis(5))
            .on_evict(move |_key: u64, _value: u64| {
                counter.fetch_add(1, Ordering::Relaxed);
            })
            .build_expiring(),
    );

    // when
    let writers: Vec<_> = (0..4u64)
        .map(|thread_id| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..2_000u64 {
                    cache.set(thread_id * 2_000 + i, i);
                }
            })
        })
        .collect();

    let sweeper = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            let mut removed = 0;
            for _ in 0..20 {
                removed += cache.delete_expired();
                thread::sleep(Duration::from_millis(1));
            }
            removed
        })
    };

    for writer in writers {
        writer.join().unwrap();
    }
    let mut removed = sweeper.join().unwrap();

    thread::sleep(Duration::from_millis(20));
    removed += cache.delete_expired();

    // then
    assert_eq!(removed, 8_000);
    assert_eq!(swept.load(Ordering::Relaxed), 8_000);
    assert_eq!(cache.count(), 0);
}

#[test]
fn it_keeps_every_key_in_its_shard_under_contention() {
    // given
    let cache: Arc<Cache<u64, u64>> = Arc::new(Cache::new(4_096, 32));

    // when
    let handles: Vec<_> = (0..THREADS as u64)
        .map(|thread_id| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for key in (thread_id..4_000).step_by(THREADS) {
                    cache.set(key, key);
                    let _ = cache.get_renew(&key);
                    if key % 3 == 0 {
                        cache.delete(&key);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // then
    let mut visited = 0;
    cache.for_each(|key, value| {
        assert_eq!(key, value);
        assert_ne!(key % 3, 0);
        visited += 1;
    });
    assert_eq!(visited, cache.count());
    assert_eq!(cache.shard_lens().iter().sum::<usize>(), cache.count());
}
