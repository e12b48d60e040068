use shard_kv::{BoundedCache, Cache, CacheBuilder};
use std::sync::{Arc, Mutex};

#[test]
fn it_evicts_in_recency_order_through_the_public_api() {
    // given
    let evicted = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&evicted);
    let cache: BoundedCache<&'static str, u32> = CacheBuilder::new(3)
        .shards(1)
        .on_evict(move |key: &'static str, value: u32| sink.lock().unwrap().push((key, value)))
        .build_bounded();
    cache.set("a", 1);
    cache.set("b", 2);
    cache.set("c", 3);

    // when
    cache.renew("a");
    cache.update("b", 20).unwrap();
    assert!(cache.delete_callback("c"));
    cache.set("d", 4);
    cache.set("e", 5);

    // then
    assert_eq!(*evicted.lock().unwrap(), vec![("c", 3), ("a", 1)]);
    assert_eq!(cache.get("b"), Some(20));
    assert_eq!(cache.shard_remaining("b"), 0);
    assert_eq!(cache.count(), 3);
}

#[test]
fn it_reuses_recency_slots_after_flush() {
    // given
    let cache = Cache::bounded(8, 2);
    for i in 0..8u32 {
        cache.set(i, i);
    }

    // when
    let flushed = cache.flush();
    for i in 100..200u32 {
        cache.set(i, i);
    }

    // then
    assert_eq!(flushed, 8);
    assert_eq!(cache.count(), 8);
    assert!(cache.shard_lens().iter().all(|len| *len == 4));
}
