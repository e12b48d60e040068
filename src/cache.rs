use crate::Stats;
use crate::builder::CacheBuilder;
use crate::error::CacheError;
use parking_lot::{Mutex, RwLock};
use policy::{Bounded, Expiring, Policy, Unbounded};
use router::ShardRouter;
use shard::Shard;
use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::time::{Duration, Instant};
use tracing::debug;

mod entry;
pub mod policy;
mod recency_list;
mod router;
mod shard;
pub(crate) mod stats;

pub(crate) type RandomState = ahash::RandomState;

pub(crate) type EvictionListener<K, V> = Box<dyn Fn(K, V) + Send + Sync>;

/// A cache whose entries expire a fixed time after they were last written or renewed.
pub type ExpiringCache<K, V, S = RandomState> = Cache<K, V, Expiring, S>;

/// A cache holding at most `capacity` entries, evicting the least recently used entry per shard.
pub type BoundedCache<K, V, S = RandomState> = Cache<K, V, Bounded<K>, S>;

/// Sharded, thread-safe key/value cache.
///
/// Keys are routed to one of a fixed number of shards by a seeded hash. Every shard sits behind
/// its own read-write lock, so operations on different shards never contend. Reads take the read
/// lock; writes, renewals and evictions take the write lock.
///
/// The policy `P` decides what happens beyond plain storage:
///
/// - [`Unbounded`]: nothing, entries stay until deleted.
/// - [`Expiring`]: entries carry a deadline, checked lazily.
/// - [`Bounded`]: each shard holds `capacity / shards` entries and evicts its least recently used
///   entry when full.
///
/// Operations spanning all shards (`count`, `flush`, `clear`, `for_each`, `delete_expired`,
/// `stats`) lock one shard at a time and are therefore not atomic snapshots.
///
/// The eviction listener registered with [`CacheBuilder::on_evict`] runs while the affected
/// shard's write lock is held. It must not call back into the same cache.
///
/// Wrap the cache in a [`std::sync::Arc`] to share it between threads. Both reads and writes only
/// require shared references to the cache.
pub struct Cache<K, V, P = Unbounded, S = RandomState>
where
    P: Policy<K>,
{
    router: ShardRouter<S>,
    shards: Vec<RwLock<Shard<K, V, P, S>>>,
    capacity: usize,
    ttl: Option<Duration>,
    on_evict: Option<EvictionListener<K, V>>,
    metrics_last_accessed: Mutex<Instant>,
}

impl<K, V> Cache<K, V, Unbounded, RandomState>
where
    K: Clone + Eq + Hash,
{
    /// Creates a cache without eviction, split into `shards` shards.
    ///
    /// `capacity` only presizes the shards.
    ///
    /// # Panics
    ///
    /// Panics if `shards` is zero or greater than `capacity`.
    pub fn new(capacity: usize, shards: usize) -> Self {
        CacheBuilder::new(capacity).shards(shards).build()
    }
}

impl<K, V> Cache<K, V, Expiring, RandomState>
where
    K: Clone + Eq + Hash,
{
    /// Creates a cache whose entries expire `ttl` after their last write or renewal.
    ///
    /// # Panics
    ///
    /// Panics if `shards` is zero or greater than `capacity`.
    pub fn with_ttl(ttl: Duration, capacity: usize, shards: usize) -> Self {
        CacheBuilder::new(capacity)
            .shards(shards)
            .ttl(ttl)
            .build_expiring()
    }
}

impl<K, V> Cache<K, V, Bounded<K>, RandomState>
where
    K: Clone + Eq + Hash,
{
    /// Creates a cache holding at most `capacity / shards` entries per shard.
    ///
    /// # Panics
    ///
    /// Panics if `shards` is zero or greater than `capacity`.
    pub fn bounded(capacity: usize, shards: usize) -> Self {
        CacheBuilder::new(capacity).shards(shards).build_bounded()
    }
}

impl<K, V, P, S> Cache<K, V, P, S>
where
    P: Policy<K>,
    S: BuildHasher + Clone,
{
    /// Assembles a cache from already validated parameters.
    pub(crate) fn from_parts(
        capacity: usize,
        shards: usize,
        ttl: Option<Duration>,
        hash_builder: S,
        on_evict: Option<EvictionListener<K, V>>,
        make_policy: impl Fn(usize) -> P,
    ) -> Self {
        let capacity_per_shard = capacity / shards;

        let shard_locks = (0..shards)
            .map(|_| {
                RwLock::new(Shard::with_capacity_and_hasher(
                    capacity_per_shard,
                    make_policy(capacity_per_shard),
                    hash_builder.clone(),
                ))
            })
            .collect();

        debug!(capacity, shards, policy = P::NAME, "cache created");

        Self {
            router: ShardRouter::new(hash_builder, shards),
            shards: shard_locks,
            capacity,
            ttl,
            on_evict,
            metrics_last_accessed: Mutex::new(Instant::now()),
        }
    }
}

impl<K, V, P, S> Cache<K, V, P, S>
where
    K: Clone + Eq + Hash,
    P: Policy<K>,
    S: BuildHasher,
{
    /// Returns a clone of the value corresponding to the key.
    ///
    /// Expiration is not checked; an expired but not yet swept entry is still returned. Recency
    /// is not updated; use [`Cache::get_renew`] for that.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone,
    {
        self.shard(key).read().get(key).cloned()
    }

    /// Calls `f` with a reference to the value, avoiding the clone [`Cache::get`] makes.
    ///
    /// `f` runs under the shard's read lock.
    pub fn peek_with<Q, R, F>(&self, key: &Q, f: F) -> Option<R>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        F: FnOnce(&V) -> R,
    {
        self.shard(key).read().get(key).map(f)
    }

    /// Returns a clone of the value and renews the entry in the same locked step.
    ///
    /// Renewing moves an expiring entry's deadline and promotes a bounded entry to most recently
    /// used.
    pub fn get_renew<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone,
    {
        self.shard(key).write().get_renew(key).cloned()
    }

    pub fn has<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.shard(key).read().contains_key(key)
    }

    /// Inserts a key-value pair, overwriting any existing value.
    ///
    /// If the cache did not have this key present, [`None`] is returned. If it did, the value is
    /// updated, the entry renewed, and the old value returned. Inserting into a full bounded shard
    /// first evicts that shard's least recently used entry.
    pub fn set(&self, key: K, value: V) -> Option<V> {
        let mut shard = self.shard(&key).write();
        shard.set(key, value, |key, value| self.notify(key, value))
    }

    /// Inserts a key-value pair only if the key is absent.
    ///
    /// Fails with [`CacheError::DuplicateKey`] otherwise, leaving the existing entry unchanged.
    /// The check and the insert happen under one lock.
    pub fn add(&self, key: K, value: V) -> Result<(), CacheError> {
        let mut shard = self.shard(&key).write();
        shard.add(key, value, |key, value| self.notify(key, value))
    }

    /// Replaces the value of an existing key and renews the entry, returning the old value.
    ///
    /// Fails with [`CacheError::KeyNotFound`] if the key is absent; nothing is inserted then.
    pub fn update<Q>(&self, key: &Q, value: V) -> Result<V, CacheError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.shard(key).write().update(key, value)
    }

    /// Updates the key if present and inserts it otherwise, within a single lock scope.
    ///
    /// Two concurrent callers can never both observe the key as absent and both insert.
    pub fn set_or_update(&self, key: K, value: V) -> Option<V> {
        let mut shard = self.shard(&key).write();
        shard.set(key, value, |key, value| self.notify(key, value))
    }

    /// Removes the key and returns its value. The eviction listener is not called.
    pub fn delete<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.shard(key)
            .write()
            .remove(key)
            .map(|(_, value)| value)
    }

    /// Removes the key and hands the removed pair to the eviction listener.
    ///
    /// Returns whether the key was present.
    pub fn delete_callback<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let mut shard = self.shard(key).write();
        match shard.remove(key) {
            Some((key, value)) => {
                self.notify(key, value);
                true
            }
            None => false,
        }
    }

    /// Renews the entry without reading it. Returns whether the key was present.
    pub fn renew<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.shard(key).write().renew(key)
    }

    /// Returns whether the entry's deadline has passed.
    ///
    /// Always `false` for absent keys and for caches that do not expire. Has no side effects.
    pub fn is_expired<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let now = Instant::now();
        self.shard(key).read().is_expired(key, now)
    }

    /// Removes every entry that is expired at the time of the call, handing each removed pair to
    /// the eviction listener. Returns the number of removed entries.
    ///
    /// Shards are swept one after another, each under its own write lock. Nothing drives this
    /// sweep on a timer; call it from the host application as often as staleness requires.
    pub fn delete_expired(&self) -> usize {
        if !P::EXPIRES {
            return 0;
        }

        let now = Instant::now();
        let removed: usize = self
            .shards
            .iter()
            .map(|shard| {
                shard
                    .write()
                    .remove_expired(now, |key, value| self.notify(key, value))
            })
            .sum();

        if removed > 0 {
            debug!(removed, "expired entries swept");
        }

        removed
    }

    /// Inserts every pair through [`Cache::set`]. Returns the number of pairs inserted.
    pub fn set_many<I>(&self, entries: I) -> usize
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut inserted = 0;
        for (key, value) in entries {
            self.set(key, value);
            inserted += 1;
        }
        inserted
    }

    /// Index of the shard owning `key`. Stable for the lifetime of the cache.
    pub fn shard_index<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.router.index(key)
    }

    /// Number of entries in the shard owning `key`.
    pub fn shard_len<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.shard(key).read().len()
    }

    /// Capacity of the shard owning `key`: a hard limit for bounded caches, a presizing hint
    /// otherwise.
    pub fn shard_capacity<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.shard(key).read().capacity()
    }

    /// Free slots left in the shard owning `key`, read under a single lock.
    ///
    /// Only bounded caches enforce the shard capacity; for the other variants this merely reports
    /// how far the shard is from its presizing hint.
    pub fn shard_remaining<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let shard = self.shard(key).read();
        shard.capacity().saturating_sub(shard.len())
    }

    fn shard<Q>(&self, key: &Q) -> &RwLock<Shard<K, V, P, S>>
    where
        Q: ?Sized + Hash,
    {
        &self.shards[self.router.index(key)]
    }
}

impl<K, V, P, S> Cache<K, V, P, S>
where
    P: Policy<K>,
    S: BuildHasher,
{
    /// Number of entries across all shards.
    pub fn count(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.read().len() == 0)
    }

    /// Removes every entry, handing each removed pair to the eviction listener. Returns the
    /// number of removed entries.
    pub fn flush(&self) -> usize {
        let removed: usize = self
            .shards
            .iter()
            .map(|shard| shard.write().drain(|key, value| self.notify(key, value)))
            .sum();

        debug!(removed, "cache flushed");
        removed
    }

    /// Removes every entry without calling the eviction listener.
    pub fn clear(&self) {
        for shard in &self.shards {
            shard.write().clear();
        }

        debug!("cache cleared");
    }

    /// Calls `f` for every entry, one shard at a time under that shard's read lock.
    ///
    /// `f` must not write to the same cache.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V),
    {
        for shard in &self.shards {
            let shard = shard.read();
            for (key, value) in shard.iter() {
                f(key, value);
            }
        }
    }

    pub fn shard_count(&self) -> usize {
        self.router.shard_count()
    }

    /// Number of entries per shard, in shard order.
    pub fn shard_lens(&self) -> Vec<usize> {
        self.shards.iter().map(|shard| shard.read().len()).collect()
    }

    /// Total capacity the cache was created with.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The time-to-live applied on every write and renewal, [`None`] for caches that never expire.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    fn notify(&self, key: K, value: V) {
        if let Some(on_evict) = &self.on_evict {
            on_evict(key, value);
        }
    }
}

impl<K, V, P, S> Cache<K, V, P, S>
where
    P: Policy<K>,
    S: BuildHasher,
{
    /// Returns the counters collected since the previous call and resets them.
    pub fn stats(&self) -> Stats {
        let mut stats = Stats::default();

        let millis_elapsed = {
            let mut guard = self.metrics_last_accessed.lock();
            let millis_elapsed = guard.elapsed().as_millis();
            *guard = Instant::now();
            millis_elapsed
        };

        stats.millis_elapsed = millis_elapsed;

        for shard in &self.shards {
            shard.read().counters().drain_into(&mut stats);
        }

        stats
    }
}

#[cfg(feature = "serde")]
impl<K, V, P, S> Cache<K, V, P, S>
where
    K: Clone + Eq + Hash + serde::de::DeserializeOwned,
    V: serde::de::DeserializeOwned,
    P: Policy<K>,
    S: BuildHasher,
{
    /// Decodes a JSON object and inserts every member through [`Cache::set`].
    ///
    /// Returns the number of inserted pairs. Nothing is inserted if decoding fails.
    pub fn load_json(&self, json: &str) -> Result<usize, serde_json::Error> {
        let entries: std::collections::HashMap<K, V> = serde_json::from_str(json)?;
        Ok(self.set_many(entries))
    }
}

impl<K, V, P, S> fmt::Debug for Cache<K, V, P, S>
where
    P: Policy<K>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("policy", &P::NAME)
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .field("shards", &self.shards.len())
            .field("on_evict", &self.on_evict.is_some())
            .finish_non_exhaustive()
    }
}
