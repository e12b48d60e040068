//! Construction of [`Cache`] variants.
//!
//! The direct constructors on [`Cache`] cover the common cases. [`CacheBuilder`] is needed to
//! register an eviction listener, pick a custom hasher or derive the shard count from the host.

use crate::cache::policy::{Bounded, Expiring, Unbounded};
use crate::cache::{Cache, EvictionListener, RandomState};
use crate::error::ConfigError;
use std::hash::BuildHasher;
use std::num::NonZero;
use std::time::Duration;
use std::{cmp, fmt, thread};

/// Plain construction parameters, e.g. read from a configuration file.
///
/// With the `serde` feature, `ttl` is written in humantime notation such as `"30s"` or `"5m"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CacheConfig {
    pub capacity: usize,
    /// Defaults to four shards per available core, but never more than `capacity`.
    pub shards: Option<usize>,
    #[cfg_attr(feature = "serde", serde(with = "humantime_serde"))]
    pub ttl: Option<Duration>,
}

/// Builder for every [`Cache`] variant.
///
/// ```rust
/// use shard_kv::CacheBuilder;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// let evicted = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&evicted);
///
/// let cache = CacheBuilder::new(2)
///     .shards(1)
///     .on_evict(move |_key: u32, _value: u32| {
///         counter.fetch_add(1, Ordering::Relaxed);
///     })
///     .build_bounded();
///
/// cache.set(1, 1);
/// cache.set(2, 2);
/// cache.set(3, 3);
///
/// assert_eq!(evicted.load(Ordering::Relaxed), 1);
/// assert!(!cache.has(&1));
/// ```
pub struct CacheBuilder<K, V, S = RandomState> {
    capacity: usize,
    shards: Option<usize>,
    ttl: Option<Duration>,
    hash_builder: S,
    on_evict: Option<EvictionListener<K, V>>,
}

impl<K, V> CacheBuilder<K, V, RandomState> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            shards: None,
            ttl: None,
            hash_builder: RandomState::new(),
            on_evict: None,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            shards: config.shards,
            ttl: config.ttl,
            ..Self::new(config.capacity)
        }
    }
}

impl<K, V, S> CacheBuilder<K, V, S> {
    pub fn shards(mut self, shards: usize) -> Self {
        self.shards = Some(shards);
        self
    }

    /// Time-to-live for [`CacheBuilder::build_expiring`]. The other finalizers ignore it.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Replaces the hasher used for routing keys and for the shard tables.
    pub fn with_hasher<T>(self, hash_builder: T) -> CacheBuilder<K, V, T> {
        CacheBuilder {
            capacity: self.capacity,
            shards: self.shards,
            ttl: self.ttl,
            hash_builder,
            on_evict: self.on_evict,
        }
    }

    /// Registers the listener that receives every entry removed by capacity eviction,
    /// [`Cache::delete_callback`], [`Cache::delete_expired`] and [`Cache::flush`].
    ///
    /// The listener runs while the shard's write lock is held. Calling back into the same cache
    /// from it deadlocks.
    pub fn on_evict<F>(mut self, on_evict: F) -> Self
    where
        F: Fn(K, V) + Send + Sync + 'static,
    {
        self.on_evict = Some(Box::new(on_evict));
        self
    }

    fn shard_count(&self) -> Result<usize, ConfigError> {
        let shards = self.shards.unwrap_or_else(|| {
            let available_parallelism = thread::available_parallelism()
                .map(NonZero::get)
                .unwrap_or(1);
            cmp::min(available_parallelism * 4, self.capacity)
        });

        if shards == 0 {
            return Err(ConfigError::ZeroShards);
        }

        if shards > self.capacity {
            return Err(ConfigError::ShardsExceedCapacity {
                shards,
                capacity: self.capacity,
            });
        }

        Ok(shards)
    }
}

impl<K, V, S> CacheBuilder<K, V, S>
where
    S: BuildHasher + Clone,
{
    pub fn try_build(self) -> Result<Cache<K, V, Unbounded, S>, ConfigError> {
        let shards = self.shard_count()?;
        Ok(Cache::from_parts(
            self.capacity,
            shards,
            None,
            self.hash_builder,
            self.on_evict,
            |_| Unbounded,
        ))
    }

    pub fn try_build_expiring(self) -> Result<Cache<K, V, Expiring, S>, ConfigError> {
        let shards = self.shard_count()?;
        let ttl = self.ttl.ok_or(ConfigError::MissingTtl)?;
        Ok(Cache::from_parts(
            self.capacity,
            shards,
            Some(ttl),
            self.hash_builder,
            self.on_evict,
            |_| Expiring::new(ttl),
        ))
    }

    pub fn try_build_bounded(self) -> Result<Cache<K, V, Bounded<K>, S>, ConfigError>
    where
        K: Clone,
    {
        let shards = self.shard_count()?;
        Ok(Cache::from_parts(
            self.capacity,
            shards,
            None,
            self.hash_builder,
            self.on_evict,
            Bounded::with_capacity,
        ))
    }

    /// # Panics
    ///
    /// Panics if the shard count is zero or greater than the capacity.
    pub fn build(self) -> Cache<K, V, Unbounded, S> {
        self.try_build()
            .unwrap_or_else(|err| panic!("invalid cache configuration: {err}"))
    }

    /// # Panics
    ///
    /// Panics if no ttl was set, or if the shard count is zero or greater than the capacity.
    pub fn build_expiring(self) -> Cache<K, V, Expiring, S> {
        self.try_build_expiring()
            .unwrap_or_else(|err| panic!("invalid cache configuration: {err}"))
    }

    /// # Panics
    ///
    /// Panics if the shard count is zero or greater than the capacity.
    pub fn build_bounded(self) -> Cache<K, V, Bounded<K>, S>
    where
        K: Clone,
    {
        self.try_build_bounded()
            .unwrap_or_else(|err| panic!("invalid cache configuration: {err}"))
    }
}

impl<K, V, S: fmt::Debug> fmt::Debug for CacheBuilder<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheBuilder")
            .field("capacity", &self.capacity)
            .field("shards", &self.shards)
            .field("ttl", &self.ttl)
            .field("hash_builder", &self.hash_builder)
            .field("on_evict", &self.on_evict.is_some())
            .finish()
    }
}
