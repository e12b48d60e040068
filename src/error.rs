//! Error types.
//!
//! [`CacheError`] is returned by operations whose precondition on the key does not hold; the cache
//! is left untouched in that case. [`ConfigError`] is returned by the fallible `try_build*`
//! constructors of [`CacheBuilder`](crate::CacheBuilder). The panicking constructors fail fast
//! with the same message.

/// Recoverable error of a single-key operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// [`Cache::add`](crate::Cache::add) found the key already present.
    #[error("an entry with the given key already exists")]
    DuplicateKey,
    /// [`Cache::update`](crate::Cache::update) found no entry for the key.
    #[error("no entry exists for the given key")]
    KeyNotFound,
}

/// Invalid construction parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The shard count was zero, either explicitly or derived from a zero capacity.
    #[error("shard count must be at least 1")]
    ZeroShards,
    /// More shards than capacity would leave some shards without a single slot.
    #[error("shard count {shards} exceeds capacity {capacity}")]
    ShardsExceedCapacity { shards: usize, capacity: usize },
    /// [`CacheBuilder::build_expiring`](crate::CacheBuilder::build_expiring) was called without
    /// [`CacheBuilder::ttl`](crate::CacheBuilder::ttl).
    #[error("an expiring cache requires a ttl")]
    MissingTtl,
}
