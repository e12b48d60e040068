//! A sharded, thread-safe, in-process key/value cache.
//!
//! Keys are spread over a fixed number of independently locked shards by a seeded hash, so
//! threads working on different shards never wait for each other.
//!
//! # Features
//!
//! - Generic keys and values, looked up by any borrowed form of the key
//! - Optional time-to-live with lazy expiration and an explicit sweep
//! - Optional per-shard capacity bound with least-recently-used eviction
//! - An eviction listener receiving every entry the cache drops on its own
//! - No unsafe code
//!
//! # Variants
//!
//! | Constructor | Type | Behaviour |
//! |---|---|---|
//! | [`Cache::new`] | [`Cache`] | entries stay until deleted |
//! | [`Cache::with_ttl`] | [`ExpiringCache`] | entries expire a fixed time after their last write or renewal |
//! | [`Cache::bounded`] | [`BoundedCache`] | each shard keeps its `capacity / shards` most recently used entries |
//!
//! [`CacheBuilder`] builds all three and additionally takes an eviction listener and a custom
//! hasher.
//!
//! # Examples
//!
//! Basic usage:
//!
//! ```rust
//! use shard_kv::{Cache, CacheError};
//!
//! let cache = Cache::new(1000, 8);
//!
//! cache.set("key1", "value1");
//! assert_eq!(cache.get("key1"), Some("value1"));
//!
//! assert_eq!(cache.add("key1", "other"), Err(CacheError::DuplicateKey));
//! assert_eq!(cache.update("key2", "other"), Err(CacheError::KeyNotFound));
//! ```
//!
//! Least-recently-used eviction within a shard:
//!
//! ```rust
//! use shard_kv::Cache;
//!
//! let cache = Cache::bounded(2, 1);
//!
//! cache.set("a", 1);
//! cache.set("b", 2);
//! cache.get_renew("a");
//! cache.set("c", 3);
//!
//! assert!(cache.has("a"));
//! assert!(!cache.has("b"));
//! ```
//!
//! Lazy expiration:
//!
//! ```rust
//! use shard_kv::Cache;
//! use std::thread;
//! use std::time::Duration;
//!
//! let cache = Cache::with_ttl(Duration::from_millis(10), 16, 2);
//! cache.set("key", 1);
//!
//! thread::sleep(Duration::from_millis(20));
//!
//! // Expired entries stay readable until they are swept.
//! assert!(cache.is_expired("key"));
//! assert_eq!(cache.get("key"), Some(1));
//!
//! assert_eq!(cache.delete_expired(), 1);
//! assert_eq!(cache.get("key"), None);
//! ```
//!
//! Sharing between threads:
//!
//! ```rust
//! use shard_kv::Cache;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let cache = Arc::new(Cache::new(100, 4));
//! cache.set("key1", "value1");
//!
//! let cache_in_arc = Arc::clone(&cache);
//! let handle = thread::spawn(move || {
//!     cache_in_arc.set("key2", "value2");
//! });
//!
//! handle.join().unwrap();
//!
//! assert_eq!(cache.get("key1"), Some("value1"));
//! assert_eq!(cache.get("key2"), Some("value2"));
//! ```

#![forbid(unsafe_code)]
pub mod builder;
pub mod cache;
pub mod error;

pub use builder::{CacheBuilder, CacheConfig};
pub use cache::policy::{Bounded, Expiring, Policy, Unbounded};
pub use cache::stats::Stats;
pub use cache::{BoundedCache, Cache, ExpiringCache};
pub use error::{CacheError, ConfigError};
