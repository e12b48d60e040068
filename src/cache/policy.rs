//! Per-shard eviction policies.
//!
//! A policy owns whatever state a shard needs beyond its table and decides the metadata stored
//! next to every value:
//!
//! - [`Unbounded`] keeps nothing; entries live until they are deleted.
//! - [`Expiring`] stamps each entry with an absolute deadline. Expiration is lazy: stale entries
//!   stay readable until [`Cache::delete_expired`](crate::Cache::delete_expired) sweeps them.
//! - [`Bounded`] threads every key into a bounded recency list and hands out the least recently
//!   touched key as the victim once the shard is full.
//!
//! The trait is sealed; the three policies above are the only implementations.

use crate::cache::recency_list::{RecencyList, SlotId};
use std::time::{Duration, Instant};

mod sealed {
    pub trait Sealed {}
}

/// Eviction behaviour of a single shard.
///
/// All methods are called while the shard's write lock is held, except [`Policy::is_expired`],
/// which only needs a read lock.
pub trait Policy<K>: sealed::Sealed {
    /// Metadata stored next to every value.
    type Meta;

    /// Human readable policy name, used in logs.
    const NAME: &'static str;

    /// Whether entries can ever report themselves as expired.
    const EXPIRES: bool = false;

    /// Registers a newly inserted key. Callers must have made room with [`Policy::victim`] first.
    #[doc(hidden)]
    fn admit(&mut self, key: &K) -> Self::Meta;

    /// Marks an existing entry as used right now.
    #[doc(hidden)]
    fn touch(&mut self, meta: &mut Self::Meta);

    /// Drops the bookkeeping of an entry that left the table.
    #[doc(hidden)]
    fn forget(&mut self, meta: &Self::Meta);

    /// Picks and unregisters the key that has to go before another key can be admitted.
    #[doc(hidden)]
    fn victim(&mut self) -> Option<K>;

    #[doc(hidden)]
    fn is_expired(&self, _meta: &Self::Meta, _now: Instant) -> bool {
        false
    }

    /// Forgets every registered key.
    #[doc(hidden)]
    fn reset(&mut self);
}

/// No eviction. Capacity is only a preallocation hint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Unbounded;

impl sealed::Sealed for Unbounded {}

impl<K> Policy<K> for Unbounded {
    type Meta = ();

    const NAME: &'static str = "unbounded";

    fn admit(&mut self, _key: &K) {}

    fn touch(&mut self, _meta: &mut ()) {}

    fn forget(&mut self, _meta: &()) {}

    fn victim(&mut self) -> Option<K> {
        None
    }

    fn reset(&mut self) {}
}

/// Time-to-live expiration.
///
/// Every write, renewal and renewing read moves the entry's deadline to `now + ttl`. An entry is
/// expired once `now` is past its deadline. A ttl too large to be represented as an [`Instant`]
/// never expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiring {
    ttl: Duration,
}

impl Expiring {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    fn deadline(&self) -> Option<Instant> {
        Instant::now().checked_add(self.ttl)
    }
}

impl sealed::Sealed for Expiring {}

impl<K> Policy<K> for Expiring {
    type Meta = Option<Instant>;

    const NAME: &'static str = "expiring";
    const EXPIRES: bool = true;

    fn admit(&mut self, _key: &K) -> Option<Instant> {
        self.deadline()
    }

    fn touch(&mut self, meta: &mut Option<Instant>) {
        *meta = self.deadline();
    }

    fn forget(&mut self, _meta: &Option<Instant>) {}

    fn victim(&mut self) -> Option<K> {
        None
    }

    fn is_expired(&self, meta: &Option<Instant>, now: Instant) -> bool {
        meta.is_some_and(|deadline| now > deadline)
    }

    fn reset(&mut self) {}
}

/// Capacity-bound, least recently used eviction within one shard.
///
/// Writes, updates, renewals and renewing reads promote a key to most recently used. Plain reads
/// do not. Ordering is tracked per shard only.
#[derive(Debug)]
pub struct Bounded<K> {
    order: RecencyList<K>,
}

impl<K> Bounded<K> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            order: RecencyList::with_capacity(capacity),
        }
    }

    /// Keys from least to most recently touched.
    #[cfg(test)]
    pub(crate) fn keys(&self) -> impl Iterator<Item = &K> {
        self.order.iter()
    }
}

impl<K> sealed::Sealed for Bounded<K> {}

impl<K: Clone> Policy<K> for Bounded<K> {
    type Meta = SlotId;

    const NAME: &'static str = "bounded";

    fn admit(&mut self, key: &K) -> SlotId {
        self.order
            .push_back(key.clone())
            .expect("room must be made before a key is admitted")
    }

    fn touch(&mut self, meta: &mut SlotId) {
        self.order.move_to_back(*meta);
    }

    fn forget(&mut self, meta: &SlotId) {
        self.order.remove(*meta);
    }

    fn victim(&mut self) -> Option<K> {
        if self.order.is_full() {
            self.order.pop_front()
        } else {
            None
        }
    }

    fn reset(&mut self) {
        self.order.clear();
    }
}
