use std::sync::atomic::{AtomicU64, Ordering};

/// Counters collected since the previous call to [`Cache::stats`](crate::Cache::stats).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Stats {
    pub miss_count: u64,
    pub hit_count: u64,
    /// Entries dropped to make room in a full bounded shard.
    pub eviction_count: u64,
    /// Entries removed by [`Cache::delete_expired`](crate::Cache::delete_expired).
    pub expired_count: u64,
    pub millis_elapsed: u128,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    hit_count: AtomicU64,
    miss_count: AtomicU64,
    eviction_count: AtomicU64,
    expired_count: AtomicU64,
}

impl Counters {
    pub(crate) fn record_lookup(&self, hit: bool) {
        if hit {
            self.hit_count.fetch_add(1, Ordering::AcqRel);
        } else {
            self.miss_count.fetch_add(1, Ordering::AcqRel);
        }
    }

    pub(crate) fn increment_eviction_count(&self) {
        self.eviction_count.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn increment_expired_count(&self) {
        self.expired_count.fetch_add(1, Ordering::AcqRel);
    }

    /// Adds the current counts to `stats` and resets them. Increments racing with the drain land
    /// either in this snapshot or in the next one, never in neither.
    pub(crate) fn drain_into(&self, stats: &mut Stats) {
        stats.hit_count += self.hit_count.swap(0, Ordering::AcqRel);
        stats.miss_count += self.miss_count.swap(0, Ordering::AcqRel);
        stats.eviction_count += self.eviction_count.swap(0, Ordering::AcqRel);
        stats.expired_count += self.expired_count.swap(0, Ordering::AcqRel);
    }
}
