use crate::cache::RandomState;
use crate::cache::entry::Entry;
use crate::cache::policy::Policy;
use crate::cache::stats::Counters;
use crate::error::CacheError;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};
use std::mem;
use std::time::Instant;
use tracing::trace;

/// One independently locked partition of the key space.
///
/// Every `&mut self` method keeps the table and the policy bookkeeping in step, so the pair is
/// consistent whenever the surrounding write lock is released.
pub(crate) struct Shard<K, V, P: Policy<K>, S = RandomState> {
    table: HashMap<K, Entry<V, P::Meta>, S>,
    policy: P,
    capacity: usize,
    counters: Counters,
}

impl<K, V, P, S> Shard<K, V, P, S>
where
    P: Policy<K>,
    S: BuildHasher,
{
    pub(crate) fn with_capacity_and_hasher(capacity: usize, policy: P, hash_builder: S) -> Self {
        Self {
            table: HashMap::with_capacity_and_hasher(capacity, hash_builder),
            policy,
            capacity,
            counters: Counters::default(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.table.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    #[cfg(test)]
    pub(crate) fn policy(&self) -> &P {
        &self.policy
    }

    pub(crate) fn counters(&self) -> &Counters {
        &self.counters
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.table.iter().map(|(key, entry)| (key, entry.value()))
    }

    /// Removes every entry without reporting it.
    pub(crate) fn clear(&mut self) {
        self.table.clear();
        self.policy.reset();
    }

    /// Hands every entry to `on_evict` and leaves the shard empty.
    pub(crate) fn drain<F>(&mut self, mut on_evict: F) -> usize
    where
        F: FnMut(K, V),
    {
        let removed = self.table.len();
        self.policy.reset();
        for (key, entry) in self.table.drain() {
            on_evict(key, entry.into_value());
        }
        removed
    }
}

impl<K, V, P, S> Shard<K, V, P, S>
where
    K: Clone + Eq + Hash,
    P: Policy<K>,
    S: BuildHasher,
{
    pub(crate) fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let entry = self.table.get(key);
        self.counters.record_lookup(entry.is_some());
        entry.map(Entry::value)
    }

    pub(crate) fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table.contains_key(key)
    }

    /// Reads a value and marks it as used in the same step.
    pub(crate) fn get_renew<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let entry = self.table.get_mut(key);
        self.counters.record_lookup(entry.is_some());

        let entry = entry?;
        self.policy.touch(&mut entry.meta);
        Some(entry.value())
    }

    /// Inserts or overwrites. Overwriting counts as a use of the entry.
    pub(crate) fn set<F>(&mut self, key: K, value: V, on_evict: F) -> Option<V>
    where
        F: FnOnce(K, V),
    {
        if let Some(entry) = self.table.get_mut(&key) {
            self.policy.touch(&mut entry.meta);
            return Some(mem::replace(&mut entry.value, value));
        }

        self.insert_new(key, value, on_evict);
        None
    }

    pub(crate) fn add<F>(&mut self, key: K, value: V, on_evict: F) -> Result<(), CacheError>
    where
        F: FnOnce(K, V),
    {
        if self.table.contains_key(&key) {
            return Err(CacheError::DuplicateKey);
        }

        self.insert_new(key, value, on_evict);
        Ok(())
    }

    pub(crate) fn update<Q>(&mut self, key: &Q, value: V) -> Result<V, CacheError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let entry = self.table.get_mut(key).ok_or(CacheError::KeyNotFound)?;
        self.policy.touch(&mut entry.meta);
        Ok(mem::replace(&mut entry.value, value))
    }

    pub(crate) fn remove<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let (key, entry) = self.table.remove_entry(key)?;
        self.policy.forget(&entry.meta);
        Some((key, entry.into_value()))
    }

    pub(crate) fn renew<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        match self.table.get_mut(key) {
            Some(entry) => {
                self.policy.touch(&mut entry.meta);
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_expired<Q>(&self, key: &Q, now: Instant) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table
            .get(key)
            .is_some_and(|entry| self.policy.is_expired(&entry.meta, now))
    }

    /// Removes every entry whose deadline lies before `now`, reporting each to `on_evict`.
    pub(crate) fn remove_expired<F>(&mut self, now: Instant, mut on_evict: F) -> usize
    where
        F: FnMut(K, V),
    {
        if !P::EXPIRES {
            return 0;
        }

        let policy = &self.policy;
        let expired: Vec<(K, Entry<V, P::Meta>)> = self
            .table
            .extract_if(|_, entry| policy.is_expired(&entry.meta, now))
            .collect();

        let removed = expired.len();
        for (key, entry) in expired {
            self.policy.forget(&entry.meta);
            self.counters.increment_expired_count();
            on_evict(key, entry.into_value());
        }

        removed
    }

    fn insert_new<F>(&mut self, key: K, value: V, on_evict: F)
    where
        F: FnOnce(K, V),
    {
        if let Some(victim) = self.policy.victim() {
            let entry = self
                .table
                .remove(&victim)
                .expect("a recency slot must belong to a live key");
            self.counters.increment_eviction_count();
            trace!(policy = P::NAME, "evicted least recently used entry");
            on_evict(victim, entry.into_value());
        }

        let meta = self.policy.admit(&key);
        self.table.insert(key, Entry::new(value, meta));
    }
}
