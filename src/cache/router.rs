use std::hash::{BuildHasher, Hash};

/// Maps keys to shard indices with the cache's seeded hasher.
///
/// The mapping depends only on the key and the hasher state, so a key's shard never changes for
/// the lifetime of a cache.
#[derive(Debug, Clone)]
pub(crate) struct ShardRouter<S> {
    hash_builder: S,
    shards: usize,
}

impl<S> ShardRouter<S> {
    /// `shards` must be non-zero; the builder rejects zero before a router is created.
    pub(crate) fn new(hash_builder: S, shards: usize) -> Self {
        debug_assert!(shards > 0, "a router needs at least one shard");
        Self {
            hash_builder,
            shards,
        }
    }

    pub(crate) fn shard_count(&self) -> usize {
        self.shards
    }
}

impl<S: BuildHasher> ShardRouter<S> {
    pub(crate) fn index<Q>(&self, key: &Q) -> usize
    where
        Q: ?Sized + Hash,
    {
        let hash = self.hash_builder.hash_one(key);
        (fold(hash) % self.shards as u64) as usize
    }
}

// Shard tables hash with a clone of the same builder and pick buckets from the low bits, so the
// shard choice mixes in the high half to stay independent of them.
fn fold(hash: u64) -> u64 {
    hash ^ (hash >> 32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::RandomState;

    fn seeded() -> RandomState {
        RandomState::with_seeds(1, 2, 3, 4)
    }

    #[test]
    fn it_routes_deterministically() {
        // given
        let router = ShardRouter::new(RandomState::new(), 16);

        // when
        let first = router.index("user:123");
        let second = router.index("user:123");

        // then
        assert_eq!(first, second);
        assert!(first < 16);
    }

    #[test]
    fn it_routes_equally_for_equal_seeds() {
        // given
        let left = ShardRouter::new(seeded(), 8);
        let right = ShardRouter::new(seeded(), 8);

        // when
        let routes: Vec<(usize, usize)> = (0..100)
            .map(|key| (left.index(&key), right.index(&key)))
            .collect();

        // then
        assert!(routes.iter().all(|(l, r)| l == r));
    }

    #[test]
    fn it_routes_borrowed_keys_like_owned_keys() {
        // given
        let router = ShardRouter::new(seeded(), 8);
        let owned = String::from("key");

        // when
        let by_owned = router.index(&owned);
        let by_borrowed = router.index("key");

        // then
        assert_eq!(by_owned, by_borrowed);
    }

    #[test]
    fn it_uses_every_shard() {
        // given
        let router = ShardRouter::new(seeded(), 8);
        let mut counts = [0usize; 8];

        // when
        for key in 0..8_000u64 {
            counts[router.index(&key)] += 1;
        }

        // then
        assert!(counts.iter().all(|count| *count > 500), "{counts:?}");
    }

    #[test]
    fn it_always_picks_the_only_shard() {
        // given
        let router = ShardRouter::new(RandomState::new(), 1);

        // when
        let indices: Vec<usize> = (0..50).map(|key| router.index(&key)).collect();

        // then
        assert!(indices.iter().all(|idx| *idx == 0));
        assert_eq!(router.shard_count(), 1);
    }
}
