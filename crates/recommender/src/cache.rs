//! Bounded cache with uniform random eviction
//!
//! When the cache is full, inserting a new key evicts one existing key chosen
//! uniformly at random. Lookups do not track recency, so a key that is about
//! to be needed again can be evicted; callers must tolerate recomputation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use review_graph_core::{ReviewGraphError, Result};

/// Fixed-capacity map with O(1) random eviction
///
/// Keys are mirrored in a dense vector so a victim can be drawn by index;
/// each map entry remembers its slot in that vector for `swap_remove`.
pub struct RandomEvictionCache<K, V, R = StdRng> {
    capacity: usize,
    entries: HashMap<K, (V, usize)>,
    keys: Vec<K>,
    rng: R,
}

impl<K, V> RandomEvictionCache<K, V, StdRng>
where
    K: Eq + Hash + Clone,
{
    /// Create a cache seeded from OS entropy
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_rng(capacity, StdRng::from_entropy())
    }
}

impl<K, V, R> RandomEvictionCache<K, V, R>
where
    K: Eq + Hash + Clone,
    R: Rng,
{
    /// Create a cache drawing eviction victims from `rng`
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` when `capacity` is zero.
    pub fn with_rng(capacity: usize, rng: R) -> Result<Self> {
        if capacity == 0 {
            return Err(ReviewGraphError::validation_field(
                "cache capacity must be at least 1",
                "capacity",
            ));
        }

        Ok(Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            keys: Vec::with_capacity(capacity),
            rng,
        })
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key).map(|(value, _)| value)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains_key(key)
    }

    /// Insert a value, evicting a random entry first if the cache is full
    ///
    /// Replacing the value of a key already present never evicts. Returns the
    /// evicted entry, if any.
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(slot) = self.entries.get_mut(&key) {
            slot.0 = value;
            return None;
        }

        let evicted = if self.keys.len() >= self.capacity {
            self.evict_random()
        } else {
            None
        };

        self.entries.insert(key.clone(), (value, self.keys.len()));
        self.keys.push(key);

        evicted
    }

    fn evict_random(&mut self) -> Option<(K, V)> {
        if self.keys.is_empty() {
            return None;
        }

        let victim_slot = self.rng.gen_range(0..self.keys.len());
        let victim = self.keys.swap_remove(victim_slot);

        // The former last key now lives in `victim_slot`
        if let Some(moved) = self.keys.get(victim_slot) {
            if let Some(entry) = self.entries.get_mut(moved) {
                entry.1 = victim_slot;
            }
        }

        self.entries
            .remove(&victim)
            .map(|(value, _)| (victim, value))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand_chacha::ChaCha8Rng;

    fn seeded(capacity: usize) -> RandomEvictionCache<String, u32, ChaCha8Rng> {
        RandomEvictionCache::with_rng(capacity, ChaCha8Rng::seed_from_u64(7)).unwrap()
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result: Result<RandomEvictionCache<String, u32>> = RandomEvictionCache::new(0);
        assert!(result.is_err());
    }

    #[test]
    fn test_insert_below_capacity_keeps_everything() {
        let mut cache = seeded(3);
        assert!(cache.insert("a".to_string(), 1).is_none());
        assert!(cache.insert("b".to_string(), 2).is_none());
        assert!(cache.insert("c".to_string(), 3).is_none());

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get("a"), Some(&1));
        assert_eq!(cache.get("c"), Some(&3));
    }

    #[test]
    fn test_insert_when_full_evicts_exactly_one() {
        let mut cache = seeded(2);
        cache.insert("a".to_string(), 1);
        cache.insert("b".to_string(), 2);

        let (evicted, _) = cache.insert("c".to_string(), 3).unwrap();

        assert_eq!(cache.len(), 2);
        assert!(evicted == "a" || evicted == "b");
        assert!(!cache.contains_key(evicted.as_str()));
        assert_eq!(cache.get("c"), Some(&3));
    }

    #[test]
    fn test_replacing_existing_key_does_not_evict() {
        let mut cache = seeded(2);
        cache.insert("a".to_string(), 1);
        cache.insert("b".to_string(), 2);

        assert!(cache.insert("a".to_string(), 10).is_none());
        assert_eq!(cache.get("a"), Some(&10));
        assert_eq!(cache.get("b"), Some(&2));
    }

    #[test]
    fn test_capacity_one_always_holds_latest() {
        let mut cache = seeded(1);
        cache.insert("a".to_string(), 1);
        let (evicted, value) = cache.insert("b".to_string(), 2).unwrap();

        assert_eq!((evicted.as_str(), value), ("a", 1));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("b"), Some(&2));
    }

    #[test]
    fn test_same_seed_same_evictions() {
        let run = || {
            let mut cache = seeded(3);
            (0..20)
                .filter_map(|i| cache.insert(format!("k{}", i), i).map(|(k, _)| k))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    proptest! {
        #[test]
        fn prop_size_never_exceeds_capacity(
            capacity in 1usize..8,
            keys in proptest::collection::vec(0u8..32, 0..64),
        ) {
            let mut cache = RandomEvictionCache::with_rng(capacity, ChaCha8Rng::seed_from_u64(1)).unwrap();

            for key in keys {
                let before: Vec<u8> = cache.keys.clone();
                let was_present = cache.contains_key(&key);
                let evicted = cache.insert(key, ());

                prop_assert!(cache.len() <= capacity);
                prop_assert!(cache.contains_key(&key));

                if was_present || before.len() < capacity {
                    prop_assert!(evicted.is_none());
                } else {
                    let (victim, _) = evicted.unwrap();
                    prop_assert!(before.contains(&victim));
                    prop_assert!(!cache.contains_key(&victim));
                    prop_assert_eq!(cache.len(), capacity);
                }

                for (slot, k) in cache.keys.iter().enumerate() {
                    prop_assert_eq!(cache.entries[k].1, slot);
                }
            }
        }
    }
}
