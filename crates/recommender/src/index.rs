//! Dense index mappings between domain identifiers and matrix positions

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use review_graph_core::ItemKey;

/// Bijection between keys and `0..len` positions
///
/// Positions follow first-occurrence order of the input; repeated keys keep
/// their first position.
#[derive(Debug, Clone)]
pub struct DenseIndex<K> {
    positions: HashMap<K, usize>,
    keys: Vec<K>,
}

/// Reviewer id to matrix row
pub type ReviewerIndex = DenseIndex<String>;

/// Item identity to matrix column
pub type ItemIndex = DenseIndex<ItemKey>;

impl<K: Eq + Hash + Clone> DenseIndex<K> {
    pub fn from_keys<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
    {
        let mut index = Self {
            positions: HashMap::new(),
            keys: Vec::new(),
        };

        for key in keys {
            if !index.positions.contains_key(&key) {
                index.positions.insert(key.clone(), index.keys.len());
                index.keys.push(key);
            }
        }

        index
    }

    pub fn position<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.positions.get(key).copied()
    }

    pub fn key(&self, position: usize) -> Option<&K> {
        self.keys.get(position)
    }

    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
