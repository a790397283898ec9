//! Pairwise reviewer similarity
//!
//! Compares the article sets of a fixed list of reviewers pair by pair and
//! appends every strictly positive Jaccard similarity to the similarity
//! artifact. Article sets are fetched on demand and kept in a bounded
//! random-eviction cache.

use rand::rngs::StdRng;
use rand::Rng;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use review_graph_core::{Result, ReviewRecord, ReviewerSummary};

use crate::artifact::{self, SimilarityRecord};
use crate::cache::RandomEvictionCache;
use crate::store::ReviewStore;

/// Distinct `"asin-type_id"` keys of every item a reviewer reviewed
pub type ArticleSet = HashSet<String>;

/// Build the article set of a reviewer from their reviews
pub fn article_set(reviews: &[ReviewRecord]) -> ArticleSet {
    reviews.iter().map(|r| r.item_key().to_string()).collect()
}

/// Jaccard similarity `|A ∩ B| / |A ∪ B|`
///
/// Returns `None` when both sets are empty, where the ratio is undefined.
pub fn jaccard_similarity(a: &ArticleSet, b: &ArticleSet) -> Option<f64> {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    let intersection = small.iter().filter(|key| large.contains(*key)).count();
    let union = a.len() + b.len() - intersection;

    if union == 0 {
        return None;
    }

    Some(intersection as f64 / union as f64)
}

/// Counters collected during one similarity run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimilarityRunStats {
    pub users: usize,
    pub pairs_compared: usize,
    pub records_written: usize,
    /// Pairs skipped because both article sets were empty
    pub undefined_pairs: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub cache_evictions: usize,
}

/// Pairwise Jaccard similarity engine
pub struct SimilarityEngine<R = StdRng> {
    store: Arc<dyn ReviewStore>,
    cache: RandomEvictionCache<String, Arc<ArticleSet>, R>,
}

impl SimilarityEngine<StdRng> {
    /// Engine with an entropy-seeded eviction cache of `capacity` entries
    pub fn new(store: Arc<dyn ReviewStore>, capacity: usize) -> Result<Self> {
        Ok(Self {
            store,
            cache: RandomEvictionCache::new(capacity)?,
        })
    }
}

impl<R: Rng> SimilarityEngine<R> {
    /// Engine whose cache evicts using `rng`
    pub fn with_rng(store: Arc<dyn ReviewStore>, capacity: usize, rng: R) -> Result<Self> {
        Ok(Self {
            store,
            cache: RandomEvictionCache::with_rng(capacity, rng)?,
        })
    }

    /// Compare every unordered pair of `users` and write positive similarities
    ///
    /// The artifact at `path` is truncated first, so reruns overwrite earlier
    /// output. A store failure aborts the run; lines already appended stay on
    /// disk.
    #[instrument(skip(self, users, path), fields(users = users.len(), path = %path.display()))]
    pub async fn run(
        &mut self,
        users: &[ReviewerSummary],
        path: &Path,
    ) -> Result<SimilarityRunStats> {
        artifact::truncate(path)?;

        let mut stats = SimilarityRunStats {
            users: users.len(),
            ..SimilarityRunStats::default()
        };

        for (i, user1) in users.iter().enumerate() {
            // Held outside the cache: comparing against later users may evict it
            let set1 = self.article_set_for(&user1.reviewer_id, &mut stats).await?;

            for user2 in &users[i + 1..] {
                let set2 = self.article_set_for(&user2.reviewer_id, &mut stats).await?;
                stats.pairs_compared += 1;

                match jaccard_similarity(&set1, &set2) {
                    Some(similarity) if similarity > 0.0 => {
                        let record = SimilarityRecord::new(
                            user1.reviewer_id.clone(),
                            user2.reviewer_id.clone(),
                            similarity,
                        );
                        artifact::append_record(path, &record)?;
                        stats.records_written += 1;
                    }
                    Some(_) => {}
                    None => {
                        debug!(
                            user1 = %user1.reviewer_id,
                            user2 = %user2.reviewer_id,
                            "Skipping pair with two empty article sets"
                        );
                        stats.undefined_pairs += 1;
                    }
                }
            }
        }

        info!(
            pairs = stats.pairs_compared,
            written = stats.records_written,
            cache_hits = stats.cache_hits,
            cache_misses = stats.cache_misses,
            "Similarity run complete"
        );

        Ok(stats)
    }

    async fn article_set_for(
        &mut self,
        reviewer_id: &str,
        stats: &mut SimilarityRunStats,
    ) -> Result<Arc<ArticleSet>> {
        if let Some(set) = self.cache.get(reviewer_id) {
            stats.cache_hits += 1;
            return Ok(Arc::clone(set));
        }

        stats.cache_misses += 1;
        let reviews = self.store.reviews_by_reviewer(reviewer_id).await?;
        let set = Arc::new(article_set(&reviews));

        let evicted = self.cache.insert(reviewer_id.to_string(), Arc::clone(&set));
        if let Some((evicted, _)) = evicted {
            stats.cache_evictions += 1;
            debug!(%evicted, inserted = reviewer_id, "Evicted article set");
        }

        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn set(keys: &[&str]) -> ArticleSet {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_jaccard_example() {
        let u1 = set(&["a-1", "b-1"]);
        let u2 = set(&["a-1", "c-1"]);
        let similarity = jaccard_similarity(&u1, &u2).unwrap();
        assert!((similarity - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_jaccard_empty_sets() {
        let empty = ArticleSet::new();
        let u1 = set(&["a-1"]);

        assert_eq!(jaccard_similarity(&empty, &empty), None);
        assert_eq!(jaccard_similarity(&u1, &empty), Some(0.0));
    }

    #[test]
    fn test_article_set_distinguishes_types() {
        let reviews = vec![
            ReviewRecord::new("A", "X1", 0, 5.0).unwrap(),
            ReviewRecord::new("A", "X1", 1, 4.0).unwrap(),
            ReviewRecord::new("A", "X1", 1, 3.0).unwrap(),
        ];

        assert_eq!(article_set(&reviews), set(&["X1-0", "X1-1"]));
    }

    fn arb_set() -> impl Strategy<Value = ArticleSet> {
        proptest::collection::hash_set("[a-e]-[0-2]", 1..8)
    }

    proptest! {
        #[test]
        fn prop_jaccard_bounds_and_symmetry(a in arb_set(), b in arb_set()) {
            let ab = jaccard_similarity(&a, &b).unwrap();
            let ba = jaccard_similarity(&b, &a).unwrap();

            prop_assert_eq!(ab, ba);
            prop_assert!((0.0..=1.0).contains(&ab));
            prop_assert_eq!(ab == 1.0, a == b);
            prop_assert_eq!(ab == 0.0, a.is_disjoint(&b));

            let expected = a.intersection(&b).count() as f64 / a.union(&b).count() as f64;
            prop_assert!((ab - expected).abs() < 1e-12);
        }
    }
}
