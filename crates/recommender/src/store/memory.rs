//! In-memory store implementations for tests and local runs

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use review_graph_core::{
    ItemKey, ItemPopularity, ProductType, ReviewGraphError, Result, ReviewRecord,
    ReviewerProfile, ReviewerSummary, TypeReviewCount,
};

use super::{GraphStore, ItemCatalog, ReviewStore};
use crate::artifact::SimilarityRecord;
use crate::relations::{sort_shared_pairs, SharedReviewPair, WroteRecord};

/// Review collection backed by a vector
#[derive(Default)]
pub struct InMemoryReviewStore {
    reviews: Vec<ReviewRecord>,
    lookups: AtomicUsize,
}

impl InMemoryReviewStore {
    pub fn new(reviews: Vec<ReviewRecord>) -> Self {
        Self {
            reviews,
            lookups: AtomicUsize::new(0),
        }
    }

    /// Number of `reviews_by_reviewer` calls served so far
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ReviewStore for InMemoryReviewStore {
    async fn top_reviewers(&self, limit: usize) -> Result<Vec<ReviewerSummary>> {
        let mut counts: HashMap<&str, u64> = HashMap::new();
        for review in &self.reviews {
            *counts.entry(review.reviewer_id.as_str()).or_insert(0) += 1;
        }

        let mut summaries: Vec<ReviewerSummary> = counts
            .into_iter()
            .map(|(id, count)| ReviewerSummary::new(id, count))
            .collect();
        summaries.sort_by(|a, b| {
            b.review_count
                .cmp(&a.review_count)
                .then_with(|| a.reviewer_id.cmp(&b.reviewer_id))
        });
        summaries.truncate(limit);

        Ok(summaries)
    }

    async fn reviews_by_reviewer(&self, reviewer_id: &str) -> Result<Vec<ReviewRecord>> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .reviews
            .iter()
            .filter(|r| r.reviewer_id == reviewer_id)
            .cloned()
            .collect())
    }

    async fn all_reviews(&self) -> Result<Vec<ReviewRecord>> {
        Ok(self.reviews.clone())
    }

    async fn review_counts_by_type(&self, reviewer_id: &str) -> Result<Vec<TypeReviewCount>> {
        let mut counts: BTreeMap<i32, u64> = BTreeMap::new();
        for review in self.reviews.iter().filter(|r| r.reviewer_id == reviewer_id) {
            *counts.entry(review.type_id).or_insert(0) += 1;
        }

        Ok(counts
            .into_iter()
            .map(|(type_id, count)| TypeReviewCount { type_id, count })
            .collect())
    }

    async fn popular_items(&self, max_reviews: u64, limit: usize) -> Result<Vec<ItemPopularity>> {
        let mut counts: HashMap<&str, u64> = HashMap::new();
        for review in &self.reviews {
            *counts.entry(review.asin.as_str()).or_insert(0) += 1;
        }

        let mut items: Vec<ItemPopularity> = counts
            .into_iter()
            .filter(|(_, count)| *count < max_reviews)
            .map(|(asin, count)| ItemPopularity::new(asin, count))
            .collect();
        items.sort_by(|a, b| {
            b.review_count
                .cmp(&a.review_count)
                .then_with(|| a.asin.cmp(&b.asin))
        });
        items.truncate(limit);

        Ok(items)
    }

    async fn reviewers_of_item(&self, asin: &str) -> Result<Vec<String>> {
        let reviewers: BTreeSet<&str> = self
            .reviews
            .iter()
            .filter(|r| r.asin == asin)
            .map(|r| r.reviewer_id.as_str())
            .collect();

        Ok(reviewers.into_iter().map(String::from).collect())
    }
}

/// Item catalog backed by vectors
#[derive(Default)]
pub struct InMemoryItemCatalog {
    items: Vec<ItemKey>,
    product_types: Vec<ProductType>,
    reviewers: Vec<ReviewerProfile>,
}

impl InMemoryItemCatalog {
    pub fn new(items: Vec<ItemKey>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn with_product_types(mut self, product_types: Vec<ProductType>) -> Self {
        self.product_types = product_types;
        self
    }

    pub fn with_reviewers(mut self, reviewers: Vec<ReviewerProfile>) -> Self {
        self.reviewers = reviewers;
        self
    }
}

#[async_trait]
impl ItemCatalog for InMemoryItemCatalog {
    async fn item_keys(&self) -> Result<Vec<ItemKey>> {
        Ok(self.items.clone())
    }

    async fn product_types(&self) -> Result<Vec<ProductType>> {
        let mut types = self.product_types.clone();
        types.sort_by_key(|t| t.id);
        Ok(types)
    }

    async fn reviewer_profiles(&self, limit: usize) -> Result<Vec<ReviewerProfile>> {
        let mut profiles = self.reviewers.clone();
        // Named before unnamed, as NULLS LAST
        profiles.sort_by(|a, b| {
            a.reviewer_name
                .is_none()
                .cmp(&b.reviewer_name.is_none())
                .then_with(|| a.reviewer_name.cmp(&b.reviewer_name))
                .then_with(|| a.reviewer_id.cmp(&b.reviewer_id))
        });
        profiles.truncate(limit);
        Ok(profiles)
    }
}

#[derive(Default)]
struct GraphState {
    /// Reviewer ids in node creation order
    reviewers: Vec<String>,
    /// Directed similarity edges
    edges: Vec<SimilarityRecord>,
    /// At most one per reviewer and category
    wrote: Vec<WroteRecord>,
    /// (reviewer id, asin)
    reviewed: BTreeSet<(String, String)>,
}

impl GraphState {
    fn merge_reviewer(&mut self, reviewer_id: &str) {
        if !self.reviewers.iter().any(|r| r == reviewer_id) {
            self.reviewers.push(reviewer_id.to_string());
        }
    }
}

/// Graph of reviewer nodes, directed similarity edges and reviewer relations
#[derive(Default)]
pub struct InMemoryGraphStore {
    state: Mutex<GraphState>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a graph with reviewer nodes but no edges
    pub fn with_reviewers<I, S>(reviewers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut state = GraphState::default();
        for reviewer in reviewers {
            state.merge_reviewer(reviewer.as_ref());
        }
        Self {
            state: Mutex::new(state),
        }
    }

    /// Number of directed similarity edges
    pub fn edge_count(&self) -> Result<usize> {
        Ok(self.lock()?.edges.len())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, GraphState>> {
        self.state
            .lock()
            .map_err(|e| ReviewGraphError::graph(e.to_string(), "lock"))
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn reviewer_ids(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.reviewers.clone())
    }

    async fn similarity_edges(&self) -> Result<Vec<SimilarityRecord>> {
        Ok(self.lock()?.edges.clone())
    }

    async fn insert_similarity(&self, record: &SimilarityRecord) -> Result<()> {
        let mut state = self.lock()?;
        state.merge_reviewer(&record.user1);
        state.merge_reviewer(&record.user2);
        state.edges.push(record.clone());
        state.edges.push(SimilarityRecord::new(
            record.user2.clone(),
            record.user1.clone(),
            record.similarity,
        ));
        Ok(())
    }

    async fn insert_wrote(&self, record: &WroteRecord) -> Result<()> {
        let mut state = self.lock()?;
        state.merge_reviewer(&record.reviewer_id);

        let existing = state.wrote.iter_mut().find(|w| {
            w.reviewer_id == record.reviewer_id && w.product_type == record.product_type
        });
        match existing {
            Some(edge) => *edge = record.clone(),
            None => state.wrote.push(record.clone()),
        }
        Ok(())
    }

    async fn wrote_edges(&self) -> Result<Vec<WroteRecord>> {
        Ok(self.lock()?.wrote.clone())
    }

    async fn insert_reviewed(&self, reviewer_id: &str, asin: &str) -> Result<()> {
        let mut state = self.lock()?;
        state.merge_reviewer(reviewer_id);
        state
            .reviewed
            .insert((reviewer_id.to_string(), asin.to_string()));
        Ok(())
    }

    async fn shared_review_pairs(&self) -> Result<Vec<SharedReviewPair>> {
        let state = self.lock()?;

        let mut by_article: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (reviewer, asin) in &state.reviewed {
            by_article
                .entry(asin.as_str())
                .or_default()
                .push(reviewer.as_str());
        }

        let mut shared: BTreeMap<(&str, &str), u64> = BTreeMap::new();
        // Set order keeps each article's reviewers sorted
        for reviewers in by_article.values() {
            for (i, user1) in reviewers.iter().enumerate() {
                for user2 in &reviewers[i + 1..] {
                    *shared.entry((*user1, *user2)).or_insert(0) += 1;
                }
            }
        }

        let mut pairs: Vec<SharedReviewPair> = shared
            .into_iter()
            .map(|((user1, user2), count)| SharedReviewPair::new(user1, user2, count))
            .collect();
        sort_shared_pairs(&mut pairs);
        Ok(pairs)
    }

    async fn clear(&self) -> Result<()> {
        let mut state = self.lock()?;
        state.reviewers.clear();
        state.edges.clear();
        state.wrote.clear();
        state.reviewed.clear();
        Ok(())
    }
}
