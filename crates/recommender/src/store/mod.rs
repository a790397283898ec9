//! Store boundary
//!
//! Each external store is reached through a narrow async trait. Handles are
//! passed explicitly into jobs and engines; nothing holds a global
//! connection.

pub mod memory;
pub mod neo4j;
pub mod postgres;

use async_trait::async_trait;
use review_graph_core::{
    ItemKey, ItemPopularity, ProductType, Result, ReviewRecord, ReviewerProfile, ReviewerSummary,
    TypeReviewCount,
};

use crate::artifact::SimilarityRecord;
use crate::relations::{SharedReviewPair, WroteRecord};

pub use memory::{InMemoryGraphStore, InMemoryItemCatalog, InMemoryReviewStore};
pub use neo4j::Neo4jGraphStore;
pub use postgres::{PostgresItemCatalog, PostgresReviewStore};

/// Document store holding one record per review
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Reviewers with the most reviews, most active first, ties by id
    async fn top_reviewers(&self, limit: usize) -> Result<Vec<ReviewerSummary>>;

    /// Every review written by `reviewer_id`
    async fn reviews_by_reviewer(&self, reviewer_id: &str) -> Result<Vec<ReviewRecord>>;

    /// Full scan of the review collection
    async fn all_reviews(&self) -> Result<Vec<ReviewRecord>>;

    /// Reviews written by `reviewer_id`, counted per category, by type id
    async fn review_counts_by_type(&self, reviewer_id: &str) -> Result<Vec<TypeReviewCount>>;

    /// ASINs with fewer than `max_reviews` reviews, most reviewed first,
    /// ties by ASIN
    async fn popular_items(&self, max_reviews: u64, limit: usize) -> Result<Vec<ItemPopularity>>;

    /// Distinct ids of the reviewers of `asin` in any category, sorted
    async fn reviewers_of_item(&self, asin: &str) -> Result<Vec<String>>;
}

/// Relational store, the authority on item identity
#[async_trait]
pub trait ItemCatalog: Send + Sync {
    /// Every known item, in a stable order
    async fn item_keys(&self) -> Result<Vec<ItemKey>>;

    /// Every product category, by id
    async fn product_types(&self) -> Result<Vec<ProductType>>;

    /// First `limit` reviewers by name, unnamed reviewers last
    async fn reviewer_profiles(&self, limit: usize) -> Result<Vec<ReviewerProfile>>;
}

/// Graph store holding reviewer nodes and their relations
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Ids of every reviewer node, in a stable order
    async fn reviewer_ids(&self) -> Result<Vec<String>>;

    /// Every similarity edge
    async fn similarity_edges(&self) -> Result<Vec<SimilarityRecord>>;

    /// Merge both reviewer nodes and create one edge in each direction
    async fn insert_similarity(&self, record: &SimilarityRecord) -> Result<()>;

    /// Merge the reviewer and category nodes and set the `WROTE` edge
    /// between them
    async fn insert_wrote(&self, record: &WroteRecord) -> Result<()>;

    /// Every `WROTE` edge
    async fn wrote_edges(&self) -> Result<Vec<WroteRecord>>;

    /// Merge the reviewer and article nodes and the `REVIEWED` edge
    async fn insert_reviewed(&self, reviewer_id: &str, asin: &str) -> Result<()>;

    /// Reviewer pairs with at least one article in common, most shared first
    async fn shared_review_pairs(&self) -> Result<Vec<SharedReviewPair>>;

    /// Delete every node and edge
    async fn clear(&self) -> Result<()>;
}
