//! Reviewer relations stored in the graph besides similarity
//!
//! `(:User)-[:WROTE {number_of_articles}]->(:ProductType)` links a reviewer to
//! each category they wrote in; `(:User)-[:REVIEWED]->(:Article)` links a
//! reviewer to a single reviewed ASIN.

use serde::Serialize;

/// Name stored for reviewers the dataset lists without one
pub const MISSING_REVIEWER_NAME: &str = "NameDoesNotExist";

/// One `WROTE` edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WroteRecord {
    pub reviewer_id: String,
    pub reviewer_name: String,
    pub product_type: String,
    pub number_of_articles: u64,
}

impl WroteRecord {
    pub fn new(
        reviewer_id: impl Into<String>,
        reviewer_name: impl Into<String>,
        product_type: impl Into<String>,
        number_of_articles: u64,
    ) -> Self {
        Self {
            reviewer_id: reviewer_id.into(),
            reviewer_name: reviewer_name.into(),
            product_type: product_type.into(),
            number_of_articles,
        }
    }
}

/// Two reviewers and the number of articles both reviewed
///
/// `user1` sorts before `user2`, so each unordered pair appears once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharedReviewPair {
    pub user1: String,
    pub user2: String,
    pub shared_reviews: u64,
}

impl SharedReviewPair {
    pub fn new(user1: impl Into<String>, user2: impl Into<String>, shared_reviews: u64) -> Self {
        Self {
            user1: user1.into(),
            user2: user2.into(),
            shared_reviews,
        }
    }
}

/// Most shared pairs first, ties by reviewer ids
pub(crate) fn sort_shared_pairs(pairs: &mut [SharedReviewPair]) {
    pairs.sort_by(|a, b| {
        b.shared_reviews
            .cmp(&a.shared_reviews)
            .then_with(|| a.user1.cmp(&b.user1))
            .then_with(|| a.user2.cmp(&b.user2))
    });
}
