//! Review Graph Recommender
//!
//! Batch analytics over the multi-category review dataset: pairwise reviewer
//! similarity with a bounded article-set cache, KNN completion of the
//! reviewer × item rating matrix, and reviewer/category graph relations.
//!
//! ## Modules
//!
//! - `similarity`: Jaccard similarity engine producing the similarity artifact
//! - `cache`: Bounded cache with uniform random eviction
//! - `artifact`: Line codec for the similarity artifact
//! - `index`, `matrix`: Dense rating and similarity matrices
//! - `masking`: Reproducible train/test split of known ratings
//! - `knn`: Similarity-gated nearest-neighbour imputer
//! - `evaluation`: Imputation error over held-out ratings
//! - `dataset`: Loading of the raw JSON-lines dataset into in-memory stores
//! - `relations`: `WROTE` and `REVIEWED` graph records
//! - `store`: Store traits plus PostgreSQL, Neo4j and in-memory adapters
//! - `jobs`: Batch jobs run by the `review-graph` binary

pub mod artifact;
pub mod cache;
pub mod dataset;
pub mod evaluation;
pub mod index;
pub mod jobs;
pub mod knn;
pub mod masking;
pub mod matrix;
pub mod relations;
pub mod similarity;
pub mod store;

// Re-export key types
pub use artifact::SimilarityRecord;
pub use cache::RandomEvictionCache;
pub use dataset::{load_dataset, parse_category_name, parse_review_line, Dataset, ParsedReview};
pub use evaluation::{evaluate, EvaluationReport};
pub use index::{DenseIndex, ItemIndex, ReviewerIndex};
pub use jobs::{
    clear_graph, upload_similarities, CategoryReviewersJob, CategoryReviewersOutcome,
    RecommendationJob, RecommendationOutcome, SharedReviewsJob, SharedReviewsOutcome,
    SimilarityJob,
};
pub use knn::KnnImputer;
pub use masking::{mask_known_ratings, TrainTestSplit};
pub use matrix::{RatingMatrix, RatingMatrixBuilder, SimilarityMatrix, UNKNOWN};
pub use relations::{SharedReviewPair, WroteRecord, MISSING_REVIEWER_NAME};
pub use similarity::{jaccard_similarity, ArticleSet, SimilarityEngine, SimilarityRunStats};
pub use store::{GraphStore, ItemCatalog, ReviewStore};
