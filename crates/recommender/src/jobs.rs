//! Batch jobs wiring stores, engines and models together

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, instrument};

use review_graph_core::{ItemPopularity, JobConfig, Result, ReviewGraphError};

use crate::artifact;
use crate::evaluation::{evaluate, EvaluationReport};
use crate::index::{ItemIndex, ReviewerIndex};
use crate::knn::KnnImputer;
use crate::masking::mask_known_ratings;
use crate::matrix::{RatingMatrixBuilder, SimilarityMatrix};
use crate::relations::{SharedReviewPair, WroteRecord, MISSING_REVIEWER_NAME};
use crate::similarity::{SimilarityEngine, SimilarityRunStats};
use crate::store::{GraphStore, ItemCatalog, ReviewStore};

/// Pairwise similarity of the most active reviewers, written to the artifact
pub struct SimilarityJob {
    reviews: Arc<dyn ReviewStore>,
    config: JobConfig,
}

impl SimilarityJob {
    pub fn new(reviews: Arc<dyn ReviewStore>, config: JobConfig) -> Self {
        Self { reviews, config }
    }

    #[instrument(skip(self), fields(top = self.config.top_reviewers))]
    pub async fn run(&self) -> Result<SimilarityRunStats> {
        let engine = SimilarityEngine::new(Arc::clone(&self.reviews), self.config.max_cache_size)?;
        self.run_engine(engine).await
    }

    /// Same as [`run`](Self::run) with a caller-supplied eviction RNG
    pub async fn run_with_rng<R: Rng>(&self, rng: R) -> Result<SimilarityRunStats> {
        let engine =
            SimilarityEngine::with_rng(Arc::clone(&self.reviews), self.config.max_cache_size, rng)?;
        self.run_engine(engine).await
    }

    async fn run_engine<R: Rng>(
        &self,
        mut engine: SimilarityEngine<R>,
    ) -> Result<SimilarityRunStats> {
        let users = self.reviews.top_reviewers(self.config.top_reviewers).await?;
        info!(users = users.len(), "Selected top reviewers");

        engine
            .run(&users, Path::new(&self.config.similarity_file))
            .await
    }
}

/// Load every record of the similarity artifact into the graph store
///
/// Each record becomes one edge per direction. Returns the number of records
/// loaded.
#[instrument(skip(path, graph), fields(path = %path.display()))]
pub async fn upload_similarities(path: &Path, graph: &dyn GraphStore) -> Result<usize> {
    let records = artifact::read_records(path)?;

    for record in &records {
        graph.insert_similarity(record).await?;
    }

    info!(records = records.len(), "Uploaded similarity edges");
    Ok(records.len())
}

/// Delete every node and edge from the graph store
pub async fn clear_graph(graph: &dyn GraphStore) -> Result<()> {
    graph.clear().await
}

/// Counters from one category reviewer run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryReviewersOutcome {
    pub reviewers_scanned: usize,
    /// Reviewers that wrote in enough categories to be linked
    pub reviewers_linked: usize,
    pub edges_written: usize,
}

/// Link reviewers who wrote in several categories to each category with a
/// `WROTE` edge carrying their review count there
pub struct CategoryReviewersJob {
    reviews: Arc<dyn ReviewStore>,
    catalog: Arc<dyn ItemCatalog>,
    graph: Arc<dyn GraphStore>,
    config: JobConfig,
}

impl CategoryReviewersJob {
    pub fn new(
        reviews: Arc<dyn ReviewStore>,
        catalog: Arc<dyn ItemCatalog>,
        graph: Arc<dyn GraphStore>,
        config: JobConfig,
    ) -> Self {
        Self {
            reviews,
            catalog,
            graph,
            config,
        }
    }

    /// # Errors
    ///
    /// Returns `UnknownProductType` when a reviewer's review count names a
    /// category missing from the catalog. Edges written before the failure
    /// stay in the graph.
    #[instrument(skip(self), fields(reviewers = self.config.category_reviewers))]
    pub async fn run(&self) -> Result<CategoryReviewersOutcome> {
        let types: HashMap<i32, String> = self
            .catalog
            .product_types()
            .await?
            .into_iter()
            .map(|t| (t.id, t.name))
            .collect();
        let profiles = self
            .catalog
            .reviewer_profiles(self.config.category_reviewers)
            .await?;

        let mut outcome = CategoryReviewersOutcome::default();
        for profile in profiles {
            outcome.reviewers_scanned += 1;

            let counts = self
                .reviews
                .review_counts_by_type(&profile.reviewer_id)
                .await?;
            if counts.len() < self.config.min_product_types {
                continue;
            }

            let name = profile
                .reviewer_name
                .as_deref()
                .unwrap_or(MISSING_REVIEWER_NAME);
            for count in counts {
                let product_type = types
                    .get(&count.type_id)
                    .ok_or(ReviewGraphError::UnknownProductType(count.type_id))?;
                self.graph
                    .insert_wrote(&WroteRecord::new(
                        profile.reviewer_id.as_str(),
                        name,
                        product_type.as_str(),
                        count.count,
                    ))
                    .await?;
                outcome.edges_written += 1;
            }

            debug!(reviewer = %profile.reviewer_id, "Linked reviewer to categories");
            outcome.reviewers_linked += 1;
        }

        info!(
            scanned = outcome.reviewers_scanned,
            linked = outcome.reviewers_linked,
            edges = outcome.edges_written,
            "Category reviewer edges written"
        );
        Ok(outcome)
    }
}

/// Result of one shared review run
#[derive(Debug, Clone, Serialize)]
pub struct SharedReviewsOutcome {
    /// Items linked, most reviewed first
    pub items: Vec<ItemPopularity>,
    pub reviewed_edges: usize,
    pub pairs: Vec<SharedReviewPair>,
}

/// Rebuild the graph from the most reviewed items under a review bound and
/// rank reviewer pairs by the items they both reviewed
pub struct SharedReviewsJob {
    reviews: Arc<dyn ReviewStore>,
    graph: Arc<dyn GraphStore>,
    config: JobConfig,
}

impl SharedReviewsJob {
    pub fn new(
        reviews: Arc<dyn ReviewStore>,
        graph: Arc<dyn GraphStore>,
        config: JobConfig,
    ) -> Self {
        Self {
            reviews,
            graph,
            config,
        }
    }

    /// Clears the graph first
    #[instrument(
        skip(self),
        fields(items = self.config.popular_items, below = self.config.popular_max_reviews)
    )]
    pub async fn run(&self) -> Result<SharedReviewsOutcome> {
        self.graph.clear().await?;

        let items = self
            .reviews
            .popular_items(self.config.popular_max_reviews, self.config.popular_items)
            .await?;

        let mut reviewed_edges = 0;
        for item in &items {
            for reviewer_id in self.reviews.reviewers_of_item(&item.asin).await? {
                self.graph.insert_reviewed(&reviewer_id, &item.asin).await?;
                reviewed_edges += 1;
            }
        }

        let pairs = self.graph.shared_review_pairs().await?;
        info!(
            items = items.len(),
            reviewed_edges,
            pairs = pairs.len(),
            "Shared review pairs ranked"
        );

        Ok(SharedReviewsOutcome {
            items,
            reviewed_edges,
            pairs,
        })
    }
}

/// Summary of one recommendation run
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationOutcome {
    pub reviewers: usize,
    pub items: usize,
    pub known_ratings: usize,
    /// Reviews dropped because their reviewer is not in the graph store
    pub skipped_reviews: usize,
    /// Mask draws, duplicates included
    pub mask_draws: usize,
    pub report: EvaluationReport,
}

/// Build the rating and similarity matrices, hold out ratings, impute them
/// and score the imputation
pub struct RecommendationJob {
    reviews: Arc<dyn ReviewStore>,
    items: Arc<dyn ItemCatalog>,
    graph: Arc<dyn GraphStore>,
    config: JobConfig,
}

impl RecommendationJob {
    pub fn new(
        reviews: Arc<dyn ReviewStore>,
        items: Arc<dyn ItemCatalog>,
        graph: Arc<dyn GraphStore>,
        config: JobConfig,
    ) -> Self {
        Self {
            reviews,
            items,
            graph,
            config,
        }
    }

    #[instrument(skip(self), fields(k = self.config.knn_neighbors, seed = self.config.mask_seed))]
    pub async fn run(&self) -> Result<RecommendationOutcome> {
        let reviewers = ReviewerIndex::from_keys(self.graph.reviewer_ids().await?);
        let items = ItemIndex::from_keys(self.items.item_keys().await?);
        info!(
            reviewers = reviewers.len(),
            items = items.len(),
            "Loaded matrix indexes"
        );

        let reviews = self.reviews.all_reviews().await?;
        let mut builder = RatingMatrixBuilder::new(&reviewers, &items);
        builder.extend(&reviews)?;
        let (ratings, build_stats) = builder.build();

        let edges = self.graph.similarity_edges().await?;
        let similarity = SimilarityMatrix::from_records(&reviewers, &edges)?;

        let split = mask_known_ratings(
            &ratings,
            self.config.mask_ratio,
            self.config.mask_seed,
            self.config.mask_sampling,
        )?;

        let mut imputer = KnnImputer::new(self.config.knn_neighbors)?;
        imputer.fit(split.train.clone(), similarity, reviewers.clone())?;
        let predicted = imputer.predict(&split.train)?;

        let report = evaluate(&ratings, &predicted, &split.masked)?;
        info!(
            masked = report.masked,
            unimputed = report.unimputed,
            mae = ?report.mae,
            "Recommendation run complete"
        );

        Ok(RecommendationOutcome {
            reviewers: reviewers.len(),
            items: items.len(),
            known_ratings: ratings.known_count(),
            skipped_reviews: build_stats.skipped_unknown_reviewer,
            mask_draws: split.masked.len(),
            report,
        })
    }
}
