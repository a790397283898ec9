//! Integration tests for the recommendation job
//!
//! Builds matrices from the in-memory stores, masks, imputes and evaluates.

use std::sync::Arc;

use review_graph_core::{ItemKey, JobConfig, MaskSampling, ReviewGraphError, ReviewRecord};
use review_graph_recommender::jobs::RecommendationJob;
use review_graph_recommender::store::{
    GraphStore, InMemoryGraphStore, InMemoryItemCatalog, InMemoryReviewStore,
};
use review_graph_recommender::SimilarityRecord;

const REVIEWERS: usize = 10;
const ITEMS: usize = 5;

fn reviewer(r: usize) -> String {
    format!("R{}", r)
}

fn catalog() -> Arc<InMemoryItemCatalog> {
    Arc::new(InMemoryItemCatalog::new(
        (0..ITEMS).map(|i| ItemKey::new(format!("I{}", i), 0)).collect(),
    ))
}

fn dense_reviews() -> Vec<ReviewRecord> {
    let mut reviews: Vec<ReviewRecord> = (0..REVIEWERS)
        .flat_map(|r| {
            (0..ITEMS).map(move |i| {
                ReviewRecord::new(reviewer(r), format!("I{}", i), 0, ((r + i) % 5 + 1) as f64)
                    .unwrap()
            })
        })
        .collect();
    reviews.push(ReviewRecord::new("GHOST", "I0", 0, 3.0).unwrap());
    reviews
}

async fn chained_graph() -> Arc<InMemoryGraphStore> {
    let graph = InMemoryGraphStore::with_reviewers((0..REVIEWERS).map(reviewer));
    for r in 0..REVIEWERS - 1 {
        graph
            .insert_similarity(&SimilarityRecord::new(reviewer(r), reviewer(r + 1), 0.5))
            .await
            .unwrap();
    }
    Arc::new(graph)
}

async fn job(reviews: Vec<ReviewRecord>, config: JobConfig) -> RecommendationJob {
    RecommendationJob::new(
        Arc::new(InMemoryReviewStore::new(reviews)),
        catalog(),
        chained_graph().await,
        config,
    )
}

#[tokio::test]
async fn test_recommendation_outcome_is_consistent() {
    let config = JobConfig {
        knn_neighbors: 2,
        ..JobConfig::default()
    };
    let outcome = job(dense_reviews(), config).await.run().await.unwrap();

    assert_eq!(outcome.reviewers, REVIEWERS);
    assert_eq!(outcome.items, ITEMS);
    assert_eq!(outcome.known_ratings, REVIEWERS * ITEMS);
    assert_eq!(outcome.skipped_reviews, 1);
    assert_eq!(outcome.mask_draws, 5);

    let report = &outcome.report;
    assert!(report.masked >= 1 && report.masked <= outcome.mask_draws);
    assert_eq!(report.imputed + report.unimputed, report.masked);
    if let Some(mae) = report.mae {
        assert!((0.0..=4.0).contains(&mae));
    }
}

#[tokio::test]
async fn test_recommendation_is_reproducible() {
    let config = JobConfig {
        knn_neighbors: 3,
        mask_ratio: 0.3,
        mask_seed: 33,
        ..JobConfig::default()
    };

    let first = job(dense_reviews(), config.clone()).await.run().await.unwrap();
    let second = job(dense_reviews(), config).await.run().await.unwrap();

    assert_eq!(first.report, second.report);
}

#[tokio::test]
async fn test_fully_masked_matrix_imputes_nothing() {
    let config = JobConfig {
        mask_ratio: 1.0,
        mask_sampling: MaskSampling::WithoutReplacement,
        ..JobConfig::default()
    };
    let outcome = job(dense_reviews(), config).await.run().await.unwrap();

    assert_eq!(outcome.report.masked, REVIEWERS * ITEMS);
    assert_eq!(outcome.report.imputed, 0);
    assert_eq!(outcome.report.mae, None);
    assert_eq!(outcome.report.unimputed_fraction(), 1.0);
}

#[tokio::test]
async fn test_unknown_item_aborts_run() {
    let mut reviews = dense_reviews();
    reviews.push(ReviewRecord::new(reviewer(0), "NOT-LISTED", 0, 2.0).unwrap());

    let err = job(reviews, JobConfig::default())
        .await
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, ReviewGraphError::UnknownItem { .. }));
}
