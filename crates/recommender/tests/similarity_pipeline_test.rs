//! Integration tests for the similarity job and artifact upload
//!
//! Runs against the in-memory stores; no database required.

use std::collections::HashSet;
use std::fs;
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tempfile::TempDir;

use review_graph_core::{JobConfig, ReviewGraphError, ReviewRecord, ReviewerSummary};
use review_graph_recommender::artifact::read_records;
use review_graph_recommender::jobs::{clear_graph, upload_similarities, SimilarityJob};
use review_graph_recommender::store::{GraphStore, InMemoryGraphStore, InMemoryReviewStore};
use review_graph_recommender::SimilarityEngine;

fn review(reviewer: &str, asin: &str, type_id: i32) -> ReviewRecord {
    ReviewRecord::new(reviewer, asin, type_id, 4.0).unwrap()
}

fn example_store() -> Arc<InMemoryReviewStore> {
    Arc::new(InMemoryReviewStore::new(vec![
        review("U1", "a", 1),
        review("U1", "b", 1),
        review("U2", "a", 1),
        review("U2", "c", 1),
    ]))
}

fn job_config(dir: &TempDir, cache_size: usize) -> JobConfig {
    JobConfig {
        similarity_file: dir
            .path()
            .join("similarities.txt")
            .to_string_lossy()
            .into_owned(),
        max_cache_size: cache_size,
        ..JobConfig::default()
    }
}

fn triples(path: &std::path::Path) -> HashSet<(String, String, u64)> {
    read_records(path)
        .unwrap()
        .into_iter()
        .map(|r| (r.user1, r.user2, r.similarity.to_bits()))
        .collect()
}

#[tokio::test]
async fn test_end_to_end_example_skips_empty_reviewer() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("similarities.txt");
    let users = vec![
        ReviewerSummary::new("U1", 2),
        ReviewerSummary::new("U2", 2),
        ReviewerSummary::new("U3", 0),
    ];

    let mut engine =
        SimilarityEngine::with_rng(example_store(), 30, ChaCha8Rng::seed_from_u64(1)).unwrap();
    let stats = engine.run(&users, &path).await.unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "U1 U2 0.3333333333333333\n");
    assert_eq!(stats.pairs_compared, 3);
    assert_eq!(stats.records_written, 1);
    assert_eq!(stats.undefined_pairs, 0);
}

#[tokio::test]
async fn test_two_empty_reviewers_are_undefined_not_written() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("similarities.txt");
    let users = vec![ReviewerSummary::new("X", 0), ReviewerSummary::new("Y", 0)];

    let mut engine = SimilarityEngine::new(example_store(), 4).unwrap();
    let stats = engine.run(&users, &path).await.unwrap();

    assert_eq!(stats.undefined_pairs, 1);
    assert_eq!(fs::read_to_string(&path).unwrap(), "");
}

#[tokio::test]
async fn test_rerun_overwrites_artifact() {
    let dir = TempDir::new().unwrap();
    let config = job_config(&dir, 30);
    let path = std::path::PathBuf::from(&config.similarity_file);
    fs::write(&path, "stale stale 0.5\n").unwrap();

    let job = SimilarityJob::new(example_store(), config);
    job.run().await.unwrap();
    let first = fs::read_to_string(&path).unwrap();
    job.run().await.unwrap();
    let second = fs::read_to_string(&path).unwrap();

    assert_eq!(first, second);
    assert!(!first.contains("stale"));
}

#[tokio::test]
async fn test_small_cache_gives_same_triples() {
    let reviews: Vec<ReviewRecord> = (0..8)
        .flat_map(|u| {
            (0..=u % 4).map(move |i| review(&format!("R{}", u), &format!("I{}", i + u % 2), 0))
        })
        .collect();
    let store = Arc::new(InMemoryReviewStore::new(reviews));

    let dir_large = TempDir::new().unwrap();
    let large = job_config(&dir_large, 30);
    SimilarityJob::new(store.clone(), large.clone())
        .run_with_rng(ChaCha8Rng::seed_from_u64(7))
        .await
        .unwrap();

    let dir_small = TempDir::new().unwrap();
    let small = job_config(&dir_small, 1);
    let stats = SimilarityJob::new(store.clone(), small.clone())
        .run_with_rng(ChaCha8Rng::seed_from_u64(7))
        .await
        .unwrap();

    assert_eq!(
        triples(large.similarity_file.as_ref()),
        triples(small.similarity_file.as_ref())
    );
    assert!(stats.cache_evictions > 0);
    assert_eq!(stats.cache_hits + stats.cache_misses, stats.users + stats.pairs_compared);
}

#[tokio::test]
async fn test_store_lookups_bounded_by_cache_misses() {
    let store = example_store();
    let dir = TempDir::new().unwrap();

    let stats = SimilarityJob::new(store.clone(), job_config(&dir, 30))
        .run()
        .await
        .unwrap();

    assert_eq!(stats.users, 2);
    assert_eq!(stats.cache_misses, 2);
    assert_eq!(store.lookups(), 2);
}

#[tokio::test]
async fn test_upload_creates_two_edges_per_record() {
    let dir = TempDir::new().unwrap();
    let config = job_config(&dir, 30);
    SimilarityJob::new(example_store(), config.clone())
        .run()
        .await
        .unwrap();

    let graph = InMemoryGraphStore::new();
    let loaded = upload_similarities(config.similarity_file.as_ref(), &graph)
        .await
        .unwrap();

    assert_eq!(loaded, 1);
    assert_eq!(graph.edge_count().unwrap(), 2);
    assert_eq!(graph.reviewer_ids().await.unwrap(), vec!["U1", "U2"]);

    clear_graph(&graph).await.unwrap();
    assert_eq!(graph.edge_count().unwrap(), 0);
    assert!(graph.reviewer_ids().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_rejects_malformed_line() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.txt");
    fs::write(&path, "U1 U2 0.5\nU1 U3\n").unwrap();

    let graph = InMemoryGraphStore::new();
    let err = upload_similarities(&path, &graph).await.unwrap_err();

    assert!(matches!(err, ReviewGraphError::ArtifactFormat { line: 2, .. }));
}
