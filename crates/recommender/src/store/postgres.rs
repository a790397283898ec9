//! PostgreSQL-backed review collection and item catalog
//!
//! Expected tables:
//!
//! ```sql
//! CREATE TABLE reviews (
//!     reviewer_id TEXT NOT NULL,
//!     asin        TEXT NOT NULL,
//!     type_id     INTEGER NOT NULL,
//!     overall     DOUBLE PRECISION NOT NULL,
//!     review_time TIMESTAMPTZ,
//!     summary     TEXT
//! );
//!
//! CREATE TABLE items (
//!     asin    TEXT NOT NULL,
//!     type_id INTEGER NOT NULL,
//!     PRIMARY KEY (asin, type_id)
//! );
//!
//! CREATE TABLE types (
//!     id   INTEGER PRIMARY KEY,
//!     type TEXT NOT NULL
//! );
//!
//! CREATE TABLE reviewers (
//!     reviewer_id   TEXT PRIMARY KEY,
//!     reviewer_name TEXT
//! );
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, Instrument};

use review_graph_core::{
    store_span, ItemKey, ItemPopularity, ProductType, Result, ReviewGraphError, ReviewRecord,
    ReviewerProfile, ReviewerSummary, TypeReviewCount,
};

use super::{ItemCatalog, ReviewStore};

/// Review collection stored in the `reviews` table
#[derive(Clone)]
pub struct PostgresReviewStore {
    pool: PgPool,
}

impl PostgresReviewStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn review_from_row(row: &PgRow) -> Result<ReviewRecord> {
    let reviewer_id: String = row.try_get("reviewer_id")?;
    let asin: String = row.try_get("asin")?;
    let type_id: i32 = row.try_get("type_id")?;
    let overall: f64 = row.try_get("overall")?;
    let review_time: Option<DateTime<Utc>> = row.try_get("review_time")?;
    let summary: Option<String> = row.try_get("summary")?;

    let mut record = ReviewRecord::new(reviewer_id, asin, type_id, overall)?;
    record.review_time = review_time;
    record.summary = summary;
    Ok(record)
}

#[async_trait]
impl ReviewStore for PostgresReviewStore {
    async fn top_reviewers(&self, limit: usize) -> Result<Vec<ReviewerSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT reviewer_id, COUNT(*) AS num_reviews
            FROM reviews
            GROUP BY reviewer_id
            ORDER BY num_reviews DESC, reviewer_id
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .instrument(store_span("reviews", "top_reviewers"))
        .await
        .map_err(|e| ReviewGraphError::database(e.to_string(), "top_reviewers"))?;

        rows.iter()
            .map(|row| -> Result<ReviewerSummary> {
                let reviewer_id: String = row.try_get("reviewer_id")?;
                let count: i64 = row.try_get("num_reviews")?;
                Ok(ReviewerSummary::new(reviewer_id, count.max(0) as u64))
            })
            .collect()
    }

    async fn reviews_by_reviewer(&self, reviewer_id: &str) -> Result<Vec<ReviewRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT reviewer_id, asin, type_id, overall, review_time, summary
            FROM reviews
            WHERE reviewer_id = $1
            "#,
        )
        .bind(reviewer_id)
        .fetch_all(&self.pool)
        .instrument(store_span("reviews", "reviews_by_reviewer"))
        .await
        .map_err(|e| ReviewGraphError::database(e.to_string(), "reviews_by_reviewer"))?;

        debug!(reviewer_id, reviews = rows.len(), "Fetched reviewer articles");

        rows.iter().map(review_from_row).collect()
    }

    async fn all_reviews(&self) -> Result<Vec<ReviewRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT reviewer_id, asin, type_id, overall, review_time, summary
            FROM reviews
            "#,
        )
        .fetch_all(&self.pool)
        .instrument(store_span("reviews", "all_reviews"))
        .await
        .map_err(|e| ReviewGraphError::database(e.to_string(), "all_reviews"))?;

        rows.iter().map(review_from_row).collect()
    }

    async fn review_counts_by_type(&self, reviewer_id: &str) -> Result<Vec<TypeReviewCount>> {
        let rows = sqlx::query(
            r#"
            SELECT type_id, COUNT(*) AS num_reviews
            FROM reviews
            WHERE reviewer_id = $1
            GROUP BY type_id
            ORDER BY type_id
            "#,
        )
        .bind(reviewer_id)
        .fetch_all(&self.pool)
        .instrument(store_span("reviews", "review_counts_by_type"))
        .await
        .map_err(|e| ReviewGraphError::database(e.to_string(), "review_counts_by_type"))?;

        rows.iter()
            .map(|row| -> Result<TypeReviewCount> {
                let type_id: i32 = row.try_get("type_id")?;
                let count: i64 = row.try_get("num_reviews")?;
                Ok(TypeReviewCount {
                    type_id,
                    count: count.max(0) as u64,
                })
            })
            .collect()
    }

    async fn popular_items(&self, max_reviews: u64, limit: usize) -> Result<Vec<ItemPopularity>> {
        let rows = sqlx::query(
            r#"
            SELECT asin, COUNT(*) AS num_reviews
            FROM reviews
            GROUP BY asin
            HAVING COUNT(*) < $1
            ORDER BY num_reviews DESC, asin
            LIMIT $2
            "#,
        )
        .bind(max_reviews.min(i64::MAX as u64) as i64)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .instrument(store_span("reviews", "popular_items"))
        .await
        .map_err(|e| ReviewGraphError::database(e.to_string(), "popular_items"))?;

        rows.iter()
            .map(|row| -> Result<ItemPopularity> {
                let asin: String = row.try_get("asin")?;
                let count: i64 = row.try_get("num_reviews")?;
                Ok(ItemPopularity::new(asin, count.max(0) as u64))
            })
            .collect()
    }

    async fn reviewers_of_item(&self, asin: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT reviewer_id
            FROM reviews
            WHERE asin = $1
            ORDER BY reviewer_id
            "#,
        )
        .bind(asin)
        .fetch_all(&self.pool)
        .instrument(store_span("reviews", "reviewers_of_item"))
        .await
        .map_err(|e| ReviewGraphError::database(e.to_string(), "reviewers_of_item"))?;

        debug!(asin, reviewers = rows.len(), "Fetched item reviewers");

        rows.iter()
            .map(|row| -> Result<String> { Ok(row.try_get("reviewer_id")?) })
            .collect()
    }
}

/// Item identities stored in the `items` table
#[derive(Clone)]
pub struct PostgresItemCatalog {
    pool: PgPool,
}

impl PostgresItemCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ItemCatalog for PostgresItemCatalog {
    async fn item_keys(&self) -> Result<Vec<ItemKey>> {
        let rows = sqlx::query(
            r#"
            SELECT asin, type_id
            FROM items
            ORDER BY type_id, asin
            "#,
        )
        .fetch_all(&self.pool)
        .instrument(store_span("items", "item_keys"))
        .await
        .map_err(|e| ReviewGraphError::database(e.to_string(), "item_keys"))?;

        rows.iter()
            .map(|row| -> Result<ItemKey> {
                let asin: String = row.try_get("asin")?;
                let type_id: i32 = row.try_get("type_id")?;
                Ok(ItemKey::new(asin, type_id))
            })
            .collect()
    }

    async fn product_types(&self) -> Result<Vec<ProductType>> {
        let rows = sqlx::query("SELECT id, type FROM types ORDER BY id")
            .fetch_all(&self.pool)
            .instrument(store_span("types", "product_types"))
            .await
            .map_err(|e| ReviewGraphError::database(e.to_string(), "product_types"))?;

        rows.iter()
            .map(|row| -> Result<ProductType> {
                let id: i32 = row.try_get("id")?;
                let name: String = row.try_get("type")?;
                Ok(ProductType::new(id, name))
            })
            .collect()
    }

    async fn reviewer_profiles(&self, limit: usize) -> Result<Vec<ReviewerProfile>> {
        let rows = sqlx::query(
            r#"
            SELECT reviewer_id, reviewer_name
            FROM reviewers
            ORDER BY reviewer_name NULLS LAST, reviewer_id
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .instrument(store_span("reviewers", "reviewer_profiles"))
        .await
        .map_err(|e| ReviewGraphError::database(e.to_string(), "reviewer_profiles"))?;

        rows.iter()
            .map(|row| -> Result<ReviewerProfile> {
                let reviewer_id: String = row.try_get("reviewer_id")?;
                let reviewer_name: Option<String> = row.try_get("reviewer_name")?;
                Ok(ReviewerProfile::new(reviewer_id, reviewer_name))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use review_graph_core::{ConfigLoader, DatabaseConfig, DatabasePool};

    async fn setup_pool() -> Result<PgPool> {
        let config = DatabaseConfig::from_env()?;
        let pool = DatabasePool::connect(&config).await?;
        Ok(pool.pool().clone())
    }

    #[tokio::test]
    #[ignore] // Requires PostgreSQL with the reviews and items tables
    async fn test_postgres_review_store_round_trip() -> Result<()> {
        let pool = setup_pool().await?;
        let store = PostgresReviewStore::new(pool.clone());

        let top = store.top_reviewers(5).await?;
        assert!(top.len() <= 5);
        assert!(top.windows(2).all(|w| w[0].review_count >= w[1].review_count));

        if let Some(first) = top.first() {
            let reviews = store.reviews_by_reviewer(&first.reviewer_id).await?;
            assert_eq!(reviews.len() as u64, first.review_count);
        }

        let catalog = PostgresItemCatalog::new(pool);
        let items = catalog.item_keys().await?;
        let all = store.all_reviews().await?;
        for review in all.iter().take(100) {
            assert!(items.contains(&review.item_key()));
        }

        let types: Vec<i32> = catalog.product_types().await?.iter().map(|t| t.id).collect();
        if let Some(first) = top.first() {
            for count in store.review_counts_by_type(&first.reviewer_id).await? {
                assert!(types.contains(&count.type_id));
            }
        }

        let popular = store.popular_items(40, 5).await?;
        assert!(popular.iter().all(|item| item.review_count < 40));
        if let Some(item) = popular.first() {
            let reviewers = store.reviewers_of_item(&item.asin).await?;
            assert!(!reviewers.is_empty());
        }

        Ok(())
    }
}
