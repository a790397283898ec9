//! Neo4j-backed reviewer graph
//!
//! Reviewers are `(:User {user_id})` nodes; each similarity is stored as a
//! pair of `[:SIMILAR_TO {similarity}]` edges, one per direction. Categories
//! are `(:ProductType {product_type})` and reviewed items
//! `(:Article {asin})`.

use async_trait::async_trait;
use neo4rs::{query, Graph};
use tracing::{debug, info, Instrument};

use review_graph_core::{store_span, GraphConfig, Result, ReviewGraphError};

use super::GraphStore;
use crate::artifact::SimilarityRecord;
use crate::relations::{SharedReviewPair, WroteRecord};

/// Graph store client
#[derive(Clone)]
pub struct Neo4jGraphStore {
    graph: Graph,
}

impl Neo4jGraphStore {
    pub async fn connect(config: &GraphConfig) -> Result<Self> {
        let graph = Graph::new(&config.uri, &config.user, &config.password)
            .await
            .map_err(|e| ReviewGraphError::graph(e.to_string(), "connect"))?;

        info!(uri = %config.uri, "Connected to Neo4j");
        Ok(Self { graph })
    }
}

#[async_trait]
impl GraphStore for Neo4jGraphStore {
    async fn reviewer_ids(&self) -> Result<Vec<String>> {
        let mut result = self
            .graph
            .execute(query(
                "MATCH (n:User) RETURN n.user_id AS user_id ORDER BY user_id",
            ))
            .instrument(store_span("graph", "reviewer_ids"))
            .await
            .map_err(|e| ReviewGraphError::graph(e.to_string(), "reviewer_ids"))?;

        let mut ids = Vec::new();
        while let Some(row) = result.next().await? {
            let user_id: String = row
                .get("user_id")
                .map_err(|e| ReviewGraphError::graph(e.to_string(), "reviewer_ids"))?;
            ids.push(user_id);
        }

        debug!(reviewers = ids.len(), "Fetched reviewer nodes");
        Ok(ids)
    }

    async fn similarity_edges(&self) -> Result<Vec<SimilarityRecord>> {
        let cypher = r#"
            MATCH (u1:User)-[s:SIMILAR_TO]->(u2:User)
            RETURN u1.user_id AS user1, u2.user_id AS user2, s.similarity AS similarity
        "#;

        let mut result = self
            .graph
            .execute(query(cypher))
            .instrument(store_span("graph", "similarity_edges"))
            .await
            .map_err(|e| ReviewGraphError::graph(e.to_string(), "similarity_edges"))?;

        let mut edges = Vec::new();
        while let Some(row) = result.next().await? {
            let user1: String = row
                .get("user1")
                .map_err(|e| ReviewGraphError::graph(e.to_string(), "similarity_edges"))?;
            let user2: String = row
                .get("user2")
                .map_err(|e| ReviewGraphError::graph(e.to_string(), "similarity_edges"))?;
            let similarity: f64 = row
                .get("similarity")
                .map_err(|e| ReviewGraphError::graph(e.to_string(), "similarity_edges"))?;
            edges.push(SimilarityRecord::new(user1, user2, similarity));
        }

        debug!(edges = edges.len(), "Fetched similarity edges");
        Ok(edges)
    }

    async fn insert_similarity(&self, record: &SimilarityRecord) -> Result<()> {
        let cypher = r#"
            MERGE (user1:User {user_id: $user1})
            MERGE (user2:User {user_id: $user2})
            CREATE (user1)-[:SIMILAR_TO {similarity: $similarity}]->(user2)
            CREATE (user1)<-[:SIMILAR_TO {similarity: $similarity}]-(user2)
        "#;

        self.graph
            .run(
                query(cypher)
                    .param("user1", record.user1.as_str())
                    .param("user2", record.user2.as_str())
                    .param("similarity", record.similarity),
            )
            .instrument(store_span("graph", "insert_similarity"))
            .await
            .map_err(|e| ReviewGraphError::graph(e.to_string(), "insert_similarity"))
    }

    async fn insert_wrote(&self, record: &WroteRecord) -> Result<()> {
        let cypher = r#"
            MERGE (reviewer:User {user_id: $user_id})
            SET reviewer.reviewer_name = $reviewer_name
            MERGE (type:ProductType {product_type: $product_type})
            MERGE (reviewer)-[wrote:WROTE]->(type)
            SET wrote.number_of_articles = $number_of_articles
        "#;

        self.graph
            .run(
                query(cypher)
                    .param("user_id", record.reviewer_id.as_str())
                    .param("reviewer_name", record.reviewer_name.as_str())
                    .param("product_type", record.product_type.as_str())
                    .param(
                        "number_of_articles",
                        record.number_of_articles.min(i64::MAX as u64) as i64,
                    ),
            )
            .instrument(store_span("graph", "insert_wrote"))
            .await
            .map_err(|e| ReviewGraphError::graph(e.to_string(), "insert_wrote"))
    }

    async fn wrote_edges(&self) -> Result<Vec<WroteRecord>> {
        let cypher = r#"
            MATCH (u:User)-[w:WROTE]->(t:ProductType)
            RETURN u.user_id AS user_id, u.reviewer_name AS reviewer_name,
                   t.product_type AS product_type, w.number_of_articles AS number_of_articles
            ORDER BY user_id, product_type
        "#;

        let mut result = self
            .graph
            .execute(query(cypher))
            .instrument(store_span("graph", "wrote_edges"))
            .await
            .map_err(|e| ReviewGraphError::graph(e.to_string(), "wrote_edges"))?;

        let mut edges = Vec::new();
        while let Some(row) = result.next().await? {
            let user_id: String = row
                .get("user_id")
                .map_err(|e| ReviewGraphError::graph(e.to_string(), "wrote_edges"))?;
            let reviewer_name: String = row
                .get("reviewer_name")
                .map_err(|e| ReviewGraphError::graph(e.to_string(), "wrote_edges"))?;
            let product_type: String = row
                .get("product_type")
                .map_err(|e| ReviewGraphError::graph(e.to_string(), "wrote_edges"))?;
            let count: i64 = row
                .get("number_of_articles")
                .map_err(|e| ReviewGraphError::graph(e.to_string(), "wrote_edges"))?;
            edges.push(WroteRecord::new(
                user_id,
                reviewer_name,
                product_type,
                count.max(0) as u64,
            ));
        }

        Ok(edges)
    }

    async fn insert_reviewed(&self, reviewer_id: &str, asin: &str) -> Result<()> {
        let cypher = r#"
            MERGE (a:Article {asin: $asin})
            MERGE (u:User {user_id: $user_id})
            MERGE (u)-[:REVIEWED]->(a)
        "#;

        self.graph
            .run(
                query(cypher)
                    .param("asin", asin)
                    .param("user_id", reviewer_id),
            )
            .instrument(store_span("graph", "insert_reviewed"))
            .await
            .map_err(|e| ReviewGraphError::graph(e.to_string(), "insert_reviewed"))
    }

    async fn shared_review_pairs(&self) -> Result<Vec<SharedReviewPair>> {
        let cypher = r#"
            MATCH (u1:User)-[:REVIEWED]->(a:Article)<-[:REVIEWED]-(u2:User)
            WHERE u1.user_id < u2.user_id
            WITH u1, u2, COUNT(DISTINCT a) AS shared_reviews
            RETURN u1.user_id AS user1, u2.user_id AS user2, shared_reviews
            ORDER BY shared_reviews DESC, user1, user2
        "#;

        let mut result = self
            .graph
            .execute(query(cypher))
            .instrument(store_span("graph", "shared_review_pairs"))
            .await
            .map_err(|e| ReviewGraphError::graph(e.to_string(), "shared_review_pairs"))?;

        let mut pairs = Vec::new();
        while let Some(row) = result.next().await? {
            let user1: String = row
                .get("user1")
                .map_err(|e| ReviewGraphError::graph(e.to_string(), "shared_review_pairs"))?;
            let user2: String = row
                .get("user2")
                .map_err(|e| ReviewGraphError::graph(e.to_string(), "shared_review_pairs"))?;
            let shared: i64 = row
                .get("shared_reviews")
                .map_err(|e| ReviewGraphError::graph(e.to_string(), "shared_review_pairs"))?;
            pairs.push(SharedReviewPair::new(user1, user2, shared.max(0) as u64));
        }

        debug!(pairs = pairs.len(), "Fetched shared review pairs");
        Ok(pairs)
    }

    async fn clear(&self) -> Result<()> {
        self.graph
            .run(query("MATCH (n) DETACH DELETE n"))
            .instrument(store_span("graph", "clear"))
            .await
            .map_err(|e| ReviewGraphError::graph(e.to_string(), "clear"))?;

        info!("Deleted every node and edge from the graph store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use review_graph_core::ConfigLoader;

    #[tokio::test]
    #[ignore] // Requires a running Neo4j instance
    async fn test_neo4j_similarity_round_trip() -> Result<()> {
        let store = Neo4jGraphStore::connect(&GraphConfig::from_env()?).await?;
        store.clear().await?;

        store
            .insert_similarity(&SimilarityRecord::new("A1", "A2", 0.25))
            .await?;

        assert_eq!(store.reviewer_ids().await?, vec!["A1", "A2"]);
        let edges = store.similarity_edges().await?;
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().all(|e| (e.similarity - 0.25).abs() < 1e-12));

        store.clear().await?;
        Ok(())
    }

    #[tokio::test]
    #[ignore] // Requires a running Neo4j instance
    async fn test_neo4j_reviewer_relations_round_trip() -> Result<()> {
        let store = Neo4jGraphStore::connect(&GraphConfig::from_env()?).await?;
        store.clear().await?;

        store
            .insert_wrote(&WroteRecord::new("A1", "amy", "Books", 3))
            .await?;
        store
            .insert_wrote(&WroteRecord::new("A1", "amy", "Books", 4))
            .await?;
        assert_eq!(
            store.wrote_edges().await?,
            vec![WroteRecord::new("A1", "amy", "Books", 4)]
        );

        for (user, asin) in [("A1", "X"), ("A2", "X"), ("A1", "Y"), ("A2", "Y")] {
            store.insert_reviewed(user, asin).await?;
        }
        assert_eq!(
            store.shared_review_pairs().await?,
            vec![SharedReviewPair::new("A1", "A2", 2)]
        );

        store.clear().await?;
        Ok(())
    }
}
