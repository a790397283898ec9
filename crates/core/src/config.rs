//! Configuration loader for review-graph batch jobs
//!
//! Every value is read from an environment variable with the `REVIEW_GRAPH_`
//! prefix. A `.env` file in the working directory is honoured via dotenvy.
//!
//! # Example
//!
//! ```no_run
//! use review_graph_core::config::{load_dotenv, ConfigLoader, DatabaseConfig, JobConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! load_dotenv();
//!
//! let db_config = DatabaseConfig::from_env()?;
//! let job_config = JobConfig::from_env()?;
//!
//! db_config.validate()?;
//! job_config.validate()?;
//! # Ok(())
//! # }
//! ```

use crate::error::ReviewGraphError;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Configuration loader trait
///
/// Provides standardized methods for loading and validating configuration from
/// environment variables.
pub trait ConfigLoader: Sized {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if a required variable is missing or a
    /// value cannot be parsed.
    fn from_env() -> Result<Self, ReviewGraphError>;

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if any validation check fails.
    fn validate(&self) -> Result<(), ReviewGraphError>;
}

/// PostgreSQL configuration for the review and item tables
///
/// # Environment Variables
///
/// - `REVIEW_GRAPH_DATABASE_URL` (required, falls back to `DATABASE_URL`)
/// - `REVIEW_GRAPH_DATABASE_MAX_CONNECTIONS` (optional, default: 5)
/// - `REVIEW_GRAPH_DATABASE_CONNECT_TIMEOUT` (optional, seconds, default: 30)
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/reviews".to_string(),
            max_connections: 5,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl ConfigLoader for DatabaseConfig {
    fn from_env() -> Result<Self, ReviewGraphError> {
        let url = std::env::var("REVIEW_GRAPH_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .map_err(|_| {
                ReviewGraphError::configuration(
                    "DATABASE_URL or REVIEW_GRAPH_DATABASE_URL must be set",
                    "REVIEW_GRAPH_DATABASE_URL",
                )
            })?;

        let max_connections = parse_env_var(
            "REVIEW_GRAPH_DATABASE_MAX_CONNECTIONS",
            DatabaseConfig::default().max_connections,
        )?;

        let connect_timeout_secs = parse_env_var("REVIEW_GRAPH_DATABASE_CONNECT_TIMEOUT", 30u64)?;

        Ok(Self {
            url,
            max_connections,
            connect_timeout: Duration::from_secs(connect_timeout_secs),
        })
    }

    fn validate(&self) -> Result<(), ReviewGraphError> {
        Url::parse(&self.url).map_err(|e| {
            ReviewGraphError::configuration(
                format!("Invalid DATABASE_URL: {}", e),
                "REVIEW_GRAPH_DATABASE_URL",
            )
        })?;

        if self.max_connections == 0 {
            return Err(ReviewGraphError::configuration(
                "max_connections must be greater than 0",
                "REVIEW_GRAPH_DATABASE_MAX_CONNECTIONS",
            ));
        }

        if self.connect_timeout.as_secs() == 0 {
            return Err(ReviewGraphError::configuration(
                "connect_timeout must be greater than 0 seconds",
                "REVIEW_GRAPH_DATABASE_CONNECT_TIMEOUT",
            ));
        }

        Ok(())
    }
}

/// Neo4j connection configuration
///
/// # Environment Variables
///
/// - `REVIEW_GRAPH_NEO4J_URI` (optional, default: `127.0.0.1:7687`)
/// - `REVIEW_GRAPH_NEO4J_USER` (optional, default: `neo4j`)
/// - `REVIEW_GRAPH_NEO4J_PASSWORD` (required)
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "127.0.0.1:7687".to_string(),
            user: "neo4j".to_string(),
            password: String::new(),
        }
    }
}

impl ConfigLoader for GraphConfig {
    fn from_env() -> Result<Self, ReviewGraphError> {
        let defaults = GraphConfig::default();

        let password = std::env::var("REVIEW_GRAPH_NEO4J_PASSWORD").map_err(|_| {
            ReviewGraphError::configuration(
                "REVIEW_GRAPH_NEO4J_PASSWORD must be set",
                "REVIEW_GRAPH_NEO4J_PASSWORD",
            )
        })?;

        Ok(Self {
            uri: std::env::var("REVIEW_GRAPH_NEO4J_URI").unwrap_or(defaults.uri),
            user: std::env::var("REVIEW_GRAPH_NEO4J_USER").unwrap_or(defaults.user),
            password,
        })
    }

    fn validate(&self) -> Result<(), ReviewGraphError> {
        if self.uri.trim().is_empty() {
            return Err(ReviewGraphError::configuration(
                "Neo4j URI cannot be empty",
                "REVIEW_GRAPH_NEO4J_URI",
            ));
        }

        if self.user.trim().is_empty() {
            return Err(ReviewGraphError::configuration(
                "Neo4j user cannot be empty",
                "REVIEW_GRAPH_NEO4J_USER",
            ));
        }

        Ok(())
    }
}

/// How masked coordinates are drawn from the known ratings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskSampling {
    /// Independent draws; the same coordinate may be picked twice
    WithReplacement,
    /// Distinct coordinates only
    WithoutReplacement,
}

impl FromStr for MaskSampling {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "with-replacement" | "with_replacement" => Ok(MaskSampling::WithReplacement),
            "without-replacement" | "without_replacement" => Ok(MaskSampling::WithoutReplacement),
            other => Err(format!("unknown sampling mode '{}'", other)),
        }
    }
}

/// Batch job parameters
///
/// # Environment Variables
///
/// - `REVIEW_GRAPH_TOP_REVIEWERS` (default: 30)
/// - `REVIEW_GRAPH_SIMILARITY_FILE` (default: `similarities.txt`)
/// - `REVIEW_GRAPH_MAX_CACHE_SIZE` (default: 30)
/// - `REVIEW_GRAPH_KNN_NEIGHBORS` (default: 20)
/// - `REVIEW_GRAPH_MASK_RATIO` (default: 0.1)
/// - `REVIEW_GRAPH_MASK_SEED` (default: 33)
/// - `REVIEW_GRAPH_MASK_SAMPLING` (default: `with-replacement`)
/// - `REVIEW_GRAPH_CATEGORY_REVIEWERS` (default: 400)
/// - `REVIEW_GRAPH_MIN_PRODUCT_TYPES` (default: 2)
/// - `REVIEW_GRAPH_POPULAR_ITEMS` (default: 5)
/// - `REVIEW_GRAPH_POPULAR_MAX_REVIEWS` (default: 40)
/// - `REVIEW_GRAPH_LOG_LEVEL` (default: `info`)
/// - `REVIEW_GRAPH_LOG_JSON` (default: false)
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Number of most active reviewers compared pairwise
    pub top_reviewers: usize,
    /// Intermediate similarity artifact path
    pub similarity_file: String,
    /// Capacity of the per-user article set cache
    pub max_cache_size: usize,
    /// Neighbours averaged by the KNN imputer
    pub knn_neighbors: usize,
    /// Fraction of known ratings held out for evaluation
    pub mask_ratio: f64,
    pub mask_seed: u64,
    pub mask_sampling: MaskSampling,
    /// Reviewers read from the relational store, in name order
    pub category_reviewers: usize,
    /// Categories a reviewer must have written in to get `WROTE` edges
    pub min_product_types: usize,
    /// Items linked by `REVIEWED` edges
    pub popular_items: usize,
    /// Exclusive upper bound on the review count of a linked item
    pub popular_max_reviews: u64,
    pub log_level: String,
    pub log_json: bool,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            top_reviewers: 30,
            similarity_file: "similarities.txt".to_string(),
            max_cache_size: 30,
            knn_neighbors: 20,
            mask_ratio: 0.1,
            mask_seed: 33,
            mask_sampling: MaskSampling::WithReplacement,
            category_reviewers: 400,
            min_product_types: 2,
            popular_items: 5,
            popular_max_reviews: 40,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl ConfigLoader for JobConfig {
    fn from_env() -> Result<Self, ReviewGraphError> {
        let defaults = JobConfig::default();

        Ok(Self {
            top_reviewers: parse_env_var("REVIEW_GRAPH_TOP_REVIEWERS", defaults.top_reviewers)?,
            similarity_file: std::env::var("REVIEW_GRAPH_SIMILARITY_FILE")
                .unwrap_or(defaults.similarity_file),
            max_cache_size: parse_env_var("REVIEW_GRAPH_MAX_CACHE_SIZE", defaults.max_cache_size)?,
            knn_neighbors: parse_env_var("REVIEW_GRAPH_KNN_NEIGHBORS", defaults.knn_neighbors)?,
            mask_ratio: parse_env_var("REVIEW_GRAPH_MASK_RATIO", defaults.mask_ratio)?,
            mask_seed: parse_env_var("REVIEW_GRAPH_MASK_SEED", defaults.mask_seed)?,
            mask_sampling: parse_env_var("REVIEW_GRAPH_MASK_SAMPLING", defaults.mask_sampling)?,
            category_reviewers: parse_env_var(
                "REVIEW_GRAPH_CATEGORY_REVIEWERS",
                defaults.category_reviewers,
            )?,
            min_product_types: parse_env_var(
                "REVIEW_GRAPH_MIN_PRODUCT_TYPES",
                defaults.min_product_types,
            )?,
            popular_items: parse_env_var("REVIEW_GRAPH_POPULAR_ITEMS", defaults.popular_items)?,
            popular_max_reviews: parse_env_var(
                "REVIEW_GRAPH_POPULAR_MAX_REVIEWS",
                defaults.popular_max_reviews,
            )?,
            log_level: std::env::var("REVIEW_GRAPH_LOG_LEVEL").unwrap_or(defaults.log_level),
            log_json: parse_env_var("REVIEW_GRAPH_LOG_JSON", defaults.log_json)?,
        })
    }

    fn validate(&self) -> Result<(), ReviewGraphError> {
        if self.max_cache_size == 0 {
            return Err(ReviewGraphError::configuration(
                "max_cache_size must be at least 1",
                "REVIEW_GRAPH_MAX_CACHE_SIZE",
            ));
        }

        if self.knn_neighbors == 0 {
            return Err(ReviewGraphError::configuration(
                "knn_neighbors must be at least 1",
                "REVIEW_GRAPH_KNN_NEIGHBORS",
            ));
        }

        if !(self.mask_ratio > 0.0 && self.mask_ratio <= 1.0) {
            return Err(ReviewGraphError::configuration(
                format!("mask_ratio must be in (0, 1], got {}", self.mask_ratio),
                "REVIEW_GRAPH_MASK_RATIO",
            ));
        }

        if self.min_product_types == 0 {
            return Err(ReviewGraphError::configuration(
                "min_product_types must be at least 1",
                "REVIEW_GRAPH_MIN_PRODUCT_TYPES",
            ));
        }

        if self.popular_max_reviews == 0 {
            return Err(ReviewGraphError::configuration(
                "popular_max_reviews must be at least 1",
                "REVIEW_GRAPH_POPULAR_MAX_REVIEWS",
            ));
        }

        if self.similarity_file.trim().is_empty() {
            return Err(ReviewGraphError::configuration(
                "similarity_file cannot be empty",
                "REVIEW_GRAPH_SIMILARITY_FILE",
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ReviewGraphError::configuration(
                format!(
                    "Invalid log_level '{}'. Must be one of: {}",
                    self.log_level,
                    valid_log_levels.join(", ")
                ),
                "REVIEW_GRAPH_LOG_LEVEL",
            ));
        }

        Ok(())
    }
}

/// Parse an environment variable, falling back to `default` when unset
///
/// # Errors
///
/// Returns a `ConfigurationError` if the value cannot be parsed
fn parse_env_var<T>(key: &str, default: T) -> Result<T, ReviewGraphError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    std::env::var(key)
        .ok()
        .map(|v| {
            v.parse::<T>().map_err(|e| {
                ReviewGraphError::configuration(format!("Failed to parse {}: {}", key, e), key)
            })
        })
        .unwrap_or(Ok(default))
}

/// Load .env file if present
///
/// Does not fail when the file is missing.
pub fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }
}
