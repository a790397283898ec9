//! Error types shared by every review-graph component
//!
//! Store failures are never retried: they propagate to the enclosing batch
//! job and abort it.

use thiserror::Error;

/// Unified error type for review-graph operations
#[derive(Debug, Error)]
pub enum ReviewGraphError {
    /// Missing or malformed configuration value
    #[error("Configuration error: {message}")]
    ConfigurationError {
        message: String,
        key: Option<String>,
    },

    /// Input failed boundary validation
    #[error("Validation error: {message}")]
    ValidationError {
        message: String,
        field: Option<String>,
    },

    /// Relational or document store failure
    #[error("Database error during {operation}: {message}")]
    DatabaseError { message: String, operation: String },

    /// Graph store failure
    #[error("Graph store error during {operation}: {message}")]
    GraphStoreError { message: String, operation: String },

    /// Malformed line in the similarity artifact
    #[error("Malformed similarity artifact at line {line}: {message}")]
    ArtifactFormat { line: usize, message: String },

    /// Review references an item the catalog does not know
    #[error("Unknown item {asin}-{type_id}")]
    UnknownItem { asin: String, type_id: i32 },

    /// Review count references a category missing from the `types` table
    #[error("Unknown product type {0}")]
    UnknownProductType(i32),

    /// Similarity edge references a reviewer with no matrix row
    #[error("Unknown reviewer {0}")]
    UnknownReviewer(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReviewGraphError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }

    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn database(message: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::DatabaseError {
            message: message.into(),
            operation: operation.into(),
        }
    }

    pub fn graph(message: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::GraphStoreError {
            message: message.into(),
            operation: operation.into(),
        }
    }

    pub fn configuration(message: impl Into<String>, key: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

impl From<sqlx::Error> for ReviewGraphError {
    fn from(err: sqlx::Error) -> Self {
        Self::database(err.to_string(), "query")
    }
}

impl From<neo4rs::Error> for ReviewGraphError {
    fn from(err: neo4rs::Error) -> Self {
        Self::graph(err.to_string(), "query")
    }
}
