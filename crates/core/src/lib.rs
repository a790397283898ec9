//! # Review Graph Core
//!
//! Shared building blocks for the review-graph batch jobs.
//!
//! ## Modules
//!
//! - `error`: Error type and result alias
//! - `config`: Configuration loading and validation
//! - `telemetry`: Structured logging setup
//! - `models`: Typed review, item and reviewer records
//! - `validation`: Boundary validation for records
//! - `database`: Shared PostgreSQL connection pool

pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod telemetry;
pub mod validation;

// Re-export commonly used types
pub use config::{
    load_dotenv, ConfigLoader, DatabaseConfig, GraphConfig, JobConfig, MaskSampling,
};
pub use database::DatabasePool;
pub use error::ReviewGraphError;
pub use models::{
    ItemKey, ItemPopularity, ProductType, ReviewRecord, ReviewerProfile, ReviewerSummary,
    TypeReviewCount,
};
pub use telemetry::{init_logging, store_span, LogConfig, TelemetryError};

/// Result type alias for review-graph operations
pub type Result<T> = std::result::Result<T, ReviewGraphError>;
