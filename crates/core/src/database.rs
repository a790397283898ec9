//! PostgreSQL connection pool for the review and item tables

use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::ReviewGraphError;

/// Shared database connection pool
#[derive(Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Open a new pool
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, ReviewGraphError> {
        info!(
            "Connecting to database with max {} connections",
            config.max_connections
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .connect(&config.url)
            .await
            .map_err(|e| ReviewGraphError::database(e.to_string(), "connect"))?;

        info!("Database connection pool established");
        Ok(Self { pool })
    }

    /// Get reference to underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close every connection; the pool cannot be used afterwards
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connection pool closed");
    }
}
