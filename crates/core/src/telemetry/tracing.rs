//! Tracing subscriber configuration and initialization

use thiserror::Error;
use tracing::Span;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::JobConfig;

/// Logging setup errors
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Invalid log filter '{0}'")]
    InvalidFilter(String),

    #[error("Failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),
}

/// Log output configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Emit one JSON object per event instead of human-readable lines
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl From<&JobConfig> for LogConfig {
    fn from(config: &JobConfig) -> Self {
        Self {
            level: config.log_level.clone(),
            json: config.log_json,
        }
    }
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over `config.level`. Must be called once at
/// process startup.
///
/// # Errors
///
/// Returns error if the filter directive is invalid or a global subscriber
/// is already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|_| TelemetryError::InvalidFilter(config.level.clone()))?,
    };

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if config.json {
        subscriber
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()
            .map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?;
    } else {
        subscriber
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_line_number(true),
            )
            .try_init()
            .map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?;
    }

    tracing::debug!(level = %config.level, json = config.json, "Logging initialized");

    Ok(())
}

/// Span wrapping a single store round-trip
///
/// # Example
///
/// ```rust
/// use review_graph_core::telemetry::store_span;
///
/// let _span = store_span("graph", "similarity_edges").entered();
/// ```
pub fn store_span(store: &str, operation: &str) -> Span {
    tracing::debug_span!("store", store = %store, operation = %operation)
}
