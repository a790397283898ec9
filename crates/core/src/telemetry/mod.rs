//! Structured logging for review-graph batch jobs
//!
//! # Example
//!
//! ```rust,no_run
//! use review_graph_core::telemetry::{init_logging, LogConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging(&LogConfig {
//!         level: "debug".to_string(),
//!         json: true,
//!     })?;
//!     Ok(())
//! }
//! ```

pub mod tracing;

pub use self::tracing::{init_logging, store_span, LogConfig, TelemetryError};
