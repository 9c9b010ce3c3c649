//! attest service host: runs the verification engine behind an async API.
//!
//! The host:
//! - Loads TOML configuration and validates the verification policy
//! - Executes serialisable operations with bounded concurrency
//! - Folds engine events into Prometheus metrics
//! - Persists and restores engine snapshots

pub mod config;
pub mod error;
pub mod metrics;
pub mod service;
pub mod tracing_spans;

pub use config::NodeConfig;
pub use error::NodeError;
pub use metrics::ServiceMetrics;
pub use service::{Operation, OperationOutcome, VerificationService};
