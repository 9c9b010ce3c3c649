//! Service configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Semaphore;

use attest_types::VerificationParams;
use attest_utils::LogFormat;

use crate::NodeError;

/// Configuration for an attest service.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Account that receives every escrowed vote stake.
    #[serde(default = "default_custody_account")]
    pub custody_account: String,

    /// Upper bound on engine operations running at once.
    #[serde(default = "default_max_concurrent_ops")]
    pub max_concurrent_ops: usize,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to collect Prometheus metrics.
    #[serde(default)]
    pub enable_metrics: bool,

    /// Where engine snapshots are written, if anywhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_path: Option<PathBuf>,

    /// Verification policy. Keys left out keep their reference values.
    #[serde(default)]
    pub params: VerificationParams,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_custody_account() -> String {
    "custody".to_string()
}

fn default_max_concurrent_ops() -> usize {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string and validate it.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), NodeError> {
        self.params
            .validate()
            .map_err(|e| NodeError::Config(e.to_string()))?;
        if self.custody_account.is_empty() {
            return Err(NodeError::Config("custody_account must not be empty".into()));
        }
        if self.max_concurrent_ops == 0 {
            return Err(NodeError::Config("max_concurrent_ops must be at least 1".into()));
        }
        self.permit_count()?;
        Ok(())
    }

    /// `max_concurrent_ops` as a semaphore permit count. Snapshots acquire
    /// every permit at once, which tokio limits to a `u32`.
    pub fn permit_count(&self) -> Result<u32, NodeError> {
        let max = u32::try_from(Semaphore::MAX_PERMITS).unwrap_or(u32::MAX);
        u32::try_from(self.max_concurrent_ops)
            .ok()
            .filter(|n| *n <= max)
            .ok_or_else(|| {
                NodeError::Config(format!(
                    "max_concurrent_ops must be at most {max}, got {}",
                    self.max_concurrent_ops
                ))
            })
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            custody_account: default_custody_account(),
            max_concurrent_ops: default_max_concurrent_ops(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            enable_metrics: false,
            snapshot_path: None,
            params: VerificationParams::default(),
        }
    }
}
