//! Configuration
//!
//! Layered configuration for snapshot stores: serde defaults, an optional global
//! TOML file and a `TREESNAP__` environment overlay.

pub mod facade;
pub mod merge;
pub mod paths;
pub mod sources;

pub use facade::ConfigLoader;
pub use paths::storage::SnapshotLocation;
pub use paths::xdg_root as xdg;

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Root directory for snapshot databases; None means the XDG data directory
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_open_timeout_ms() -> u64 {
    5_000
}

fn default_open_retry_interval_ms() -> u64 {
    50
}

fn default_cache_capacity_bytes() -> u64 {
    64 * 1024 * 1024
}

fn default_true() -> bool {
    true
}

/// Node store tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// How long to wait for another handle to release the database
    #[serde(default = "default_open_timeout_ms")]
    pub open_timeout_ms: u64,

    /// Delay between open attempts while the database is locked
    #[serde(default = "default_open_retry_interval_ms")]
    pub open_retry_interval_ms: u64,

    /// sled page cache size
    #[serde(default = "default_cache_capacity_bytes")]
    pub cache_capacity_bytes: u64,

    /// Flush to disk after every committed write transaction
    #[serde(default = "default_true")]
    pub flush_on_commit: bool,
}

impl StoreConfig {
    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }

    pub fn open_retry_interval(&self) -> Duration {
        Duration::from_millis(self.open_retry_interval_ms.max(1))
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            open_timeout_ms: default_open_timeout_ms(),
            open_retry_interval_ms: default_open_retry_interval_ms(),
            cache_capacity_bytes: default_cache_capacity_bytes(),
            flush_on_commit: default_true(),
        }
    }
}

impl SnapshotConfig {
    /// Configuration rooted at an explicit data directory
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(data_dir.into()),
            ..Self::default()
        }
    }
}
