//! ConfigLoader facade delegating to merge service.

use super::merge::service::MergeService;
use super::SnapshotConfig;
use config::ConfigError;
use std::path::{Path, PathBuf};

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Path of the global config file (`$XDG_CONFIG_HOME/treesnap/config.toml`)
    pub fn global_config_path() -> Option<PathBuf> {
        super::xdg::config_home()
            .ok()
            .map(|home| home.join("treesnap").join("config.toml"))
    }

    /// Load configuration from the global file and environment.
    pub fn load() -> Result<SnapshotConfig, ConfigError> {
        MergeService::load()
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<SnapshotConfig, ConfigError> {
        MergeService::load_from_file(path)
    }

    /// Create default configuration.
    pub fn default() -> SnapshotConfig {
        SnapshotConfig::default()
    }
}
