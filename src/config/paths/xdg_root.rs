//! XDG Base Directory utilities for snapshot data management.

use crate::error::SnapshotError;
use std::path::PathBuf;

const APP_DIR: &str = "treesnap";

/// Get XDG data home directory
///
/// Returns `$XDG_DATA_HOME` if set, otherwise defaults to `$HOME/.local/share`
/// Follows XDG Base Directory Specification
pub fn data_home() -> Option<PathBuf> {
    if let Ok(xdg_data_home) = std::env::var("XDG_DATA_HOME") {
        if !xdg_data_home.is_empty() {
            return Some(PathBuf::from(xdg_data_home));
        }
    }

    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".local").join("share"))
}

/// Get XDG config home directory
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise defaults to `$HOME/.config`
pub fn config_home() -> Result<PathBuf, SnapshotError> {
    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg_config_home.is_empty() {
            return Ok(PathBuf::from(xdg_config_home));
        }
    }

    let home = std::env::var("HOME").map_err(|_| {
        SnapshotError::Config(
            "Could not determine XDG config home directory (HOME not set)".to_string(),
        )
    })?;

    Ok(PathBuf::from(home).join(".config"))
}

/// Application data root used when no `data_dir` is configured
///
/// Returns `$XDG_DATA_HOME/treesnap/`, falling back to the platform data
/// directory when neither `XDG_DATA_HOME` nor `HOME` is available.
pub fn data_root() -> Result<PathBuf, SnapshotError> {
    if let Some(data_home) = data_home() {
        return Ok(data_home.join(APP_DIR));
    }

    directories::ProjectDirs::from("", "", APP_DIR)
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            SnapshotError::Config("Could not determine a data directory for snapshots".to_string())
        })
}
