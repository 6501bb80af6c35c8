//! On-disk location of a snapshot database.

use crate::config::{xdg, SnapshotConfig};
use crate::error::SnapshotError;
use std::path::{Path, PathBuf};

/// Where one snapshot lives
///
/// ```text
/// <data root>/sync/<sync id>/snapshot-<name>
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotLocation {
    /// Directory shared by every snapshot of the sync pair
    pub folder: PathBuf,
    /// sled database path
    pub database: PathBuf,
}

/// Reject identifiers that could escape the data root once joined into a path.
fn validate_identifier(value: &str) -> Result<(), SnapshotError> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', '\0']);
    if invalid {
        return Err(SnapshotError::InvalidIdentifier(value.to_string()));
    }
    Ok(())
}

impl SnapshotLocation {
    pub fn resolve(
        config: &SnapshotConfig,
        sync_id: &str,
        name: &str,
    ) -> Result<Self, SnapshotError> {
        let root = match &config.data_dir {
            Some(dir) => dir.clone(),
            None => xdg::data_root()?,
        };
        Self::under(&root, sync_id, name)
    }

    pub fn under(root: &Path, sync_id: &str, name: &str) -> Result<Self, SnapshotError> {
        validate_identifier(sync_id)?;
        validate_identifier(name)?;

        let folder = root.join("sync").join(sync_id);
        let database = folder.join(format!("snapshot-{}", name));
        Ok(Self { folder, database })
    }
}
