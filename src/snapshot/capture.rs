//! Capture protocol: stage a full walk, then promote it to the current tree.
//!
//! Staging and promotion are two separate write transactions, so a slow
//! source walk never holds back readers. A crash between them leaves the old
//! current tree and a stale `capture` bucket, which the next capture drops.

use super::{encode_node, Snapshot};
use crate::error::SnapshotError;
use crate::model::PathSyncSource;
use crate::store::{WriteTxn, CAPTURE_BUCKET, SNAPSHOT_BUCKET};
use crate::tree::{path, TreeNode};
use std::sync::atomic::Ordering;
use tracing::{debug, info, warn};

impl Snapshot {
    /// Replace the current tree with a fresh walk of `source`.
    ///
    /// With no `paths` the source is walked from `/`; otherwise once per path.
    /// On any error the current tree is left exactly as it was.
    pub fn capture(&self, source: &dyn PathSyncSource, paths: &[&str]) -> Result<(), SnapshotError> {
        let staged = self.store.update(|tx| stage(tx, source, paths))?;
        debug!(snapshot = %self.name, staged, "capture staged");

        self.store.update(promote)?;
        self.empty.store(false, Ordering::Release);

        info!(snapshot = %self.name, nodes = staged, "capture promoted");
        Ok(())
    }
}

fn stage(
    tx: &mut WriteTxn<'_>,
    source: &dyn PathSyncSource,
    paths: &[&str],
) -> Result<usize, SnapshotError> {
    if tx.has_bucket(CAPTURE_BUCKET)? {
        tx.delete_bucket(CAPTURE_BUCKET)?;
    }
    tx.create_bucket(CAPTURE_BUCKET)?;

    let roots: &[&str] = if paths.is_empty() { &["/"] } else { paths };
    let mut staged = 0;

    for root in roots {
        let mut failure: Option<SnapshotError> = None;
        let walked = source.walk(
            &mut |node_path: &str, result: Result<&TreeNode, &SnapshotError>| {
                if failure.is_some() {
                    return;
                }
                let node = match result {
                    Ok(node) => node,
                    Err(e) => {
                        warn!(path = %node_path, error = %e, "source reported entry error, not captured");
                        return;
                    }
                };
                let key = path::normalize(node_path);
                match encode_node(&node.relocated(key)) {
                    Ok(record) => match tx.put(CAPTURE_BUCKET, key.as_bytes(), record) {
                        Ok(()) => staged += 1,
                        Err(e) => failure = Some(e),
                    },
                    Err(e) => failure = Some(e),
                }
            },
            root,
        );

        walked.map_err(|e| SnapshotError::WalkAborted {
            root: root.to_string(),
            source: Box::new(e),
        })?;
        if let Some(e) = failure {
            return Err(e);
        }
    }

    Ok(staged)
}

fn promote(tx: &mut WriteTxn<'_>) -> Result<(), SnapshotError> {
    tx.require_bucket(CAPTURE_BUCKET)?;
    if tx.has_bucket(SNAPSHOT_BUCKET)? {
        tx.delete_bucket(SNAPSHOT_BUCKET)?;
    }
    tx.create_bucket(SNAPSHOT_BUCKET)?;

    for (key, value) in tx.scan_prefix(CAPTURE_BUCKET, b"")? {
        tx.put(SNAPSHOT_BUCKET, &key, value)?;
    }
    tx.delete_bucket(CAPTURE_BUCKET)
}
