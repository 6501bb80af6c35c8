//! Snapshot Store
//!
//! Remembers the last known tree of a synchronization endpoint. The current
//! tree lives in the `snapshot` bucket keyed by normalized path; incremental
//! operations mutate it under write transactions and [`Snapshot::capture`]
//! replaces it wholesale from a fresh walk.

mod capture;

use crate::config::{ConfigLoader, SnapshotConfig, SnapshotLocation};
use crate::error::SnapshotError;
use crate::model::{
    ChecksumProvider, Endpoint, EndpointInfo, PathSyncSource, PathSyncTarget, WalkNodesFn,
    WatchObject, Watchable,
};
use crate::store::{BucketIter, NodeStore, WriteTxn, SNAPSHOT_BUCKET};
use crate::tree::{codec, path, NodeType, TreeNode};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Node counts of the current tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotStats {
    pub leaves: usize,
    pub collections: usize,
    pub placeholders: usize,
}

/// Persistent tree snapshot of one endpoint of a sync pair
pub struct Snapshot {
    store: NodeStore,
    name: String,
    location: SnapshotLocation,
    empty: AtomicBool,
}

fn encode_node(node: &TreeNode) -> Result<Vec<u8>, SnapshotError> {
    codec::encode(node).map_err(|source| SnapshotError::Encode {
        path: node.path.clone(),
        source,
    })
}

fn key_string(key: &[u8]) -> String {
    String::from_utf8_lossy(key).into_owned()
}

/// Store a placeholder collection for every missing ancestor of `key`.
fn materialize_ancestors(tx: &mut WriteTxn<'_>, key: &str) -> Result<(), SnapshotError> {
    for ancestor in path::ancestors(key) {
        if tx.get(SNAPSHOT_BUCKET, ancestor.as_bytes())?.is_none() {
            let placeholder = encode_node(&TreeNode::placeholder(ancestor))?;
            tx.put(SNAPSHOT_BUCKET, ancestor.as_bytes(), placeholder)?;
        }
    }
    Ok(())
}

impl Snapshot {
    /// Open the snapshot `name` of sync pair `sync_id` using configuration from
    /// the standard sources.
    pub fn new(name: &str, sync_id: &str) -> Result<Self, SnapshotError> {
        let config = ConfigLoader::load().map_err(|e| SnapshotError::Config(e.to_string()))?;
        Self::open(name, sync_id, &config)
    }

    /// Open or create the snapshot `name` of sync pair `sync_id`.
    pub fn open(name: &str, sync_id: &str, config: &SnapshotConfig) -> Result<Self, SnapshotError> {
        let location = SnapshotLocation::resolve(config, sync_id, name)?;
        std::fs::create_dir_all(&location.folder).map_err(|source| SnapshotError::Directory {
            path: location.folder.clone(),
            source,
        })?;

        let empty = !location.database.exists();
        let store = NodeStore::open(&location.database, &config.store)?;
        store.update(|tx| {
            if !tx.has_bucket(SNAPSHOT_BUCKET)? {
                tx.create_bucket(SNAPSHOT_BUCKET)?;
            }
            Ok(())
        })?;

        info!(name, sync_id, empty, "opened snapshot");
        Ok(Self {
            store,
            name: name.to_string(),
            location,
            empty: AtomicBool::new(empty),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> &SnapshotLocation {
        &self.location
    }

    /// True until the first successful capture of a freshly created snapshot.
    pub fn is_empty(&self) -> bool {
        self.empty.load(Ordering::Acquire)
    }

    /// Lazy sequence of `(rooted path, node)` for every node strictly under
    /// `root`, in key order.
    ///
    /// The iterator holds a read transaction: writes to this snapshot commit
    /// only after it is dropped, so do not write from the thread consuming it.
    pub fn iter_nodes(&self, root: &str) -> Result<NodeIter<'_>, SnapshotError> {
        let tx = self.store.read();
        tx.require_bucket(SNAPSHOT_BUCKET)?;
        let prefix = path::walk_prefix(root);
        Ok(NodeIter {
            inner: tx.into_scan(SNAPSHOT_BUCKET, prefix.as_bytes()),
        })
    }

    /// Count nodes of the current tree by type.
    pub fn stats(&self) -> Result<SnapshotStats, SnapshotError> {
        let mut stats = SnapshotStats::default();
        for item in self.iter_nodes("/")? {
            let (_, node) = item?;
            match node.node_type {
                NodeType::Leaf => stats.leaves += 1,
                NodeType::Collection => stats.collections += 1,
            }
            if node.is_placeholder() {
                stats.placeholders += 1;
            }
        }
        Ok(stats)
    }

    /// Close the snapshot. With `delete`, the whole sync-pair directory is
    /// removed afterwards.
    pub fn close(self, delete: bool) -> Result<(), SnapshotError> {
        let Snapshot {
            store,
            name,
            location,
            ..
        } = self;
        store.close()?;

        if delete && location.folder.exists() {
            std::fs::remove_dir_all(&location.folder).map_err(|source| {
                SnapshotError::Directory {
                    path: location.folder.clone(),
                    source,
                }
            })?;
            info!(name = %name, folder = %location.folder.display(), "deleted snapshot storage");
        }
        Ok(())
    }

    /// Path of the backing database
    pub fn database_path(&self) -> &Path {
        self.store.path()
    }
}

/// Iterator returned by [`Snapshot::iter_nodes`]
pub struct NodeIter<'a> {
    inner: BucketIter<'a>,
}

impl Iterator for NodeIter<'_> {
    type Item = Result<(String, TreeNode), SnapshotError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (key, value) = match self.inner.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e)),
            };
            let key = key_string(&key);
            match codec::decode(&value) {
                Ok(node) => return Some(Ok((path::rooted(&key), node))),
                Err(e) => warn!(key = %key, error = %e, "skipping malformed snapshot entry"),
            }
        }
    }
}

impl Endpoint for Snapshot {
    fn endpoint_info(&self) -> EndpointInfo {
        EndpointInfo {
            uri: format!("snapshot://{}", self.name),
            requires_normalization: false,
            requires_folders_rescan: false,
        }
    }

    fn load_node(&self, path: &str) -> Result<TreeNode, SnapshotError> {
        let key = path::normalize(path);
        let value = self.store.view(|tx| {
            tx.require_bucket(SNAPSHOT_BUCKET)?;
            tx.get(SNAPSHOT_BUCKET, key.as_bytes())
        })?;

        match value {
            Some(bytes) => codec::decode(&bytes).map_err(|source| SnapshotError::MalformedRecord {
                key: key.to_string(),
                source,
            }),
            None => Err(SnapshotError::NotFound(path.to_string())),
        }
    }
}

impl PathSyncSource for Snapshot {
    fn walk(&self, walk_fn: &mut WalkNodesFn<'_>, root: &str) -> Result<(), SnapshotError> {
        for item in self.iter_nodes(root)? {
            let (path, node) = item?;
            walk_fn(&path, Ok(&node));
        }
        Ok(())
    }
}

impl PathSyncTarget for Snapshot {
    /// Store `node`, creating placeholder collections for missing ancestors.
    ///
    /// An existing record at the same path is replaced whatever
    /// `update_if_exists` says; the flag exists for parity with other targets.
    fn create_node(&self, node: &TreeNode, update_if_exists: bool) -> Result<(), SnapshotError> {
        let key = path::normalize(&node.path);
        let record = encode_node(&node.relocated(key))?;

        self.store.update(|tx| {
            tx.require_bucket(SNAPSHOT_BUCKET)?;
            materialize_ancestors(tx, key)?;
            tx.put(SNAPSHOT_BUCKET, key.as_bytes(), record)
        })?;
        debug!(key, update_if_exists, "stored node");
        Ok(())
    }

    fn update_node(&self, node: &TreeNode) -> Result<(), SnapshotError> {
        self.create_node(node, true)
    }

    /// Remove the node at `path` and its whole subtree. Absent paths are a no-op.
    fn delete_node(&self, path: &str) -> Result<(), SnapshotError> {
        let key = path::normalize(path);
        let removed = self.store.update(|tx| {
            tx.require_bucket(SNAPSHOT_BUCKET)?;
            if tx.get(SNAPSHOT_BUCKET, key.as_bytes())?.is_none() {
                return Ok(0);
            }
            tx.delete(SNAPSHOT_BUCKET, key.as_bytes())?;

            let prefix = path::descendant_prefix(key);
            let children = tx.scan_prefix(SNAPSHOT_BUCKET, prefix.as_bytes())?;
            for (child, _) in &children {
                tx.delete(SNAPSHOT_BUCKET, child)?;
            }
            Ok(children.len() + 1)
        })?;
        debug!(key, removed, "deleted subtree");
        Ok(())
    }

    /// Relocate the node at `old_path` and its subtree under `new_path`.
    ///
    /// Entries of the subtree that fail to decode are dropped from the result.
    fn move_node(&self, old_path: &str, new_path: &str) -> Result<(), SnapshotError> {
        let from = path::normalize(old_path);
        let to = path::normalize(new_path);
        if from == to {
            return Ok(());
        }

        let moved = self.store.update(|tx| {
            tx.require_bucket(SNAPSHOT_BUCKET)?;
            let Some(head) = tx.get(SNAPSHOT_BUCKET, from.as_bytes())? else {
                return Ok(0);
            };

            let mut entries = vec![(from.as_bytes().to_vec(), head)];
            let prefix = path::descendant_prefix(from);
            entries.extend(tx.scan_prefix(SNAPSHOT_BUCKET, prefix.as_bytes())?);

            let mut relocated = Vec::with_capacity(entries.len());
            for (old_key, value) in &entries {
                let old_key = key_string(old_key);
                match codec::decode(value) {
                    Ok(node) => {
                        let new_key = path::relocate(&old_key, from, to);
                        relocated.push((encode_node(&node.relocated(new_key.as_str()))?, new_key));
                    }
                    Err(e) => {
                        warn!(key = %old_key, error = %e, "dropping malformed entry during move")
                    }
                }
            }

            // All removals before any insert, so a move into the node's own
            // subtree cannot delete freshly relocated records.
            for (old_key, _) in &entries {
                tx.delete(SNAPSHOT_BUCKET, old_key)?;
            }
            materialize_ancestors(tx, to)?;
            for (record, new_key) in &relocated {
                tx.put(SNAPSHOT_BUCKET, new_key.as_bytes(), record.clone())?;
            }
            Ok(relocated.len())
        })?;
        debug!(from, to, moved, "moved subtree");
        Ok(())
    }
}

impl Watchable for Snapshot {
    fn watch(&self, _recursive_path: &str) -> Result<WatchObject, SnapshotError> {
        Err(SnapshotError::NotImplemented("watch"))
    }
}

impl ChecksumProvider for Snapshot {
    fn compute_checksum(&self, _node: &mut TreeNode) -> Result<(), SnapshotError> {
        Err(SnapshotError::NotImplemented("checksum computation"))
    }
}
