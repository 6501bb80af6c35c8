//! Endpoint capabilities
//!
//! A synchronization driver treats every endpoint kind (local disk, remote
//! API, snapshot) through these traits. A snapshot implements them itself, so
//! it can serve as the comparison source of another synchronization pass.

use crate::error::SnapshotError;
use crate::tree::TreeNode;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::Receiver;

/// Callback receiving every node discovered by a walk.
///
/// The path is the node's rooted path (`/a/b`). A per-entry failure is reported
/// as `Err` without aborting the walk.
pub type WalkNodesFn<'a> = dyn FnMut(&str, Result<&TreeNode, &SnapshotError>) + 'a;

/// Static description of an endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub uri: String,
    pub requires_normalization: bool,
    pub requires_folders_rescan: bool,
}

/// Kind of change carried by a watch event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    Create,
    Remove,
    Rename,
}

/// One change notification from a watched endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInfo {
    pub event_type: EventType,
    pub path: String,
    pub folder: bool,
}

/// Live change feed returned by [`Watchable::watch`]
pub struct WatchObject {
    pub events: Receiver<EventInfo>,
    pub errors: Receiver<SnapshotError>,
}

pub trait Endpoint {
    fn endpoint_info(&self) -> EndpointInfo;

    fn load_node(&self, path: &str) -> Result<TreeNode, SnapshotError>;
}

/// Anything able to enumerate a tree.
pub trait PathSyncSource {
    /// Invoke `walk_fn` for every descendant of `root`. A returned error aborts
    /// the walk.
    fn walk(&self, walk_fn: &mut WalkNodesFn<'_>, root: &str) -> Result<(), SnapshotError>;
}

/// Endpoint accepting incremental tree mutations.
pub trait PathSyncTarget: Endpoint {
    fn create_node(&self, node: &TreeNode, update_if_exists: bool) -> Result<(), SnapshotError>;

    fn update_node(&self, node: &TreeNode) -> Result<(), SnapshotError>;

    fn delete_node(&self, path: &str) -> Result<(), SnapshotError>;

    fn move_node(&self, old_path: &str, new_path: &str) -> Result<(), SnapshotError>;
}

pub trait Watchable {
    fn watch(&self, recursive_path: &str) -> Result<WatchObject, SnapshotError>;
}

pub trait ChecksumProvider {
    fn compute_checksum(&self, node: &mut TreeNode) -> Result<(), SnapshotError>;
}
