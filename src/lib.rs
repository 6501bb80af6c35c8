//! Treesnap: Persistent Tree Snapshots for Synchronization Endpoints
//!
//! Records the last known tree of a synchronization endpoint in an embedded,
//! transactional key-value store so a later pass can compare the live tree
//! against it. A snapshot is itself a walkable source and a mutable target.

pub mod concurrency;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod snapshot;
pub mod store;
pub mod tooling;
pub mod tree;

pub use config::{ConfigLoader, SnapshotConfig, StoreConfig};
pub use error::{CodecError, SnapshotError};
pub use model::{
    ChecksumProvider, Endpoint, EndpointInfo, EventInfo, EventType, PathSyncSource,
    PathSyncTarget, WalkNodesFn, WatchObject, Watchable,
};
pub use snapshot::{NodeIter, Snapshot, SnapshotStats};
pub use tree::{NodeType, TreeNode, PLACEHOLDER_ETAG};
