//! Error types for the snapshot store.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by snapshot operations.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The backing database could not be opened (corrupt, unsupported, permissions).
    #[error("cannot open snapshot store at {}: {source}", path.display())]
    OpenFailure {
        path: PathBuf,
        #[source]
        source: sled::Error,
    },

    /// Another handle kept the database locked for the whole open timeout.
    #[error("timed out after {timeout:?} waiting for the lock on {}", path.display())]
    OpenTimeout { path: PathBuf, timeout: Duration },

    #[error("cannot prepare snapshot directory {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid snapshot identifier {0:?}")]
    InvalidIdentifier(String),

    /// An internal bucket expected to exist is missing.
    #[error("consistency fault: {0}")]
    ConsistencyFault(String),

    #[error("node not found in snapshot: {0}")]
    NotFound(String),

    #[error("malformed record at {key:?}: {source}")]
    MalformedRecord {
        key: String,
        #[source]
        source: CodecError,
    },

    #[error("{0} is not implemented for snapshots")]
    NotImplemented(&'static str),

    /// A source walk failed during capture; the staging transaction was rolled back.
    #[error("walk of {root:?} aborted: {source}")]
    WalkAborted {
        root: String,
        #[source]
        source: Box<SnapshotError>,
    },

    /// Failure reported by an external walkable source.
    #[error("source error: {0}")]
    Source(String),

    #[error("cannot encode node {path:?}: {source}")]
    Encode {
        path: String,
        #[source]
        source: CodecError,
    },

    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors from the node record codec.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("empty record")]
    Empty,

    #[error("unsupported record version {0}")]
    UnsupportedVersion(u8),

    #[error(transparent)]
    Bincode(#[from] bincode::Error),
}
