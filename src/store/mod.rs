//! Persistent Node Store
//!
//! A single sled database per snapshot, partitioned into named buckets and
//! accessed through read-only and read-write transactions.

mod keys;
pub mod txn;

pub use txn::{BucketIter, ReadTxn, WriteTxn};

use crate::concurrency::TransactionGate;
use crate::config::StoreConfig;
use crate::error::SnapshotError;
use sled::Db;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Bucket holding the current state of a snapshot
pub const SNAPSHOT_BUCKET: &str = "snapshot";

/// Transient staging bucket used while a capture is in flight
pub const CAPTURE_BUCKET: &str = "capture";

/// Message prefix sled uses when another handle holds the database lock
const LOCK_HELD_PREFIX: &str = "could not acquire lock";

/// sled reports a held directory lock as a plain I/O error.
fn is_lock_contention(err: &std::io::Error) -> bool {
    match err.kind() {
        ErrorKind::WouldBlock => true,
        ErrorKind::Other => err.to_string().starts_with(LOCK_HELD_PREFIX),
        _ => false,
    }
}

/// Transactional key-value store backing one snapshot
pub struct NodeStore {
    db: Db,
    gate: TransactionGate,
    path: PathBuf,
    flush_on_commit: bool,
}

impl NodeStore {
    /// Open or create the database at `path`.
    ///
    /// While another handle holds the database, the open is retried until the
    /// configured timeout elapses.
    pub fn open(path: &Path, config: &StoreConfig) -> Result<Self, SnapshotError> {
        let timeout = config.open_timeout();
        let started = Instant::now();

        let db = loop {
            let attempt = sled::Config::new()
                .path(path)
                .cache_capacity(config.cache_capacity_bytes)
                .open();

            match attempt {
                Ok(db) => break db,
                Err(sled::Error::Io(err)) if is_lock_contention(&err) => {
                    let waited = started.elapsed();
                    if waited >= timeout {
                        return Err(SnapshotError::OpenTimeout {
                            path: path.to_path_buf(),
                            timeout,
                        });
                    }
                    debug!(path = %path.display(), error = %err, "store locked, retrying");
                    std::thread::sleep(config.open_retry_interval().min(timeout - waited));
                }
                Err(source) => {
                    return Err(SnapshotError::OpenFailure {
                        path: path.to_path_buf(),
                        source,
                    })
                }
            }
        };

        info!(path = %path.display(), "opened node store");
        Ok(Self {
            db,
            gate: TransactionGate::new(),
            path: path.to_path_buf(),
            flush_on_commit: config.flush_on_commit,
        })
    }

    /// Begin a read-only transaction.
    pub fn read(&self) -> ReadTxn<'_> {
        ReadTxn::new(&self.db, self.gate.read())
    }

    /// Run `f` inside a read-only transaction.
    pub fn view<T, F>(&self, f: F) -> Result<T, SnapshotError>
    where
        F: FnOnce(&ReadTxn<'_>) -> Result<T, SnapshotError>,
    {
        let tx = self.read();
        f(&tx)
    }

    /// Run `f` inside a read-write transaction.
    ///
    /// Its writes are committed atomically when `f` returns `Ok`, and discarded
    /// when it returns `Err`.
    pub fn update<T, F>(&self, f: F) -> Result<T, SnapshotError>
    where
        F: FnOnce(&mut WriteTxn<'_>) -> Result<T, SnapshotError>,
    {
        let mut tx = WriteTxn::begin(&self.db, &self.gate);
        let out = f(&mut tx)?;
        tx.commit(self.flush_on_commit)?;
        Ok(out)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and release the database handle.
    pub fn close(self) -> Result<(), SnapshotError> {
        self.db.flush()?;
        debug!(path = %self.path.display(), "closed node store");
        Ok(())
    }
}
