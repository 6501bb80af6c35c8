//! Read and write transactions over named buckets

use super::keys;
use crate::concurrency::TransactionGate;
use crate::error::SnapshotError;
use parking_lot::{MutexGuard, RwLockReadGuard};
use sled::{Batch, Db, IVec};
use std::collections::BTreeMap;

fn missing_bucket(bucket: &str) -> SnapshotError {
    SnapshotError::ConsistencyFault(format!("cannot find bucket {:?}", bucket))
}

/// Read-only view of committed state.
///
/// Holds the visibility gate in shared mode for its whole lifetime; a commit
/// waits until every open read transaction is dropped.
pub struct ReadTxn<'a> {
    db: &'a Db,
    visible: RwLockReadGuard<'a, ()>,
}

impl<'a> ReadTxn<'a> {
    pub(crate) fn new(db: &'a Db, visible: RwLockReadGuard<'a, ()>) -> Self {
        Self { db, visible }
    }

    pub fn has_bucket(&self, bucket: &str) -> Result<bool, SnapshotError> {
        Ok(self.db.contains_key(keys::marker(bucket))?)
    }

    pub fn require_bucket(&self, bucket: &str) -> Result<(), SnapshotError> {
        if self.has_bucket(bucket)? {
            Ok(())
        } else {
            Err(missing_bucket(bucket))
        }
    }

    pub fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<IVec>, SnapshotError> {
        Ok(self.db.get(keys::entry(bucket, key))?)
    }

    /// Ordered cursor over every key of `bucket` starting with `prefix`.
    pub fn scan_prefix(&self, bucket: &str, prefix: &[u8]) -> BucketIter<'_> {
        BucketIter::new(self.db, bucket, prefix, None)
    }

    /// Like [`ReadTxn::scan_prefix`], but the cursor takes over the transaction.
    pub fn into_scan(self, bucket: &str, prefix: &[u8]) -> BucketIter<'a> {
        BucketIter::new(self.db, bucket, prefix, Some(self.visible))
    }
}

/// Cursor over one bucket, yielding `(key, value)` with the bucket framing removed.
pub struct BucketIter<'a> {
    inner: sled::Iter,
    framing: usize,
    _visible: Option<RwLockReadGuard<'a, ()>>,
}

impl<'a> BucketIter<'a> {
    fn new(
        db: &Db,
        bucket: &str,
        prefix: &[u8],
        visible: Option<RwLockReadGuard<'a, ()>>,
    ) -> Self {
        Self {
            inner: db.scan_prefix(keys::entry(bucket, prefix)),
            framing: keys::entry_prefix(bucket).len(),
            _visible: visible,
        }
    }
}

impl Iterator for BucketIter<'_> {
    type Item = Result<(Vec<u8>, IVec), SnapshotError>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.inner.next()?;
        Some(
            item.map(|(raw, value)| (raw[self.framing..].to_vec(), value))
                .map_err(SnapshotError::from),
        )
    }
}

/// Exclusive read-write transaction.
///
/// Writes are staged and only become visible, all at once, when the
/// transaction commits. Dropping an uncommitted transaction discards them.
pub struct WriteTxn<'a> {
    db: &'a Db,
    gate: &'a TransactionGate,
    writer: MutexGuard<'a, ()>,
    pending: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> WriteTxn<'a> {
    pub(crate) fn begin(db: &'a Db, gate: &'a TransactionGate) -> Self {
        Self {
            db,
            gate,
            writer: gate.begin_write(),
            pending: BTreeMap::new(),
        }
    }

    fn lookup(&self, raw: &[u8]) -> Result<Option<Vec<u8>>, SnapshotError> {
        if let Some(staged) = self.pending.get(raw) {
            return Ok(staged.clone());
        }
        Ok(self.db.get(raw)?.map(|value| value.to_vec()))
    }

    /// Committed entries under `raw_prefix` overlaid with staged writes.
    fn merged_range(&self, raw_prefix: &[u8]) -> Result<BTreeMap<Vec<u8>, Vec<u8>>, SnapshotError> {
        let mut merged = BTreeMap::new();
        for item in self.db.scan_prefix(raw_prefix) {
            let (raw, value) = item?;
            merged.insert(raw.to_vec(), value.to_vec());
        }
        for (raw, staged) in self.pending.range(raw_prefix.to_vec()..) {
            if !raw.starts_with(raw_prefix) {
                break;
            }
            if let Some(value) = staged {
                merged.insert(raw.clone(), value.clone());
            } else {
                merged.remove(raw);
            }
        }
        Ok(merged)
    }

    pub fn has_bucket(&self, bucket: &str) -> Result<bool, SnapshotError> {
        Ok(self.lookup(&keys::marker(bucket))?.is_some())
    }

    pub fn require_bucket(&self, bucket: &str) -> Result<(), SnapshotError> {
        if self.has_bucket(bucket)? {
            Ok(())
        } else {
            Err(missing_bucket(bucket))
        }
    }

    pub fn create_bucket(&mut self, bucket: &str) -> Result<(), SnapshotError> {
        if self.has_bucket(bucket)? {
            return Err(SnapshotError::ConsistencyFault(format!(
                "bucket {:?} already exists",
                bucket
            )));
        }
        self.pending.insert(keys::marker(bucket), Some(Vec::new()));
        Ok(())
    }

    /// Remove a bucket and every entry in it.
    pub fn delete_bucket(&mut self, bucket: &str) -> Result<(), SnapshotError> {
        self.require_bucket(bucket)?;
        let entries = self.merged_range(&keys::entry_prefix(bucket))?;
        for raw in entries.into_keys() {
            self.pending.insert(raw, None);
        }
        self.pending.insert(keys::marker(bucket), None);
        Ok(())
    }

    pub fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>, SnapshotError> {
        self.lookup(&keys::entry(bucket, key))
    }

    pub fn put(&mut self, bucket: &str, key: &[u8], value: Vec<u8>) -> Result<(), SnapshotError> {
        self.require_bucket(bucket)?;
        self.pending.insert(keys::entry(bucket, key), Some(value));
        Ok(())
    }

    pub fn delete(&mut self, bucket: &str, key: &[u8]) -> Result<(), SnapshotError> {
        self.require_bucket(bucket)?;
        self.pending.insert(keys::entry(bucket, key), None);
        Ok(())
    }

    /// Every `(key, value)` of `bucket` starting with `prefix`, in key order,
    /// including writes staged by this transaction.
    pub fn scan_prefix(
        &self,
        bucket: &str,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, SnapshotError> {
        self.require_bucket(bucket)?;
        let framing = keys::entry_prefix(bucket).len();
        let merged = self.merged_range(&keys::entry(bucket, prefix))?;
        Ok(merged
            .into_iter()
            .map(|(raw, value)| (raw[framing..].to_vec(), value))
            .collect())
    }

    /// Number of staged writes
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Apply every staged write as one atomic batch.
    pub(crate) fn commit(self, flush: bool) -> Result<(), SnapshotError> {
        let WriteTxn {
            db,
            gate,
            writer,
            pending,
        } = self;

        if pending.is_empty() {
            return Ok(());
        }

        let mut batch = Batch::default();
        for (raw, staged) in pending {
            match staged {
                Some(value) => batch.insert(raw, value),
                None => batch.remove(raw),
            }
        }

        {
            let _publish = gate.publish();
            db.apply_batch(batch)?;
        }
        if flush {
            db.flush()?;
        }
        drop(writer);
        Ok(())
    }
}
