//! Transaction isolation for a single store handle
//!
//! Writers are serialized by a writer lock held for the whole transaction.
//! Staged writes stay private until commit, so readers keep running while a
//! writer works; only the commit itself takes the visibility lock exclusively.
//! A reader therefore observes the state before or after a commit, never a mix.

use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Single-writer / multi-reader gate
#[derive(Default)]
pub struct TransactionGate {
    writer: Mutex<()>,
    visibility: RwLock<()>,
}

impl TransactionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared access to committed state.
    ///
    /// Recursive: a thread already holding a read guard (a walk callback, a
    /// live node iterator) can take another one while a commit is queued.
    pub fn read(&self) -> RwLockReadGuard<'_, ()> {
        self.visibility.read_recursive()
    }

    /// Exclusive writer slot, held from transaction begin to commit or rollback
    pub fn begin_write(&self) -> MutexGuard<'_, ()> {
        self.writer.lock()
    }

    /// Exclusive access while a commit is applied
    pub fn publish(&self) -> RwLockWriteGuard<'_, ()> {
        self.visibility.write()
    }
}
