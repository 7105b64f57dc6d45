//! Multiple-reader / single-writer lock with scoped guards.
//!
//! Thin wrapper over `parking_lot::RwLock`. Readers share access for the
//! lifetime of a [`ReadGuard`]; a [`WriteGuard`] is exclusive and its acquisition
//! waits until every reader and writer has released. Fairness is whatever
//! parking_lot provides (task-fair, so a waiting writer is not starved forever).

use parking_lot::{RwLock as RawRwLock, RwLockReadGuard, RwLockWriteGuard};

pub type ReadGuard<'a, T> = RwLockReadGuard<'a, T>;
pub type WriteGuard<'a, T> = RwLockWriteGuard<'a, T>;

#[derive(Debug, Default)]
pub struct RwLock<T> {
    inner: RawRwLock<T>,
}

impl<T> RwLock<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: RawRwLock::new(value),
        }
    }

    /// Shared access, blocking while a writer holds the lock.
    pub fn read(&self) -> ReadGuard<'_, T> {
        self.inner.read()
    }

    /// Exclusive access, blocking until all readers and writers are gone.
    pub fn write(&self) -> WriteGuard<'_, T> {
        self.inner.write()
    }

    pub fn try_read(&self) -> Option<ReadGuard<'_, T>> {
        self.inner.try_read()
    }

    pub fn try_write(&self) -> Option<WriteGuard<'_, T>> {
        self.inner.try_write()
    }

    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}
