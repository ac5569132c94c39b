//! Path lock table.
//!
//! A process-wide set of destination paths currently being written. A fetch
//! inserts its temp path before transferring and the guard removes it again
//! on every exit path, so at most one writer ever exists per path and a
//! concurrent second fetch observes contention instead of blocking.

use std::path::PathBuf;

use dashmap::DashSet;

/// Concurrent set of in-flight temp paths.
///
/// `try_acquire` and guard drop are each a single atomic critical section
/// on the underlying shard, so membership never tears under concurrency.
#[derive(Debug, Default)]
pub struct LockTable {
    paths: DashSet<PathBuf>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `path` if absent, returning a guard that removes it on drop.
    ///
    /// Returns `None` when another writer already holds the path; callers
    /// must treat that as contention, not wait for release.
    pub fn try_acquire(&self, path: PathBuf) -> Option<PathLockGuard<'_>> {
        if self.paths.insert(path.clone()) {
            Some(PathLockGuard { table: self, path })
        } else {
            None
        }
    }

    /// Number of paths currently locked.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Holds one path's lock; dropping releases it unconditionally.
#[derive(Debug)]
pub struct PathLockGuard<'a> {
    table: &'a LockTable,
    path: PathBuf,
}

impl Drop for PathLockGuard<'_> {
    fn drop(&mut self) {
        self.table.paths.remove(&self.path);
    }
}
