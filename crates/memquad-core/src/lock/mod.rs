//! Lock coordination for one store instance.
//!
//! Three locks protect a [`MemoryStore`](crate::store::MemoryStore):
//!
//! - **Query read lock**: shared, held by every open query cursor. Counted
//!   per thread and re-entrant, so a thread that already reads never blocks
//!   behind a waiting writer (nested cursors cannot deadlock).
//! - **Query write lock**: exclusive with all query read locks. Taken only
//!   for the structural phase of a commit.
//! - **Transaction lock**: exclusive between writers, independent of the
//!   query locks. Held for the whole life of a write transaction.
//!
//! Guards release on drop; `release()` is idempotent.

use memquad_common::utils::error::{LockError, Result};
use memquad_common::utils::hash::FxHashMap;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::{self, ThreadId};

#[derive(Debug, Default)]
struct LockState {
    /// Read locks held, per thread.
    readers: FxHashMap<ThreadId, usize>,
    /// Total read locks held.
    read_count: usize,
    /// Thread holding the query write lock.
    writer: Option<ThreadId>,
    /// Threads blocked on the query write lock.
    writers_waiting: usize,
    /// Thread holding the transaction lock.
    transaction_owner: Option<ThreadId>,
}

#[derive(Debug, Default)]
struct LockInner {
    state: Mutex<LockState>,
    changed: Condvar,
}

/// Read/write/transaction lock set over one store.
#[derive(Debug, Clone, Default)]
pub struct LockManager {
    inner: Arc<LockInner>,
}

impl LockManager {
    /// Creates a new lock manager with nothing held.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires a query read lock, blocking while a commit holds or waits
    /// for the query write lock.
    pub fn read_lock(&self) -> ReadLockGuard {
        let me = thread::current().id();
        let mut state = self.inner.state.lock();
        let reentrant =
            state.readers.get(&me).is_some_and(|count| *count > 0) || state.writer == Some(me);
        if !reentrant {
            if state.writer.is_some() || state.writers_waiting > 0 {
                tracing::trace!("query read lock waiting for commit");
            }
            while state.writer.is_some() || state.writers_waiting > 0 {
                self.inner.changed.wait(&mut state);
            }
        }
        *state.readers.entry(me).or_insert(0) += 1;
        state.read_count += 1;
        ReadLockGuard {
            inner: Arc::clone(&self.inner),
            thread: me,
            released: false,
        }
    }

    /// Acquires the query write lock, waiting for all readers to finish.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::ReadLockHeld`] if the calling thread holds query
    /// read locks, since waiting for them would never end.
    pub fn write_lock(&self) -> Result<WriteLockGuard> {
        let me = thread::current().id();
        let mut state = self.inner.state.lock();
        if let Some(&count) = state.readers.get(&me) {
            if count > 0 {
                return Err(LockError::ReadLockHeld { count }.into());
            }
        }
        state.writers_waiting += 1;
        if state.writer.is_some() || state.read_count > 0 {
            tracing::trace!(readers = state.read_count, "query write lock waiting for readers");
        }
        while state.writer.is_some() || state.read_count > 0 {
            self.inner.changed.wait(&mut state);
        }
        state.writers_waiting -= 1;
        state.writer = Some(me);
        Ok(WriteLockGuard {
            inner: Arc::clone(&self.inner),
            released: false,
        })
    }

    /// Acquires the exclusive transaction lock, blocking while another
    /// transaction is open.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::AlreadyHeld`] if the calling thread already holds it.
    pub fn transaction_lock(&self) -> Result<TransactionLockGuard> {
        let me = thread::current().id();
        let mut state = self.inner.state.lock();
        if state.transaction_owner == Some(me) {
            return Err(LockError::AlreadyHeld.into());
        }
        while state.transaction_owner.is_some() {
            self.inner.changed.wait(&mut state);
        }
        state.transaction_owner = Some(me);
        Ok(TransactionLockGuard {
            inner: Arc::clone(&self.inner),
            released: false,
        })
    }

    /// Returns the number of query read locks held across all threads.
    #[must_use]
    pub fn read_lock_count(&self) -> usize {
        self.inner.state.lock().read_count
    }

    /// Returns the number of query read locks held by the calling thread.
    #[must_use]
    pub fn thread_read_lock_count(&self) -> usize {
        let me = thread::current().id();
        self.inner.state.lock().readers.get(&me).copied().unwrap_or(0)
    }

    /// Returns true while a commit holds the query write lock.
    #[must_use]
    pub fn is_write_locked(&self) -> bool {
        self.inner.state.lock().writer.is_some()
    }

    /// Returns true while a write transaction is open.
    #[must_use]
    pub fn is_transaction_active(&self) -> bool {
        self.inner.state.lock().transaction_owner.is_some()
    }
}

/// A held query read lock.
#[derive(Debug)]
pub struct ReadLockGuard {
    inner: Arc<LockInner>,
    thread: ThreadId,
    released: bool,
}

impl ReadLockGuard {
    /// Releases the lock. Calling this more than once has no effect.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let mut state = self.inner.state.lock();
        if let Some(count) = state.readers.get_mut(&self.thread) {
            *count -= 1;
            if *count == 0 {
                state.readers.remove(&self.thread);
            }
        }
        state.read_count -= 1;
        drop(state);
        self.inner.changed.notify_all();
    }

    /// Returns true once the lock has been released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for ReadLockGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// A held query write lock.
#[derive(Debug)]
pub struct WriteLockGuard {
    inner: Arc<LockInner>,
    released: bool,
}

impl WriteLockGuard {
    /// Releases the lock. Calling this more than once has no effect.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.inner.state.lock().writer = None;
        self.inner.changed.notify_all();
    }
}

impl Drop for WriteLockGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// A held transaction lock.
#[derive(Debug)]
pub struct TransactionLockGuard {
    inner: Arc<LockInner>,
    released: bool,
}

impl TransactionLockGuard {
    /// Releases the lock. Calling this more than once has no effect.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.inner.state.lock().transaction_owner = None;
        self.inner.changed.notify_all();
    }
}

impl Drop for TransactionLockGuard {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memquad_common::utils::error::Error;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[test]
    fn test_read_lock_counting() {
        let locks = LockManager::new();
        let mut a = locks.read_lock();
        let b = locks.read_lock();
        assert_eq!(locks.read_lock_count(), 2);
        assert_eq!(locks.thread_read_lock_count(), 2);

        a.release();
        a.release();
        assert_eq!(locks.read_lock_count(), 1);

        drop(b);
        assert_eq!(locks.read_lock_count(), 0);
        assert_eq!(locks.thread_read_lock_count(), 0);
    }

    #[test]
    fn test_write_lock_rejected_while_reading() {
        let locks = LockManager::new();
        let _read = locks.read_lock();
        let err = locks.write_lock().unwrap_err();
        assert!(matches!(err, Error::Lock(LockError::ReadLockHeld { count: 1 })));
    }

    #[test]
    fn test_transaction_lock_twice_on_same_thread() {
        let locks = LockManager::new();
        let guard = locks.transaction_lock().unwrap();
        assert!(locks.is_transaction_active());
        let err = locks.transaction_lock().unwrap_err();
        assert!(matches!(err, Error::Lock(LockError::AlreadyHeld)));
        drop(guard);
        assert!(!locks.is_transaction_active());
        assert!(locks.transaction_lock().is_ok());
    }

    #[test]
    fn test_transaction_lock_does_not_block_readers() {
        let locks = LockManager::new();
        let _tx = locks.transaction_lock().unwrap();
        let read = locks.read_lock();
        assert_eq!(locks.read_lock_count(), 1);
        drop(read);
    }

    #[test]
    fn test_writer_waits_for_other_threads_readers() {
        let locks = LockManager::new();
        let acquired = AtomicBool::new(false);
        let (ready_tx, ready_rx) = crossbeam::channel::bounded(0);
        let (release_tx, release_rx) = crossbeam::channel::bounded::<()>(0);

        crossbeam::thread::scope(|s| {
            s.spawn(|_| {
                let _read = locks.read_lock();
                ready_tx.send(()).unwrap();
                release_rx.recv().unwrap();
            });

            ready_rx.recv().unwrap();
            s.spawn(|_| {
                let _write = locks.write_lock().unwrap();
                acquired.store(true, Ordering::SeqCst);
            });

            std::thread::sleep(Duration::from_millis(50));
            assert!(!acquired.load(Ordering::SeqCst));
            release_tx.send(()).unwrap();
        })
        .unwrap();

        assert!(acquired.load(Ordering::SeqCst));
        assert_eq!(locks.read_lock_count(), 0);
        assert!(!locks.is_write_locked());
    }

    #[test]
    fn test_reentrant_read_passes_waiting_writer() {
        let locks = LockManager::new();
        let (ready_tx, ready_rx) = crossbeam::channel::bounded(0);

        crossbeam::thread::scope(|s| {
            let first = locks.read_lock();
            s.spawn(|_| {
                ready_tx.send(()).unwrap();
                let _write = locks.write_lock().unwrap();
            });
            ready_rx.recv().unwrap();
            std::thread::sleep(Duration::from_millis(20));

            // The writer is queued; a nested read on this thread must not block.
            let nested = locks.read_lock();
            assert_eq!(locks.thread_read_lock_count(), 2);
            drop(nested);
            drop(first);
        })
        .unwrap();

        assert_eq!(locks.read_lock_count(), 0);
    }

    #[test]
    fn test_new_reader_waits_behind_pending_writer() {
        let locks = LockManager::new();
        let read_acquired = AtomicBool::new(false);
        let (ready_tx, ready_rx) = crossbeam::channel::bounded(0);

        crossbeam::thread::scope(|s| {
            let first = locks.read_lock();
            s.spawn(|_| {
                ready_tx.send(()).unwrap();
                let _write = locks.write_lock().unwrap();
            });
            ready_rx.recv().unwrap();
            std::thread::sleep(Duration::from_millis(20));

            s.spawn(|_| {
                let _read = locks.read_lock();
                read_acquired.store(true, Ordering::SeqCst);
            });
            std::thread::sleep(Duration::from_millis(50));
            assert!(!read_acquired.load(Ordering::SeqCst));
            drop(first);
        })
        .unwrap();

        assert!(read_acquired.load(Ordering::SeqCst));
        assert_eq!(locks.read_lock_count(), 0);
    }
}
