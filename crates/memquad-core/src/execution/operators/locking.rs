//! Read-lock holding cursor.

use crate::execution::{BoxCursor, Cursor};
use crate::lock::ReadLockGuard;
use memquad_common::utils::error::Result;

/// Holds a query read lock while its input is open.
///
/// The lock is released exactly once: on close, on exhaustion, on the first
/// error, or when the cursor is dropped.
pub struct LockingCursor<T> {
    input: BoxCursor<T>,
    guard: ReadLockGuard,
    closed: bool,
}

impl<T> LockingCursor<T> {
    /// Wraps `input`, taking ownership of an already acquired read lock.
    pub fn new(input: BoxCursor<T>, guard: ReadLockGuard) -> Self {
        Self {
            input,
            guard,
            closed: false,
        }
    }
}

impl<T> Cursor for LockingCursor<T> {
    type Item = T;

    fn next(&mut self) -> Result<Option<T>> {
        if self.closed {
            return Ok(None);
        }
        match self.input.next() {
            Ok(Some(item)) => Ok(Some(item)),
            Ok(None) => {
                self.close();
                Ok(None)
            }
            Err(e) => {
                self.close();
                Err(e)
            }
        }
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.input.close();
            self.guard.release();
        }
    }

    fn name(&self) -> &'static str {
        "Locking"
    }
}

impl<T> Drop for LockingCursor<T> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{TrackedCursor, closes, row};
    use super::*;
    use crate::lock::LockManager;

    #[test]
    fn test_lock_released_on_exhaustion() {
        let locks = LockManager::new();
        let (input, counter) = TrackedCursor::boxed(vec![row(&[("x", "1")])]);
        let mut cursor = LockingCursor::new(input, locks.read_lock());
        assert_eq!(locks.read_lock_count(), 1);
        assert!(cursor.next().unwrap().is_some());
        assert!(cursor.next().unwrap().is_none());
        assert_eq!(locks.read_lock_count(), 0);
        assert_eq!(closes(&counter), 1);
        cursor.close();
        assert_eq!(closes(&counter), 1);
    }

    #[test]
    fn test_lock_released_on_drop() {
        let locks = LockManager::new();
        let (input, counter) = TrackedCursor::boxed(vec![row(&[("x", "1")])]);
        let cursor = LockingCursor::new(input, locks.read_lock());
        drop(cursor);
        assert_eq!(locks.read_lock_count(), 0);
        assert_eq!(closes(&counter), 1);
    }
}
