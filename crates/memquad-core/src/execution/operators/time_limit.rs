//! Query deadlines.

use crate::execution::{BoxCursor, Cursor};
use memquad_common::utils::error::{Error, Result};
use std::time::{Duration, Instant};

/// Point in time after which a query is interrupted.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    expires: Instant,
}

impl Deadline {
    /// A deadline `timeout` from now.
    #[must_use]
    pub fn after(timeout: Duration) -> Self {
        let started = Instant::now();
        Self {
            started,
            expires: started + timeout,
        }
    }

    /// Returns true once the deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires
    }

    /// Milliseconds since the deadline was created.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Fails with [`Error::Interrupted`] once the deadline has passed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Interrupted`] when expired.
    pub fn check(&self) -> Result<()> {
        if self.is_expired() {
            return Err(Error::Interrupted {
                elapsed_ms: self.elapsed_ms(),
            });
        }
        Ok(())
    }
}

/// Interrupts its input once a deadline passes.
///
/// On expiry the input is closed and the pull fails with
/// [`Error::Interrupted`]; later pulls return `None`.
pub struct TimeLimitCursor<T> {
    input: BoxCursor<T>,
    deadline: Deadline,
    closed: bool,
}

impl<T> TimeLimitCursor<T> {
    /// Wraps `input` with `deadline`.
    pub fn new(input: BoxCursor<T>, deadline: Deadline) -> Self {
        Self {
            input,
            deadline,
            closed: false,
        }
    }
}

impl<T> Cursor for TimeLimitCursor<T> {
    type Item = T;

    fn next(&mut self) -> Result<Option<T>> {
        if self.closed {
            return Ok(None);
        }
        if let Err(e) = self.deadline.check() {
            tracing::debug!(elapsed_ms = self.deadline.elapsed_ms(), "query interrupted");
            self.close();
            return Err(e);
        }
        self.input.next()
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.input.close();
        }
    }

    fn name(&self) -> &'static str {
        "TimeLimit"
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{TrackedCursor, closes, row};
    use super::*;

    #[test]
    fn test_passes_through_before_deadline() {
        let (input, _) = TrackedCursor::boxed(vec![row(&[("x", "1")])]);
        let mut cursor = TimeLimitCursor::new(input, Deadline::after(Duration::from_secs(60)));
        assert!(cursor.next().unwrap().is_some());
    }

    #[test]
    fn test_expired_deadline_interrupts_and_closes() {
        let (input, counter) = TrackedCursor::boxed(vec![row(&[("x", "1")])]);
        let deadline = Deadline::after(Duration::ZERO);
        let mut cursor = TimeLimitCursor::new(input, deadline);
        let err = cursor.next().unwrap_err();
        assert!(err.is_interrupted());
        assert_eq!(closes(&counter), 1);
        assert!(cursor.next().unwrap().is_none());
    }
}
