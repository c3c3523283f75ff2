//! Offset and limit.

use crate::execution::{BoxCursor, Cursor};
use memquad_common::utils::error::Result;

/// Skips `offset` items, then yields at most `limit` items.
///
/// The input is closed as soon as the limit is reached.
pub struct SliceCursor<T> {
    input: BoxCursor<T>,
    offset: usize,
    limit: Option<usize>,
    skipped: bool,
    produced: usize,
    closed: bool,
}

impl<T> SliceCursor<T> {
    /// Creates a new slice cursor.
    pub fn new(input: BoxCursor<T>, offset: usize, limit: Option<usize>) -> Self {
        Self {
            input,
            offset,
            limit,
            skipped: false,
            produced: 0,
            closed: false,
        }
    }
}

impl<T> Cursor for SliceCursor<T> {
    type Item = T;

    fn next(&mut self) -> Result<Option<T>> {
        if self.closed {
            return Ok(None);
        }
        if self.limit.is_some_and(|limit| self.produced >= limit) {
            self.close();
            return Ok(None);
        }
        if !self.skipped {
            self.skipped = true;
            for _ in 0..self.offset {
                if self.input.next()?.is_none() {
                    return Ok(None);
                }
            }
        }
        let item = self.input.next()?;
        if item.is_some() {
            self.produced += 1;
        }
        Ok(item)
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.input.close();
        }
    }

    fn name(&self) -> &'static str {
        "Slice"
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{TrackedCursor, closes, row};
    use super::*;
    use crate::execution::collect;

    fn rows(n: usize) -> Vec<crate::execution::BindingSet> {
        (0..n).map(|i| row(&[("i", i.to_string().as_str())])).collect()
    }

    #[test]
    fn test_offset_and_limit() {
        let (input, _) = TrackedCursor::boxed(rows(10));
        let mut slice = SliceCursor::new(input, 3, Some(2));
        let out = collect(&mut slice).unwrap();
        assert_eq!(out, vec![row(&[("i", "3")]), row(&[("i", "4")])]);
    }

    #[test]
    fn test_limit_closes_input_early() {
        let (input, counter) = TrackedCursor::boxed(rows(10));
        let mut slice = SliceCursor::new(input, 0, Some(1));
        assert!(slice.next().unwrap().is_some());
        assert!(slice.next().unwrap().is_none());
        assert_eq!(closes(&counter), 1);
    }

    #[test]
    fn test_offset_past_end() {
        let (input, _) = TrackedCursor::boxed(rows(2));
        let mut slice = SliceCursor::new(input, 5, None);
        assert!(collect(&mut slice).unwrap().is_empty());
    }
}
