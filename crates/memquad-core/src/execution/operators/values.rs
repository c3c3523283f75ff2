//! Leaf cursors over materialized items.

use crate::execution::Cursor;
use memquad_common::utils::error::Result;
use std::marker::PhantomData;

/// A cursor that yields nothing.
#[derive(Debug)]
pub struct EmptyCursor<T> {
    _item: PhantomData<fn() -> T>,
}

impl<T> EmptyCursor<T> {
    /// Creates an empty cursor.
    #[must_use]
    pub fn new() -> Self {
        Self { _item: PhantomData }
    }
}

impl<T> Default for EmptyCursor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Cursor for EmptyCursor<T> {
    type Item = T;

    fn next(&mut self) -> Result<Option<T>> {
        Ok(None)
    }

    fn close(&mut self) {}

    fn name(&self) -> &'static str {
        "Empty"
    }
}

/// A cursor over a vector of items, in order.
#[derive(Debug)]
pub struct VecCursor<T> {
    items: std::vec::IntoIter<T>,
}

impl<T> VecCursor<T> {
    /// Creates a cursor over `items`.
    #[must_use]
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: items.into_iter(),
        }
    }
}

impl<T: Send> Cursor for VecCursor<T> {
    type Item = T;

    fn next(&mut self) -> Result<Option<T>> {
        Ok(self.items.next())
    }

    fn close(&mut self) {
        self.items = Vec::new().into_iter();
    }

    fn name(&self) -> &'static str {
        "Values"
    }
}
