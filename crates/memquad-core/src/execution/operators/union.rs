//! Sequential union.

use crate::execution::{BoxCursor, Cursor};
use memquad_common::utils::error::Result;

/// Yields all items of each input in turn. An input is closed as soon as it
/// is exhausted, before the next one is pulled.
pub struct UnionCursor<T> {
    inputs: Vec<BoxCursor<T>>,
    current: usize,
    closed: bool,
}

impl<T> UnionCursor<T> {
    /// Creates a union over `inputs`.
    pub fn new(inputs: Vec<BoxCursor<T>>) -> Self {
        Self {
            inputs,
            current: 0,
            closed: false,
        }
    }
}

impl<T> Cursor for UnionCursor<T> {
    type Item = T;

    fn next(&mut self) -> Result<Option<T>> {
        if self.closed {
            return Ok(None);
        }
        while let Some(input) = self.inputs.get_mut(self.current) {
            if let Some(item) = input.next()? {
                return Ok(Some(item));
            }
            input.close();
            self.current += 1;
        }
        Ok(None)
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            for input in &mut self.inputs {
                input.close();
            }
        }
    }

    fn name(&self) -> &'static str {
        "Union"
    }
}
