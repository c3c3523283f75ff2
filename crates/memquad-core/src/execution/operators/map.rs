//! Item-by-item conversion.

use crate::execution::Cursor;
use memquad_common::utils::error::Result;

/// Converts each input item, dropping those the conversion maps to `None`.
pub struct MapCursor<C, F> {
    input: C,
    convert: F,
    closed: bool,
}

impl<C, F> MapCursor<C, F> {
    /// Creates a converting cursor.
    pub fn new(input: C, convert: F) -> Self {
        Self {
            input,
            convert,
            closed: false,
        }
    }
}

impl<C, F, U> Cursor for MapCursor<C, F>
where
    C: Cursor,
    F: FnMut(C::Item) -> Result<Option<U>> + Send,
{
    type Item = U;

    fn next(&mut self) -> Result<Option<U>> {
        if self.closed {
            return Ok(None);
        }
        while let Some(item) = self.input.next()? {
            if let Some(converted) = (self.convert)(item)? {
                return Ok(Some(converted));
            }
        }
        Ok(None)
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.input.close();
        }
    }

    fn name(&self) -> &'static str {
        "Map"
    }
}
