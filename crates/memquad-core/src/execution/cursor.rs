//! The cursor protocol.
//!
//! A cursor is a lazy, single-pass, closeable sequence. Operators are
//! composed by wrapping: each operator owns its input cursors and closes them
//! when it is closed itself, so closing the root of a pipeline releases every
//! resource underneath it, exhausted or not.
//!
//! Lifecycle: created, pulled with [`Cursor::next`] until it returns
//! `Ok(None)`, then closed. `close` is idempotent, and dropping a cursor
//! releases its resources as well.

use memquad_common::utils::error::Result;

/// A lazy, closeable sequence of items.
pub trait Cursor: Send {
    /// The item type.
    type Item;

    /// Returns the next item, or `None` when exhausted.
    fn next(&mut self) -> Result<Option<Self::Item>>;

    /// Releases all resources held by this cursor and its inputs.
    ///
    /// Safe to call any number of times. After closing, `next` returns `None`.
    fn close(&mut self);

    /// Returns the name of this cursor for debugging.
    fn name(&self) -> &'static str;
}

/// A boxed, type-erased cursor.
pub type BoxCursor<T> = Box<dyn Cursor<Item = T>>;

impl<C: Cursor + ?Sized> Cursor for Box<C> {
    type Item = C::Item;

    fn next(&mut self) -> Result<Option<Self::Item>> {
        (**self).next()
    }

    fn close(&mut self) {
        (**self).close();
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Drains a cursor into a vector, closing it afterwards on every path.
///
/// # Errors
///
/// Returns the first error raised by the cursor.
pub fn collect<C: Cursor + ?Sized>(cursor: &mut C) -> Result<Vec<C::Item>> {
    let mut items = Vec::new();
    let result = loop {
        match cursor.next() {
            Ok(Some(item)) => items.push(item),
            Ok(None) => break Ok(items),
            Err(e) => break Err(e),
        }
    };
    cursor.close();
    result
}
