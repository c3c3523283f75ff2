//! Execution primitives: binding sets, cursors, and cursor operators.
//!
//! ## Modules
//!
//! - [`binding`] - Variable-to-term solutions
//! - [`cursor`] - The lazy, closeable sequence protocol
//! - [`operators`] - Composable cursor operators (filter, join, sort, ...)

pub mod binding;
pub mod cursor;
pub mod operators;

pub use binding::BindingSet;
pub use cursor::{BoxCursor, Cursor, collect};
