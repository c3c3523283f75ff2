//! The statement-source seam between storage and query evaluation.

use super::{MemoryStore, QuadPattern, StatementCursor};
use crate::execution::BoxCursor;
use memquad_common::types::Quad;
use memquad_common::utils::error::Result;

/// Anything query evaluation can pull matching quads from.
///
/// [`MemoryStore`] is the in-memory implementation. Another backend only has
/// to honor the same pattern and visibility semantics; errors it raises are
/// surfaced to the query as [`Error::Storage`](memquad_common::Error::Storage).
pub trait TripleSource: Send + Sync {
    /// Returns a cursor over the quads matching `pattern`.
    fn statements(&self, pattern: &QuadPattern) -> Result<BoxCursor<Quad>>;
}

impl TripleSource for MemoryStore {
    fn statements(&self, pattern: &QuadPattern) -> Result<BoxCursor<Quad>> {
        Ok(Box::new(StatementCursor::new(MemoryStore::statements(
            self, pattern,
        ))))
    }
}
