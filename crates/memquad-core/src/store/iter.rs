//! Pattern iteration over a snapshot of candidate statements.

use crate::execution::Cursor;
use crate::model::{MemStatement, ReadMode};
use memquad_common::types::{Quad, TermId};
use memquad_common::utils::error::Result;
use smallvec::SmallVec;
use std::sync::Arc;

/// Id-level constraints a candidate statement must satisfy.
#[derive(Debug, Clone, Default)]
pub(crate) struct StatementFilter {
    pub subject: Option<TermId>,
    pub predicate: Option<TermId>,
    pub object: Option<TermId>,
    /// Allowed context ids; empty allows every context.
    pub contexts: SmallVec<[TermId; 4]>,
    pub named_contexts_only: bool,
    pub explicit_only: bool,
    pub read_mode: ReadMode,
}

impl StatementFilter {
    fn matches(&self, statement: &MemStatement) -> bool {
        let [s, p, o, c] = statement.ids();
        self.subject.is_none_or(|id| id == s)
            && self.predicate.is_none_or(|id| id == p)
            && self.object.is_none_or(|id| id == o)
            && (self.contexts.is_empty() || self.contexts.contains(&c))
            && !(self.named_contexts_only && c.is_null_context())
            && statement
                .state()
                .is_visible(self.read_mode, self.explicit_only)
    }
}

/// Lazy iterator over statements matching a [`QuadPattern`](super::QuadPattern).
///
/// The candidate list is copied when the iterator is created, so concurrent
/// additions never disturb it. Visibility is checked on every pull, so a
/// statement removed after creation is skipped if it has not been yielded yet.
#[derive(Debug)]
pub struct StatementIter {
    candidates: std::vec::IntoIter<Arc<MemStatement>>,
    filter: StatementFilter,
}

impl StatementIter {
    pub(crate) fn new(candidates: Vec<Arc<MemStatement>>, filter: StatementFilter) -> Self {
        Self {
            candidates: candidates.into_iter(),
            filter,
        }
    }

    /// An iterator that yields nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new(), StatementFilter::default())
    }
}

impl Iterator for StatementIter {
    type Item = Arc<MemStatement>;

    fn next(&mut self) -> Option<Self::Item> {
        self.candidates.by_ref().find(|s| self.filter.matches(s))
    }
}

/// Cursor adapter yielding the quads of a [`StatementIter`].
#[derive(Debug)]
pub struct StatementCursor {
    iter: Option<StatementIter>,
}

impl StatementCursor {
    /// Wraps a statement iterator.
    #[must_use]
    pub fn new(iter: StatementIter) -> Self {
        Self { iter: Some(iter) }
    }
}

impl Cursor for StatementCursor {
    type Item = Quad;

    fn next(&mut self) -> Result<Option<Quad>> {
        Ok(self
            .iter
            .as_mut()
            .and_then(Iterator::next)
            .map(|s| s.quad().clone()))
    }

    fn close(&mut self) {
        self.iter = None;
    }

    fn name(&self) -> &'static str {
        "StatementScan"
    }
}
