//! Statement lookup patterns.

use crate::model::ReadMode;
use memquad_common::types::Term;

/// A quad pattern plus the visibility options of a lookup.
///
/// Unset components are wildcards. An empty `contexts` list matches every
/// context; otherwise a statement must be in one of the listed contexts,
/// where `None` stands for the null context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuadPattern {
    /// Required subject.
    pub subject: Option<Term>,
    /// Required predicate.
    pub predicate: Option<Term>,
    /// Required object.
    pub object: Option<Term>,
    /// Allowed contexts.
    pub contexts: Vec<Option<Term>>,
    /// Exclude statements in the null context.
    pub named_contexts_only: bool,
    /// Only statements asserted explicitly.
    pub explicit_only: bool,
    /// Snapshot to read.
    pub read_mode: ReadMode,
}

impl QuadPattern {
    /// A pattern matching every committed statement.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Requires the subject.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<Term>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Requires the predicate.
    #[must_use]
    pub fn with_predicate(mut self, predicate: impl Into<Term>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    /// Requires the object.
    #[must_use]
    pub fn with_object(mut self, object: impl Into<Term>) -> Self {
        self.object = Some(object.into());
        self
    }

    /// Adds an allowed context. `None` allows the null context.
    #[must_use]
    pub fn with_context(mut self, context: Option<Term>) -> Self {
        self.contexts.push(context);
        self
    }

    /// Replaces the allowed contexts.
    #[must_use]
    pub fn with_contexts(mut self, contexts: impl IntoIterator<Item = Option<Term>>) -> Self {
        self.contexts = contexts.into_iter().collect();
        self
    }

    /// Excludes the null context.
    #[must_use]
    pub fn named_contexts_only(mut self) -> Self {
        self.named_contexts_only = true;
        self
    }

    /// Restricts the lookup to explicit statements.
    #[must_use]
    pub fn explicit_only(mut self, explicit_only: bool) -> Self {
        self.explicit_only = explicit_only;
        self
    }

    /// Sets the read mode.
    #[must_use]
    pub fn read_mode(mut self, mode: ReadMode) -> Self {
        self.read_mode = mode;
        self
    }
}
