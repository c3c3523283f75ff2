//! Quads: a triple plus the context (named graph) it lives in.

use super::term::{Iri, Term, Triple};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A subject-predicate-object statement in a context.
///
/// `context` is `None` for the null (default) context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quad {
    /// The subject.
    pub subject: Term,
    /// The predicate.
    pub predicate: Iri,
    /// The object.
    pub object: Term,
    /// The context, or `None` for the null context.
    pub context: Option<Term>,
}

impl Quad {
    /// Creates a quad in the null context.
    pub fn new(subject: impl Into<Term>, predicate: impl Into<Iri>, object: impl Into<Term>) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            context: None,
        }
    }

    /// Places the quad in the given context.
    #[must_use]
    pub fn in_context(mut self, context: impl Into<Term>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Returns the predicate as a term.
    #[must_use]
    pub fn predicate_term(&self) -> Term {
        Term::Iri(self.predicate.clone())
    }

    /// Returns the triple part, dropping the context.
    #[must_use]
    pub fn triple(&self) -> Triple {
        Triple {
            subject: self.subject.clone(),
            predicate: self.predicate.clone(),
            object: self.object.clone(),
        }
    }
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)?;
        if let Some(ctx) = &self.context {
            write!(f, " {ctx}")?;
        }
        f.write_str(" .")
    }
}
