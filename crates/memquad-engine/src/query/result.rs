//! Query results.
//!
//! Both result types are single-pass iterators over a cursor pipeline that
//! holds the store's query read lock. The lock is released when the result
//! is exhausted, fails, is closed, or is dropped, whichever happens first.

use indexmap::IndexMap;
use memquad_common::types::{Quad, Term};
use memquad_common::utils::error::Result;
use memquad_core::{BindingSet, BoxCursor};
use std::sync::Arc;

/// Solutions of a tuple (SELECT-style) query.
pub struct TupleQueryResult {
    names: Vec<Arc<str>>,
    cursor: BoxCursor<BindingSet>,
    span: tracing::Span,
    produced: u64,
    closed: bool,
}

impl TupleQueryResult {
    pub(crate) fn new(names: Vec<Arc<str>>, cursor: BoxCursor<BindingSet>, span: tracing::Span) -> Self {
        Self {
            names,
            cursor,
            span,
            produced: 0,
            closed: false,
        }
    }

    /// Returns the binding names in projection order.
    pub fn binding_names(&self) -> &[Arc<str>] {
        &self.names
    }

    /// Returns true once the result is closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Closes the result and releases its read lock. Idempotent.
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            let _entered = self.span.enter();
            self.cursor.close();
            tracing::debug!(produced = self.produced, "closed query result");
        }
    }

    /// Collects the remaining solutions and closes the result.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while pulling.
    pub fn collect_all(mut self) -> Result<Vec<BindingSet>> {
        self.by_ref().collect()
    }
}

impl Iterator for TupleQueryResult {
    type Item = Result<BindingSet>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }
        let pulled = {
            let _entered = self.span.enter();
            self.cursor.next()
        };
        match pulled {
            Ok(Some(solution)) => {
                self.produced += 1;
                Some(Ok(solution))
            }
            Ok(None) => {
                self.close();
                None
            }
            Err(e) => {
                tracing::debug!(error = %e, "query failed");
                self.close();
                Some(Err(e))
            }
        }
    }
}

impl Drop for TupleQueryResult {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for TupleQueryResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TupleQueryResult")
            .field("names", &self.names)
            .field("produced", &self.produced)
            .field("closed", &self.closed)
            .finish()
    }
}

/// Statements of a graph (CONSTRUCT-style) query.
///
/// Each solution is turned into a quad from its `subject`, `predicate`,
/// `object` and optional `context` bindings. Solutions that do not form a
/// valid quad are skipped.
#[derive(Debug)]
pub struct GraphQueryResult {
    solutions: TupleQueryResult,
    namespaces: IndexMap<String, String>,
}

impl GraphQueryResult {
    pub(crate) fn new(solutions: TupleQueryResult, namespaces: IndexMap<String, String>) -> Self {
        Self {
            solutions,
            namespaces,
        }
    }

    /// Returns the namespace prefixes known when the query started.
    pub fn namespaces(&self) -> &IndexMap<String, String> {
        &self.namespaces
    }

    /// Closes the result and releases its read lock. Idempotent.
    pub fn close(&mut self) {
        self.solutions.close();
    }
}

fn to_quad(solution: &BindingSet) -> Option<Quad> {
    let subject = solution.get("subject")?;
    if subject.is_literal() {
        return None;
    }
    let predicate = solution.get("predicate")?.as_iri()?.clone();
    let object = solution.get("object")?;
    let context = match solution.get("context") {
        Some(Term::Iri(_) | Term::BlankNode(_)) => solution.get("context").cloned(),
        Some(_) => return None,
        None => None,
    };
    Some(Quad {
        subject: subject.clone(),
        predicate,
        object: object.clone(),
        context,
    })
}

impl Iterator for GraphQueryResult {
    type Item = Result<Quad>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.solutions.next()? {
                Ok(solution) => match to_quad(&solution) {
                    Some(quad) => return Some(Ok(quad)),
                    None => tracing::trace!(%solution, "skipped solution that is not a statement"),
                },
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
