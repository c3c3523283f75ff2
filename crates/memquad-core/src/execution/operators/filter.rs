//! Filter operator for applying predicates.

use super::{SolutionPredicate, passes};
use crate::execution::{BindingSet, BoxCursor, Cursor};
use memquad_common::utils::error::Result;

/// Keeps the solutions a predicate accepts.
///
/// A solution whose predicate raises an evaluation error is dropped.
pub struct FilterCursor {
    /// Input to read from.
    input: BoxCursor<BindingSet>,
    /// Predicate to apply.
    predicate: Box<dyn SolutionPredicate>,
    closed: bool,
}

impl FilterCursor {
    /// Creates a new filter cursor.
    pub fn new(input: BoxCursor<BindingSet>, predicate: Box<dyn SolutionPredicate>) -> Self {
        Self {
            input,
            predicate,
            closed: false,
        }
    }
}

impl Cursor for FilterCursor {
    type Item = BindingSet;

    fn next(&mut self) -> Result<Option<BindingSet>> {
        if self.closed {
            return Ok(None);
        }
        while let Some(solution) = self.input.next()? {
            if passes(self.predicate.as_mut(), &solution)? {
                return Ok(Some(solution));
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
        "Filter"
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{TrackedCursor, closes, row};
    use super::*;
    use crate::execution::collect;
    use memquad_common::types::Term;
    use memquad_common::utils::error::{Error, EvaluationError};

    #[test]
    fn test_filter_keeps_matching() {
        let (input, _) = TrackedCursor::boxed(vec![
            row(&[("x", "1")]),
            row(&[("x", "2")]),
            row(&[("x", "3")]),
        ]);
        let predicate = |s: &BindingSet| -> Result<bool> { Ok(s.get("x") != Some(&Term::literal("2"))) };
        let mut filter = FilterCursor::new(input, Box::new(predicate));
        let out = collect(&mut filter).unwrap();
        assert_eq!(out, vec![row(&[("x", "1")]), row(&[("x", "3")])]);
    }

    #[test]
    fn test_evaluation_error_drops_solution() {
        let (input, _) = TrackedCursor::boxed(vec![row(&[("x", "1")]), row(&[])]);
        let predicate = |s: &BindingSet| -> Result<bool> {
            match s.get("x") {
                Some(_) => Ok(true),
                None => Err(EvaluationError::UnboundVariable("x".into()).into()),
            }
        };
        let mut filter = FilterCursor::new(input, Box::new(predicate));
        assert_eq!(collect(&mut filter).unwrap().len(), 1);
    }

    #[test]
    fn test_fatal_error_propagates_and_close_is_idempotent() {
        let (input, counter) = TrackedCursor::boxed(vec![row(&[("x", "1")])]);
        let predicate = |_: &BindingSet| -> Result<bool> { Err(Error::Interrupted { elapsed_ms: 0 }) };
        let mut filter = FilterCursor::new(input, Box::new(predicate));
        assert!(filter.next().unwrap_err().is_interrupted());
        filter.close();
        filter.close();
        assert_eq!(closes(&counter), 1);
        assert!(filter.next().unwrap().is_none());
    }
}
