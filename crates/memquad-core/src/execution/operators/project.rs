//! Projection operator for selecting and renaming bindings.

use crate::execution::{BindingSet, BoxCursor, Cursor};
use memquad_common::utils::error::Result;
use std::sync::Arc;

/// Keeps only the projected names, renaming each `source` to its `target`.
pub struct ProjectionCursor {
    /// Input to read from.
    input: BoxCursor<BindingSet>,
    /// `(source, target)` pairs in projection order.
    elements: Vec<(Arc<str>, Arc<str>)>,
    closed: bool,
}

impl ProjectionCursor {
    /// Creates a new projection cursor.
    pub fn new(input: BoxCursor<BindingSet>, elements: Vec<(Arc<str>, Arc<str>)>) -> Self {
        Self {
            input,
            elements,
            closed: false,
        }
    }
}

impl Cursor for ProjectionCursor {
    type Item = BindingSet;

    fn next(&mut self) -> Result<Option<BindingSet>> {
        if self.closed {
            return Ok(None);
        }
        let Some(solution) = self.input.next()? else {
            return Ok(None);
        };
        let mut projected = BindingSet::new();
        for (source, target) in &self.elements {
            if let Some(value) = solution.get(source) {
                projected.insert(Arc::clone(target), value.clone());
            }
        }
        Ok(Some(projected))
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.input.close();
        }
    }

    fn name(&self) -> &'static str {
        "Projection"
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{TrackedCursor, row};
    use super::*;
    use crate::execution::collect;

    #[test]
    fn test_projection_selects_and_renames() {
        let (input, _) = TrackedCursor::boxed(vec![
            row(&[("s", "a"), ("o", "1")]),
            row(&[("o", "2")]),
        ]);
        let mut project = ProjectionCursor::new(input, vec![("s".into(), "subject".into())]);
        let out = collect(&mut project).unwrap();
        assert_eq!(out, vec![row(&[("subject", "a")]), row(&[])]);
    }
}
