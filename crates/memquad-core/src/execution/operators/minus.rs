//! Set difference and intersection.

use crate::execution::{BindingSet, BoxCursor, Cursor};
use memquad_common::utils::error::Result;
use memquad_common::utils::hash::FxHashSet;

/// Removes left solutions that are compatible with, and share at least one
/// bound name with, some right solution.
///
/// The right operand is materialized on the first pull.
pub struct MinusCursor {
    left: BoxCursor<BindingSet>,
    right: BoxCursor<BindingSet>,
    excluded: Option<Vec<BindingSet>>,
    closed: bool,
}

impl MinusCursor {
    /// Creates a new minus cursor.
    pub fn new(left: BoxCursor<BindingSet>, right: BoxCursor<BindingSet>) -> Self {
        Self {
            left,
            right,
            excluded: None,
            closed: false,
        }
    }
}

impl Cursor for MinusCursor {
    type Item = BindingSet;

    fn next(&mut self) -> Result<Option<BindingSet>> {
        if self.closed {
            return Ok(None);
        }
        if self.excluded.is_none() {
            let mut rows = Vec::new();
            while let Some(row) = self.right.next()? {
                rows.push(row);
            }
            self.right.close();
            self.excluded = Some(rows);
        }
        let excluded = self.excluded.as_deref().unwrap_or_default();
        while let Some(solution) = self.left.next()? {
            let removed = excluded
                .iter()
                .any(|r| solution.shares_name_with(r) && solution.is_compatible(r));
            if !removed {
                return Ok(Some(solution));
            }
        }
        Ok(None)
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.excluded = None;
            self.left.close();
            self.right.close();
        }
    }

    fn name(&self) -> &'static str {
        "Minus"
    }
}

/// Keeps left solutions that also occur in the right operand.
pub struct IntersectCursor {
    left: BoxCursor<BindingSet>,
    right: BoxCursor<BindingSet>,
    included: Option<FxHashSet<BindingSet>>,
    closed: bool,
}

impl IntersectCursor {
    /// Creates a new intersect cursor.
    pub fn new(left: BoxCursor<BindingSet>, right: BoxCursor<BindingSet>) -> Self {
        Self {
            left,
            right,
            included: None,
            closed: false,
        }
    }
}

impl Cursor for IntersectCursor {
    type Item = BindingSet;

    fn next(&mut self) -> Result<Option<BindingSet>> {
        if self.closed {
            return Ok(None);
        }
        if self.included.is_none() {
            let mut rows = FxHashSet::default();
            while let Some(row) = self.right.next()? {
                rows.insert(row);
            }
            self.right.close();
            self.included = Some(rows);
        }
        while let Some(solution) = self.left.next()? {
            if self.included.as_ref().is_some_and(|rows| rows.contains(&solution)) {
                return Ok(Some(solution));
            }
        }
        Ok(None)
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.included = None;
            self.left.close();
            self.right.close();
        }
    }

    fn name(&self) -> &'static str {
        "Intersect"
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{TrackedCursor, row};
    use super::*;
    use crate::execution::collect;

    #[test]
    fn test_minus_requires_shared_name() {
        let (left, _) = TrackedCursor::boxed(vec![
            row(&[("x", "1")]),
            row(&[("x", "2")]),
        ]);
        let (right, _) = TrackedCursor::boxed(vec![row(&[("x", "1")]), row(&[("y", "9")])]);
        let out = collect(&mut MinusCursor::new(left, right)).unwrap();
        assert_eq!(out, vec![row(&[("x", "2")])]);
    }

    #[test]
    fn test_intersect() {
        let (left, _) = TrackedCursor::boxed(vec![row(&[("x", "1")]), row(&[("x", "2")])]);
        let (right, _) = TrackedCursor::boxed(vec![row(&[("x", "2")])]);
        let out = collect(&mut IntersectCursor::new(left, right)).unwrap();
        assert_eq!(out, vec![row(&[("x", "2")])]);
    }
}
