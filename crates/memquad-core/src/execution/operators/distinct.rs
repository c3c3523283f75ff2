//! Duplicate elimination.

use crate::execution::{BindingSet, BoxCursor, Cursor};
use memquad_common::utils::error::Result;
use memquad_common::utils::hash::FxHashSet;

/// Drops every solution equal to one seen before.
pub struct DistinctCursor {
    input: BoxCursor<BindingSet>,
    seen: FxHashSet<BindingSet>,
    closed: bool,
}

impl DistinctCursor {
    /// Creates a new distinct cursor.
    pub fn new(input: BoxCursor<BindingSet>) -> Self {
        Self {
            input,
            seen: FxHashSet::default(),
            closed: false,
        }
    }
}

impl Cursor for DistinctCursor {
    type Item = BindingSet;

    fn next(&mut self) -> Result<Option<BindingSet>> {
        if self.closed {
            return Ok(None);
        }
        while let Some(solution) = self.input.next()? {
            if !self.seen.contains(&solution) {
                self.seen.insert(solution.clone());
                return Ok(Some(solution));
            }
        }
        Ok(None)
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.seen.clear();
            self.input.close();
        }
    }

    fn name(&self) -> &'static str {
        "Distinct"
    }
}

/// Drops a solution equal to the one directly before it.
pub struct ReducedCursor {
    input: BoxCursor<BindingSet>,
    previous: Option<BindingSet>,
    closed: bool,
}

impl ReducedCursor {
    /// Creates a new reduced cursor.
    pub fn new(input: BoxCursor<BindingSet>) -> Self {
        Self {
            input,
            previous: None,
            closed: false,
        }
    }
}

impl Cursor for ReducedCursor {
    type Item = BindingSet;

    fn next(&mut self) -> Result<Option<BindingSet>> {
        if self.closed {
            return Ok(None);
        }
        while let Some(solution) = self.input.next()? {
            if self.previous.as_ref() != Some(&solution) {
                self.previous = Some(solution.clone());
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
        "Reduced"
    }
}
