//! Materializing sort.

use crate::execution::{BindingSet, BoxCursor, Cursor};
use memquad_common::types::Term;
use memquad_common::utils::error::Result;
use std::cmp::Ordering;

/// Sort key of one solution: one optional term per order element.
pub type SortKey = Vec<Option<Term>>;

/// Computes the sort key of a solution.
pub type SortKeyFn = Box<dyn FnMut(&BindingSet) -> Result<SortKey> + Send>;

/// Compares two sort keys.
pub type SortCompareFn = Box<dyn Fn(&SortKey, &SortKey) -> Ordering + Send>;

/// Reads its whole input on the first pull, then yields it in sorted order.
///
/// The sort is stable, so solutions with equal keys keep their input order.
pub struct SortCursor {
    input: BoxCursor<BindingSet>,
    key: SortKeyFn,
    compare: SortCompareFn,
    sorted: Option<std::vec::IntoIter<(SortKey, BindingSet)>>,
    closed: bool,
}

impl SortCursor {
    /// Creates a new sort cursor.
    pub fn new(input: BoxCursor<BindingSet>, key: SortKeyFn, compare: SortCompareFn) -> Self {
        Self {
            input,
            key,
            compare,
            sorted: None,
            closed: false,
        }
    }

    fn materialize(&mut self) -> Result<std::vec::IntoIter<(SortKey, BindingSet)>> {
        let mut rows = Vec::new();
        while let Some(solution) = self.input.next()? {
            rows.push(((self.key)(&solution)?, solution));
        }
        self.input.close();
        let compare = &self.compare;
        rows.sort_by(|a, b| compare(&a.0, &b.0));
        Ok(rows.into_iter())
    }
}

impl Cursor for SortCursor {
    type Item = BindingSet;

    fn next(&mut self) -> Result<Option<BindingSet>> {
        if self.closed {
            return Ok(None);
        }
        if self.sorted.is_none() {
            self.sorted = Some(self.materialize()?);
        }
        Ok(self
            .sorted
            .as_mut()
            .and_then(Iterator::next)
            .map(|(_, solution)| solution))
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.sorted = None;
            self.input.close();
        }
    }

    fn name(&self) -> &'static str {
        "Sort"
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{TrackedCursor, closes, row};
    use super::*;
    use crate::execution::collect;

    #[test]
    fn test_sort_descending_is_stable() {
        let (input, counter) = TrackedCursor::boxed(vec![
            row(&[("k", "a"), ("id", "1")]),
            row(&[("k", "b"), ("id", "2")]),
            row(&[("k", "a"), ("id", "3")]),
        ]);
        let key: SortKeyFn = Box::new(|s: &BindingSet| Ok(vec![s.get("k").cloned()]));
        let compare: SortCompareFn = Box::new(|a: &SortKey, b: &SortKey| {
            let label = |k: &SortKey| k[0].as_ref().map(|t| t.to_string());
            label(b).cmp(&label(a))
        });
        let mut sort = SortCursor::new(input, key, compare);

        assert_eq!(sort.next().unwrap(), Some(row(&[("k", "b"), ("id", "2")])));
        // Input is drained and closed on the first pull.
        assert_eq!(closes(&counter), 1);
        let rest = collect(&mut sort).unwrap();
        assert_eq!(
            rest,
            vec![row(&[("k", "a"), ("id", "1")]), row(&[("k", "a"), ("id", "3")])]
        );
    }
}
