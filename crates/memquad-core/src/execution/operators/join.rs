//! Join operators.
//!
//! - [`BindJoinCursor`]: Re-evaluates the right operand once per left
//!   solution, with the left bindings passed in
//! - [`HashJoinCursor`]: Materializes the left operand into a [`JoinTable`]
//!   and probes it with the right operand
//! - [`LeftJoinCursor`] / [`HashLeftJoinCursor`]: Left-outer variants with an
//!   optional join condition

use super::{SolutionPredicate, passes};
use crate::execution::{BindingSet, BoxCursor, Cursor};
use memquad_common::types::Term;
use memquad_common::utils::error::Result;
use memquad_common::utils::hash::FxHashMap;
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::sync::Arc;

/// Builds the right operand of a bind join for one left solution.
pub type CursorFactory = Box<dyn FnMut(&BindingSet) -> Result<BoxCursor<BindingSet>> + Send>;

type JoinKey = SmallVec<[Option<Term>; 4]>;

/// Materialized join operand, bucketed by the values of the join names.
///
/// Rows that leave a join name unbound cannot be bucketed and are kept
/// aside; they are candidates for every probe.
#[derive(Debug, Default)]
struct JoinTable {
    names: Vec<Arc<str>>,
    keyed: FxHashMap<JoinKey, Vec<BindingSet>>,
    loose: Vec<BindingSet>,
    len: usize,
}

impl JoinTable {
    fn new(names: Vec<Arc<str>>) -> Self {
        Self {
            names,
            ..Self::default()
        }
    }

    fn insert(&mut self, row: BindingSet) {
        let key = row.key(&self.names);
        if key.iter().all(Option::is_some) {
            self.keyed.entry(key).or_default().push(row);
        } else {
            self.loose.push(row);
        }
        self.len += 1;
    }

    fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Calls `emit` with every stored row compatible with `probe`.
    fn probe(&self, probe: &BindingSet, mut emit: impl FnMut(&BindingSet)) {
        let key = probe.key(&self.names);
        if key.iter().all(Option::is_some) {
            if let Some(rows) = self.keyed.get(&key) {
                rows.iter().for_each(&mut emit);
            }
        } else {
            self.keyed.values().flatten().for_each(&mut emit);
        }
        self.loose.iter().for_each(emit);
    }
}

/// Nested-loop join that evaluates the right operand per left solution.
pub struct BindJoinCursor {
    left: BoxCursor<BindingSet>,
    right: CursorFactory,
    current: Option<(BindingSet, BoxCursor<BindingSet>)>,
    closed: bool,
}

impl BindJoinCursor {
    /// Creates a bind join.
    pub fn new(left: BoxCursor<BindingSet>, right: CursorFactory) -> Self {
        Self {
            left,
            right,
            current: None,
            closed: false,
        }
    }
}

impl Cursor for BindJoinCursor {
    type Item = BindingSet;

    fn next(&mut self) -> Result<Option<BindingSet>> {
        if self.closed {
            return Ok(None);
        }
        loop {
            if let Some((left, right)) = self.current.as_mut() {
                match right.next()? {
                    Some(solution) => {
                        if let Some(merged) = left.merge(&solution) {
                            return Ok(Some(merged));
                        }
                        continue;
                    }
                    None => {
                        right.close();
                        self.current = None;
                    }
                }
            }
            match self.left.next()? {
                Some(left) => {
                    let right = (self.right)(&left)?;
                    self.current = Some((left, right));
                }
                None => return Ok(None),
            }
        }
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            if let Some((_, mut right)) = self.current.take() {
                right.close();
            }
            self.left.close();
        }
    }

    fn name(&self) -> &'static str {
        "BindJoin"
    }
}

/// Left-outer bind join.
///
/// A left solution with no right match passing the condition is yielded
/// unchanged.
pub struct LeftJoinCursor {
    left: BoxCursor<BindingSet>,
    right: CursorFactory,
    condition: Option<Box<dyn SolutionPredicate>>,
    current: Option<(BindingSet, BoxCursor<BindingSet>, bool)>,
    closed: bool,
}

impl LeftJoinCursor {
    /// Creates a left-outer bind join.
    pub fn new(
        left: BoxCursor<BindingSet>,
        right: CursorFactory,
        condition: Option<Box<dyn SolutionPredicate>>,
    ) -> Self {
        Self {
            left,
            right,
            condition,
            current: None,
            closed: false,
        }
    }
}

impl Cursor for LeftJoinCursor {
    type Item = BindingSet;

    fn next(&mut self) -> Result<Option<BindingSet>> {
        if self.closed {
            return Ok(None);
        }
        loop {
            if let Some((left, right, matched)) = self.current.as_mut() {
                match right.next()? {
                    Some(solution) => {
                        let Some(merged) = left.merge(&solution) else {
                            continue;
                        };
                        let accepted = match self.condition.as_mut() {
                            Some(condition) => passes(condition.as_mut(), &merged)?,
                            None => true,
                        };
                        if accepted {
                            *matched = true;
                            return Ok(Some(merged));
                        }
                    }
                    None => {
                        right.close();
                        if let Some((left, _, matched)) = self.current.take() {
                            if !matched {
                                return Ok(Some(left));
                            }
                        }
                    }
                }
                continue;
            }
            match self.left.next()? {
                Some(left) => {
                    let right = (self.right)(&left)?;
                    self.current = Some((left, right, false));
                }
                None => return Ok(None),
            }
        }
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            if let Some((_, mut right, _)) = self.current.take() {
                right.close();
            }
            self.left.close();
        }
    }

    fn name(&self) -> &'static str {
        "LeftJoin"
    }
}

/// Hash join: builds a table from the left operand, then streams the right.
///
/// When the build side is empty the right operand is never pulled.
pub struct HashJoinCursor {
    left: BoxCursor<BindingSet>,
    right: BoxCursor<BindingSet>,
    table: Option<JoinTable>,
    names: Vec<Arc<str>>,
    pending: VecDeque<BindingSet>,
    closed: bool,
}

impl HashJoinCursor {
    /// Creates a hash join keyed on `names`, typically the names both
    /// operands are guaranteed to bind.
    pub fn new(
        left: BoxCursor<BindingSet>,
        right: BoxCursor<BindingSet>,
        names: Vec<Arc<str>>,
    ) -> Self {
        Self {
            left,
            right,
            table: None,
            names,
            pending: VecDeque::new(),
            closed: false,
        }
    }

    fn build(&mut self) -> Result<()> {
        let mut table = JoinTable::new(std::mem::take(&mut self.names));
        while let Some(row) = self.left.next()? {
            table.insert(row);
        }
        self.left.close();
        tracing::trace!(rows = table.len, "hash join table built");
        self.table = Some(table);
        Ok(())
    }
}

impl Cursor for HashJoinCursor {
    type Item = BindingSet;

    fn next(&mut self) -> Result<Option<BindingSet>> {
        if self.closed {
            return Ok(None);
        }
        if self.table.is_none() {
            self.build()?;
        }
        loop {
            if let Some(solution) = self.pending.pop_front() {
                return Ok(Some(solution));
            }
            let Some(table) = self.table.as_ref() else {
                return Ok(None);
            };
            if table.is_empty() {
                self.right.close();
                return Ok(None);
            }
            let Some(probe) = self.right.next()? else {
                return Ok(None);
            };
            let pending = &mut self.pending;
            table.probe(&probe, |row| {
                if let Some(merged) = row.merge(&probe) {
                    pending.push_back(merged);
                }
            });
        }
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.table = None;
            self.pending.clear();
            self.left.close();
            self.right.close();
        }
    }

    fn name(&self) -> &'static str {
        "HashJoin"
    }
}

/// Left-outer hash join: materializes the right operand, then streams the
/// left one.
pub struct HashLeftJoinCursor {
    left: BoxCursor<BindingSet>,
    right: BoxCursor<BindingSet>,
    condition: Option<Box<dyn SolutionPredicate>>,
    table: Option<JoinTable>,
    names: Vec<Arc<str>>,
    pending: VecDeque<BindingSet>,
    closed: bool,
}

impl HashLeftJoinCursor {
    /// Creates a left-outer hash join keyed on `names`.
    pub fn new(
        left: BoxCursor<BindingSet>,
        right: BoxCursor<BindingSet>,
        names: Vec<Arc<str>>,
        condition: Option<Box<dyn SolutionPredicate>>,
    ) -> Self {
        Self {
            left,
            right,
            condition,
            table: None,
            names,
            pending: VecDeque::new(),
            closed: false,
        }
    }

    fn build(&mut self) -> Result<()> {
        let mut table = JoinTable::new(std::mem::take(&mut self.names));
        while let Some(row) = self.right.next()? {
            table.insert(row);
        }
        self.right.close();
        self.table = Some(table);
        Ok(())
    }
}

impl Cursor for HashLeftJoinCursor {
    type Item = BindingSet;

    fn next(&mut self) -> Result<Option<BindingSet>> {
        if self.closed {
            return Ok(None);
        }
        if self.table.is_none() {
            self.build()?;
        }
        loop {
            if let Some(solution) = self.pending.pop_front() {
                return Ok(Some(solution));
            }
            let Some(left) = self.left.next()? else {
                return Ok(None);
            };
            let Some(table) = self.table.as_ref() else {
                return Ok(None);
            };
            let mut candidates = Vec::new();
            table.probe(&left, |row| {
                if let Some(merged) = left.merge(row) {
                    candidates.push(merged);
                }
            });
            for merged in candidates {
                let accepted = match self.condition.as_mut() {
                    Some(condition) => passes(condition.as_mut(), &merged)?,
                    None => true,
                };
                if accepted {
                    self.pending.push_back(merged);
                }
            }
            if self.pending.is_empty() {
                return Ok(Some(left));
            }
        }
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.table = None;
            self.pending.clear();
            self.left.close();
            self.right.close();
        }
    }

    fn name(&self) -> &'static str {
        "HashLeftJoin"
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{TrackedCursor, closes, row};
    use super::super::values::VecCursor;
    use super::*;
    use crate::execution::collect;

    fn factory(rows: Vec<BindingSet>) -> CursorFactory {
        Box::new(move |_: &BindingSet| -> Result<BoxCursor<BindingSet>> {
            Ok(Box::new(VecCursor::new(rows.clone())))
        })
    }

    fn people() -> Vec<BindingSet> {
        vec![
            row(&[("p", "alice"), ("age", "30")]),
            row(&[("p", "bob"), ("age", "40")]),
        ]
    }

    fn names() -> Vec<BindingSet> {
        vec![
            row(&[("p", "alice"), ("name", "Alice")]),
            row(&[("p", "carol"), ("name", "Carol")]),
        ]
    }

    #[test]
    fn test_bind_join_merges_compatible() {
        let (left, counter) = TrackedCursor::boxed(people());
        let mut join = BindJoinCursor::new(left, factory(names()));
        let out = collect(&mut join).unwrap();
        assert_eq!(
            out,
            vec![row(&[("p", "alice"), ("age", "30"), ("name", "Alice")])]
        );
        assert_eq!(closes(&counter), 1);
    }

    #[test]
    fn test_hash_join_matches_bind_join() {
        let (left, _) = TrackedCursor::boxed(people());
        let (right, _) = TrackedCursor::boxed(names());
        let mut join = HashJoinCursor::new(left, right, vec!["p".into()]);
        let out = collect(&mut join).unwrap();
        assert_eq!(
            out,
            vec![row(&[("p", "alice"), ("age", "30"), ("name", "Alice")])]
        );
    }

    #[test]
    fn test_hash_join_unbound_key_rows_are_candidates() {
        let (left, _) = TrackedCursor::boxed(vec![row(&[("age", "30")])]);
        let (right, _) = TrackedCursor::boxed(names());
        let mut join = HashJoinCursor::new(left, right, vec!["p".into()]);
        assert_eq!(collect(&mut join).unwrap().len(), 2);
    }

    #[test]
    fn test_hash_join_empty_build_side_skips_probe() {
        let (left, _) = TrackedCursor::boxed(vec![]);
        let (right, right_closes) = TrackedCursor::boxed(names());
        let mut join = HashJoinCursor::new(left, right, vec!["p".into()]);
        assert!(join.next().unwrap().is_none());
        assert_eq!(closes(&right_closes), 1);
    }

    #[test]
    fn test_left_join_keeps_unmatched() {
        let (left, _) = TrackedCursor::boxed(people());
        let mut join = LeftJoinCursor::new(left, factory(names()), None);
        let out = collect(&mut join).unwrap();
        assert_eq!(
            out,
            vec![
                row(&[("p", "alice"), ("age", "30"), ("name", "Alice")]),
                row(&[("p", "bob"), ("age", "40")]),
            ]
        );
    }

    #[test]
    fn test_left_join_condition_failure_keeps_left() {
        let condition = |s: &BindingSet| -> Result<bool> {
            Ok(s.get("name") == Some(&Term::literal("Nobody")))
        };
        let (left, _) = TrackedCursor::boxed(people());
        let mut join = LeftJoinCursor::new(left, factory(names()), Some(Box::new(condition)));
        assert_eq!(collect(&mut join).unwrap(), people());
    }

    #[test]
    fn test_hash_left_join_matches_bind_left_join() {
        let (left, _) = TrackedCursor::boxed(people());
        let (right, _) = TrackedCursor::boxed(names());
        let mut hash = HashLeftJoinCursor::new(left, right, vec!["p".into()], None);
        let (left, _) = TrackedCursor::boxed(people());
        let mut bind = LeftJoinCursor::new(left, factory(names()), None);
        assert_eq!(collect(&mut hash).unwrap(), collect(&mut bind).unwrap());
    }

    #[test]
    fn test_close_mid_iteration_closes_inner_right() {
        let right_counter = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen = Arc::clone(&right_counter);
        let factory: CursorFactory = Box::new(move |_: &BindingSet| -> Result<BoxCursor<BindingSet>> {
            let (cursor, counter) = TrackedCursor::boxed(vec![
                row(&[("n", "1")]),
                row(&[("n", "2")]),
            ]);
            seen.lock().unwrap().push(counter);
            Ok(cursor)
        });
        let (left, left_closes) = TrackedCursor::boxed(vec![row(&[("x", "1")])]);
        let mut join = BindJoinCursor::new(left, factory);
        assert!(join.next().unwrap().is_some());
        join.close();
        assert_eq!(closes(&left_closes), 1);
        let counters = right_counter.lock().unwrap();
        assert_eq!(counters.len(), 1);
        assert_eq!(closes(&counters[0]), 1);
    }
}
