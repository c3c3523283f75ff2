//! Cursor operators for query execution.
//!
//! Every operator wraps one or more input cursors and forwards `close` to
//! them, so closing the root of an operator tree closes all of it:
//!
//! - Values / Empty: Leaf cursors over materialized solutions
//! - Map: Convert or drop items one by one
//! - Filter: Keep solutions satisfying a predicate
//! - Projection / Extension: Select, rename, and compute bindings
//! - Slice: Offset and limit
//! - Distinct / Reduced: Duplicate elimination
//! - Sort: Materializing ordered output
//! - Union: Sequential concatenation
//! - Join: Bind join, hash join, and their left-outer variants
//! - Minus / Intersect: Set difference and intersection
//! - Locking: Holds a query read lock for the life of the cursor
//! - TimeLimit: Fails with an interruption once a deadline passes
//!
//! Value-expression errors raised by predicates and functions are scoped to
//! one solution: filters drop the solution, extensions leave the binding
//! unbound. Every other error aborts the pipeline.

mod distinct;
mod extend;
mod filter;
mod join;
mod locking;
mod map;
mod minus;
mod project;
mod slice;
mod sort;
mod time_limit;
mod union;
mod values;

pub use distinct::{DistinctCursor, ReducedCursor};
pub use extend::ExtensionCursor;
pub use filter::FilterCursor;
pub use join::{BindJoinCursor, CursorFactory, HashJoinCursor, HashLeftJoinCursor, LeftJoinCursor};
pub use locking::LockingCursor;
pub use map::MapCursor;
pub use minus::{IntersectCursor, MinusCursor};
pub use project::ProjectionCursor;
pub use slice::SliceCursor;
pub use sort::{SortCompareFn, SortCursor, SortKey, SortKeyFn};
pub use time_limit::{Deadline, TimeLimitCursor};
pub use union::UnionCursor;
pub use values::{EmptyCursor, VecCursor};

use super::BindingSet;
use memquad_common::types::Term;
use memquad_common::utils::error::Result;

/// A boolean test over one solution.
pub trait SolutionPredicate: Send {
    /// Evaluates the predicate.
    fn test(&mut self, solution: &BindingSet) -> Result<bool>;
}

impl<F> SolutionPredicate for F
where
    F: FnMut(&BindingSet) -> Result<bool> + Send,
{
    fn test(&mut self, solution: &BindingSet) -> Result<bool> {
        self(solution)
    }
}

/// A term-valued function over one solution.
pub trait SolutionFunction: Send {
    /// Evaluates the function.
    fn evaluate(&mut self, solution: &BindingSet) -> Result<Term>;
}

impl<F> SolutionFunction for F
where
    F: FnMut(&BindingSet) -> Result<Term> + Send,
{
    fn evaluate(&mut self, solution: &BindingSet) -> Result<Term> {
        self(solution)
    }
}

/// Applies a predicate with per-solution error semantics: an evaluation
/// error counts as `false`, anything else is propagated.
pub(crate) fn passes(predicate: &mut dyn SolutionPredicate, solution: &BindingSet) -> Result<bool> {
    match predicate.test(solution) {
        Ok(keep) => Ok(keep),
        Err(e) if e.is_evaluation_error() => {
            tracing::trace!(error = %e, "predicate error, solution dropped");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::execution::{BoxCursor, Cursor};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Builds a solution from `(name, literal)` pairs.
    pub fn row(pairs: &[(&str, &str)]) -> BindingSet {
        pairs
            .iter()
            .map(|(n, v)| (*n, Term::literal(*v)))
            .collect()
    }

    /// A cursor over fixed rows that counts how often it is closed.
    pub struct TrackedCursor {
        rows: std::vec::IntoIter<BindingSet>,
        closes: Arc<AtomicUsize>,
        closed: bool,
    }

    impl TrackedCursor {
        pub fn boxed(rows: Vec<BindingSet>) -> (BoxCursor<BindingSet>, Arc<AtomicUsize>) {
            let closes = Arc::new(AtomicUsize::new(0));
            let cursor = Self {
                rows: rows.into_iter(),
                closes: Arc::clone(&closes),
                closed: false,
            };
            (Box::new(cursor), closes)
        }
    }

    impl Cursor for TrackedCursor {
        type Item = BindingSet;

        fn next(&mut self) -> Result<Option<BindingSet>> {
            if self.closed {
                return Ok(None);
            }
            Ok(self.rows.next())
        }

        fn close(&mut self) {
            if !self.closed {
                self.closed = true;
                self.closes.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn name(&self) -> &'static str {
            "Tracked"
        }
    }

    pub fn closes(counter: &Arc<AtomicUsize>) -> usize {
        counter.load(Ordering::SeqCst)
    }
}
