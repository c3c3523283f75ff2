//! Evaluation strategy: compiles algebra trees into cursor pipelines.
//!
//! Compilation is recursive. Each node becomes a cursor operator from
//! `memquad_core::execution::operators` wrapping the cursors of its
//! operands, so the returned cursor is the root of a lazy pipeline.
//!
//! ## Submodules
//!
//! - [`pattern`] - Statement pattern scans
//! - [`expression`] - Value expressions
//! - [`group`] - Grouping and aggregation
//! - [`ordering`] - SPARQL term ordering
//! - [`value`] - Numeric promotion, effective boolean value, comparisons

pub mod expression;
pub mod group;
pub mod ordering;
pub mod pattern;
pub mod value;

pub use group::GroupCursor;
pub use ordering::compare_terms;

use crate::config::JoinAlgorithm;
use crate::query::algebra::{ProjectionElem, TupleExpr, ValueExpr};
use crate::query::dataset::Dataset;
use memquad_common::utils::error::Result;
use memquad_common::utils::hash::FxHashMap;
use memquad_core::execution::operators::{
    BindJoinCursor, CursorFactory, Deadline, DistinctCursor, EmptyCursor, ExtensionCursor,
    FilterCursor, HashJoinCursor, HashLeftJoinCursor, IntersectCursor, LeftJoinCursor,
    MinusCursor, ProjectionCursor, ReducedCursor, SliceCursor, SolutionFunction,
    SolutionPredicate, SortCompareFn, SortCursor, SortKey, SortKeyFn, TimeLimitCursor,
    UnionCursor, VecCursor,
};
use memquad_core::{BindingSet, BoxCursor, ReadMode, TripleSource};
use parking_lot::Mutex;
use regex::Regex;
use std::sync::Arc;

/// Per-query evaluation settings.
pub struct EvaluationContext {
    dataset: Option<Dataset>,
    include_inferred: bool,
    read_mode: ReadMode,
    join_algorithm: JoinAlgorithm,
    deadline: Option<Deadline>,
    span: tracing::Span,
    query_id: u64,
    regex_cache: Mutex<FxHashMap<(String, String), Regex>>,
}

impl EvaluationContext {
    /// Creates a context reading committed statements, inferred ones
    /// included, with no dataset restriction or deadline.
    #[must_use]
    pub fn new(query_id: u64) -> Self {
        Self {
            dataset: None,
            include_inferred: true,
            read_mode: ReadMode::Committed,
            join_algorithm: JoinAlgorithm::Auto,
            deadline: None,
            span: tracing::debug_span!("query", id = query_id),
            query_id,
            regex_cache: Mutex::new(FxHashMap::default()),
        }
    }

    /// Restricts the graphs the query reads.
    #[must_use]
    pub fn with_dataset(mut self, dataset: Option<Dataset>) -> Self {
        self.dataset = dataset;
        self
    }

    /// Sets whether inferred statements are read.
    #[must_use]
    pub fn with_include_inferred(mut self, include: bool) -> Self {
        self.include_inferred = include;
        self
    }

    /// Sets the snapshot to read.
    #[must_use]
    pub fn with_read_mode(mut self, mode: ReadMode) -> Self {
        self.read_mode = mode;
        self
    }

    /// Sets the join algorithm.
    #[must_use]
    pub fn with_join_algorithm(mut self, algorithm: JoinAlgorithm) -> Self {
        self.join_algorithm = algorithm;
        self
    }

    /// Sets the deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Option<Deadline>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Returns the dataset restriction.
    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    /// Returns the tracing span of this query.
    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    /// Returns the query id.
    pub fn query_id(&self) -> u64 {
        self.query_id
    }

    /// Returns the deadline.
    pub fn deadline(&self) -> Option<Deadline> {
        self.deadline
    }
}

struct StrategyInner {
    source: Arc<dyn TripleSource>,
    context: EvaluationContext,
}

/// Compiles algebra trees against a statement source.
///
/// Cheap to clone; bind joins and filters keep a clone to evaluate their
/// operands and conditions per solution.
#[derive(Clone)]
pub struct EvaluationStrategy {
    inner: Arc<StrategyInner>,
}

impl EvaluationStrategy {
    /// Creates a strategy reading from `source`.
    pub fn new(source: Arc<dyn TripleSource>, context: EvaluationContext) -> Self {
        Self {
            inner: Arc::new(StrategyInner { source, context }),
        }
    }

    /// Returns the evaluation context.
    pub fn context(&self) -> &EvaluationContext {
        &self.inner.context
    }

    /// Compiles `expr` into a cursor over its solutions under `bindings`.
    ///
    /// # Errors
    ///
    /// Returns an error if the deadline already passed or the statement
    /// source fails.
    pub fn evaluate(&self, expr: &TupleExpr, bindings: &BindingSet) -> Result<BoxCursor<BindingSet>> {
        let deadline = self.inner.context.deadline;
        if let Some(deadline) = deadline {
            deadline.check()?;
        }
        let cursor = self.evaluate_node(expr, bindings)?;
        Ok(match deadline {
            Some(deadline) => Box::new(TimeLimitCursor::new(cursor, deadline)),
            None => cursor,
        })
    }

    fn evaluate_node(&self, expr: &TupleExpr, bindings: &BindingSet) -> Result<BoxCursor<BindingSet>> {
        match expr {
            TupleExpr::StatementPattern(pattern) => self.evaluate_pattern(pattern, bindings),
            TupleExpr::Join(left, right) => self.evaluate_join(left, right, bindings),
            TupleExpr::LeftJoin {
                left,
                right,
                condition,
            } => self.evaluate_left_join(left, right, condition.as_ref(), bindings),
            TupleExpr::Union(left, right) => Ok(Box::new(UnionCursor::new(vec![
                self.evaluate(left, bindings)?,
                self.evaluate(right, bindings)?,
            ]))),
            TupleExpr::Difference(left, right) => Ok(Box::new(MinusCursor::new(
                self.evaluate(left, bindings)?,
                self.evaluate(right, bindings)?,
            ))),
            TupleExpr::Intersection(left, right) => Ok(Box::new(IntersectCursor::new(
                self.evaluate(left, bindings)?,
                self.evaluate(right, bindings)?,
            ))),
            TupleExpr::Filter { input, condition } => {
                let input = self.evaluate(input, bindings)?;
                Ok(Box::new(FilterCursor::new(input, self.predicate(condition))))
            }
            TupleExpr::Projection { input, elements } => {
                self.evaluate_projection(input, elements, bindings)
            }
            TupleExpr::Extension { input, elements } => {
                let input = self.evaluate(input, bindings)?;
                let functions = elements
                    .iter()
                    .map(|e| (Arc::clone(&e.name), self.function(&e.expr)))
                    .collect();
                Ok(Box::new(ExtensionCursor::new(input, functions)))
            }
            TupleExpr::Slice {
                input,
                offset,
                limit,
            } => Ok(Box::new(SliceCursor::new(
                self.evaluate(input, bindings)?,
                *offset,
                *limit,
            ))),
            TupleExpr::Order { input, elements } => {
                let input = self.evaluate(input, bindings)?;
                let strategy = self.clone();
                let exprs: Vec<ValueExpr> = elements.iter().map(|e| e.expr.clone()).collect();
                let key: SortKeyFn = Box::new(move |solution: &BindingSet| -> Result<SortKey> {
                    exprs
                        .iter()
                        .map(|expr| match strategy.evaluate_value(expr, solution) {
                            Ok(value) => Ok(Some(value)),
                            Err(e) if e.is_evaluation_error() => Ok(None),
                            Err(e) => Err(e),
                        })
                        .collect()
                });
                let ascending: Vec<bool> = elements.iter().map(|e| e.ascending).collect();
                let compare: SortCompareFn = Box::new(move |a: &SortKey, b: &SortKey| {
                    a.iter()
                        .zip(b)
                        .zip(&ascending)
                        .map(|((x, y), asc)| {
                            let ordering = compare_terms(x.as_ref(), y.as_ref());
                            if *asc { ordering } else { ordering.reverse() }
                        })
                        .find(|o| o.is_ne())
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                Ok(Box::new(SortCursor::new(input, key, compare)))
            }
            TupleExpr::Group {
                input,
                group_names,
                aggregates,
            } => {
                let inner: BindingSet = group_names
                    .iter()
                    .filter_map(|n| bindings.get(n).map(|v| (Arc::clone(n), v.clone())))
                    .collect();
                let input = self.evaluate(input, &inner)?;
                Ok(Box::new(GroupCursor::new(
                    input,
                    self.clone(),
                    group_names.clone(),
                    aggregates.clone(),
                )))
            }
            TupleExpr::Distinct(input) => {
                Ok(Box::new(DistinctCursor::new(self.evaluate(input, bindings)?)))
            }
            TupleExpr::Reduced(input) => {
                Ok(Box::new(ReducedCursor::new(self.evaluate(input, bindings)?)))
            }
            TupleExpr::SingletonSet => Ok(Box::new(VecCursor::new(vec![bindings.clone()]))),
            TupleExpr::EmptySet => Ok(Box::new(EmptyCursor::new())),
            TupleExpr::BindingSetAssignment { rows, .. } => {
                let rows = rows.iter().filter_map(|row| bindings.merge(row)).collect();
                Ok(Box::new(VecCursor::new(rows)))
            }
        }
    }

    /// Bind joins evaluate `right` with each left solution pre-bound, which
    /// is only sound when that cannot change what `right` produces.
    fn use_hash_join(&self, left: &TupleExpr, right: &TupleExpr) -> bool {
        match self.inner.context.join_algorithm {
            JoinAlgorithm::Hash => true,
            JoinAlgorithm::Bind => false,
            JoinAlgorithm::Auto => {
                right.is_scope_barrier() || right.is_sensitive_to(&left.binding_names())
            }
        }
    }

    fn evaluate_join(
        &self,
        left: &TupleExpr,
        right: &TupleExpr,
        bindings: &BindingSet,
    ) -> Result<BoxCursor<BindingSet>> {
        if self.use_hash_join(left, right) {
            let names = join_names(left, right);
            tracing::trace!(keys = names.len(), "hash join");
            let left = self.evaluate(left, bindings)?;
            let right = self.evaluate(right, bindings)?;
            return Ok(Box::new(HashJoinCursor::new(left, right, names)));
        }
        let left = self.evaluate(left, bindings)?;
        Ok(Box::new(BindJoinCursor::new(left, self.factory(right))))
    }

    fn evaluate_left_join(
        &self,
        left: &TupleExpr,
        right: &TupleExpr,
        condition: Option<&ValueExpr>,
        bindings: &BindingSet,
    ) -> Result<BoxCursor<BindingSet>> {
        let condition = condition.map(|c| self.predicate(c));
        if self.use_hash_join(left, right) {
            let names = join_names(left, right);
            let left = self.evaluate(left, bindings)?;
            let right = self.evaluate(right, bindings)?;
            return Ok(Box::new(HashLeftJoinCursor::new(left, right, names, condition)));
        }
        let left = self.evaluate(left, bindings)?;
        Ok(Box::new(LeftJoinCursor::new(left, self.factory(right), condition)))
    }

    fn evaluate_projection(
        &self,
        input: &TupleExpr,
        elements: &[ProjectionElem],
        bindings: &BindingSet,
    ) -> Result<BoxCursor<BindingSet>> {
        let inner: BindingSet = elements
            .iter()
            .filter_map(|e| bindings.get(&e.target).map(|v| (Arc::clone(&e.source), v.clone())))
            .collect();
        let input = self.evaluate(input, &inner)?;
        let pairs = elements
            .iter()
            .map(|e| (Arc::clone(&e.source), Arc::clone(&e.target)))
            .collect();
        Ok(Box::new(ProjectionCursor::new(input, pairs)))
    }

    /// Builds the per-solution evaluator of a bind join's right operand.
    fn factory(&self, right: &TupleExpr) -> CursorFactory {
        let strategy = self.clone();
        let right = Arc::new(right.clone());
        Box::new(move |solution: &BindingSet| strategy.evaluate(&right, solution))
    }

    fn predicate(&self, condition: &ValueExpr) -> Box<dyn SolutionPredicate> {
        let strategy = self.clone();
        let condition = condition.clone();
        Box::new(move |solution: &BindingSet| strategy.is_true(&condition, solution))
    }

    fn function(&self, expr: &ValueExpr) -> Box<dyn SolutionFunction> {
        let strategy = self.clone();
        let expr = expr.clone();
        Box::new(move |solution: &BindingSet| strategy.evaluate_value(&expr, solution))
    }

    pub(crate) fn source(&self) -> &Arc<dyn TripleSource> {
        &self.inner.source
    }

    /// Returns the compiled regex for `(pattern, flags)`, compiling it on
    /// first use.
    pub(crate) fn cached_regex(
        &self,
        key: (String, String),
        compile: impl FnOnce(&str, &str) -> Result<Regex>,
    ) -> Result<Regex> {
        let mut cache = self.inner.context.regex_cache.lock();
        if let Some(regex) = cache.get(&key) {
            return Ok(regex.clone());
        }
        let regex = compile(&key.0, &key.1)?;
        cache.insert(key, regex.clone());
        Ok(regex)
    }
}

/// Hash join keys: the names both operands bind in every solution.
fn join_names(left: &TupleExpr, right: &TupleExpr) -> Vec<Arc<str>> {
    let right_assured = right.assured_binding_names();
    left.assured_binding_names()
        .into_iter()
        .filter(|n| right_assured.contains(n))
        .collect()
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use memquad_common::types::{Quad, Term};
    use memquad_core::MemoryStore;

    pub fn ex(local: &str) -> Term {
        Term::iri(format!("http://example.org/{local}"))
    }

    /// A store holding `quads`, committed.
    pub fn store_with(quads: &[Quad]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let mut tx = store.begin().unwrap();
        for quad in quads {
            tx.add_statement(quad, true).unwrap();
        }
        tx.commit().unwrap();
        store
    }

    pub fn strategy(store: &Arc<MemoryStore>) -> EvaluationStrategy {
        let source: Arc<dyn TripleSource> = Arc::clone(store) as Arc<dyn TripleSource>;
        EvaluationStrategy::new(source, EvaluationContext::new(0))
    }

    pub fn run(strategy: &EvaluationStrategy, expr: &TupleExpr) -> Vec<BindingSet> {
        let mut cursor = strategy.evaluate(expr, &BindingSet::new()).unwrap();
        memquad_core::execution::collect(&mut cursor).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{ex, run, store_with, strategy};
    use super::*;
    use crate::query::algebra::{
        Aggregate, AggregateKind, CompareOp, GroupElem, OrderElem, StatementPattern, Var,
    };
    use memquad_common::types::{Literal, Quad, Term};

    fn people() -> Vec<Quad> {
        vec![
            Quad::new(ex("alice"), "http://example.org/age", Literal::integer(30)),
            Quad::new(ex("bob"), "http://example.org/age", Literal::integer(25)),
            Quad::new(ex("carol"), "http://example.org/age", Literal::integer(35)),
            Quad::new(ex("alice"), "http://example.org/knows", ex("bob")),
            Quad::new(ex("bob"), "http://example.org/knows", ex("carol")),
        ]
    }

    fn age(s: &str, o: &str) -> TupleExpr {
        TupleExpr::pattern(StatementPattern::new(Var::new(s), Var::constant(ex("age")), Var::new(o)))
    }

    fn knows(s: &str, o: &str) -> TupleExpr {
        TupleExpr::pattern(StatementPattern::new(Var::new(s), Var::constant(ex("knows")), Var::new(o)))
    }

    #[test]
    fn test_bind_and_hash_join_agree() {
        let store = store_with(&people());
        let expr = TupleExpr::join(knows("a", "b"), age("b", "age"));

        let bind = strategy(&store);
        let source: Arc<dyn TripleSource> = store.clone();
        let hash = EvaluationStrategy::new(
            source,
            EvaluationContext::new(1).with_join_algorithm(JoinAlgorithm::Hash),
        );
        let mut a = run(&bind, &expr);
        let mut b = run(&hash, &expr);
        a.sort_by_key(ToString::to_string);
        b.sort_by_key(ToString::to_string);
        assert_eq!(a.len(), 2);
        assert_eq!(a, b);
    }

    #[test]
    fn test_optional_operand_does_not_see_left_bindings() {
        let store = store_with(&[
            Quad::new(ex("a"), "http://example.org/p", ex("b")),
            Quad::new(ex("b"), "http://example.org/q", ex("v1")),
            Quad::new(ex("x"), "http://example.org/r", ex("v2")),
        ]);
        let scan = |s: &str, p: &str, o: &str| {
            TupleExpr::pattern(StatementPattern::new(Var::new(s), Var::constant(ex(p)), Var::new(o)))
        };
        let optional = TupleExpr::left_join(scan("s", "p", "o"), scan("o", "q", "v"), None);
        let other = scan("x", "r", "v");

        let strategy = strategy(&store);
        assert!(strategy.use_hash_join(&other, &optional));
        assert!(!strategy.use_hash_join(&optional, &other));
        assert!(run(&strategy, &TupleExpr::join(optional.clone(), other.clone())).is_empty());
        assert!(run(&strategy, &TupleExpr::join(other, optional)).is_empty());
    }

    #[test]
    fn test_filter_on_outer_name_uses_hash_join() {
        let store = store_with(&people());
        let filtered = TupleExpr::filter(
            knows("b", "c"),
            ValueExpr::compare(
                ValueExpr::var("age"),
                CompareOp::Gt,
                ValueExpr::constant(Literal::integer(0)),
            ),
        );
        let strategy = strategy(&store);
        assert!(strategy.use_hash_join(&age("a", "age"), &filtered));
        // the filter cannot read ?age from the left operand
        assert!(run(&strategy, &TupleExpr::join(age("a", "age"), filtered)).is_empty());
    }

    #[test]
    fn test_optional_keeps_unmatched() {
        let store = store_with(&people());
        let expr = TupleExpr::left_join(age("p", "age"), knows("p", "friend"), None);
        let rows = run(&strategy(&store), &expr);
        assert_eq!(rows.len(), 3);
        let carol = rows.iter().find(|r| r.get("p") == Some(&ex("carol"))).unwrap();
        assert!(!carol.contains("friend"));
    }

    #[test]
    fn test_order_slice_projection() {
        let store = store_with(&people());
        let expr = TupleExpr::slice(
            TupleExpr::project(
                TupleExpr::order(age("p", "age"), vec![OrderElem::desc(ValueExpr::var("age"))]),
                ["p"],
            ),
            0,
            Some(2),
        );
        let rows = run(&strategy(&store), &expr);
        let people: Vec<_> = rows.iter().map(|r| r.get("p").cloned()).collect();
        assert_eq!(people, vec![Some(ex("carol")), Some(ex("alice"))]);
        assert!(rows.iter().all(|r| r.len() == 1));
    }

    #[test]
    fn test_filter_drops_errors() {
        let store = store_with(&people());
        let condition = ValueExpr::compare(
            ValueExpr::math(
                ValueExpr::var("age"),
                crate::query::algebra::MathOp::Div,
                ValueExpr::var("missing"),
            ),
            CompareOp::Gt,
            ValueExpr::constant(Literal::integer(0)),
        );
        let expr = TupleExpr::filter(age("p", "age"), condition);
        assert!(run(&strategy(&store), &expr).is_empty());
    }

    #[test]
    fn test_group_count() {
        let store = store_with(&people());
        let expr = TupleExpr::Group {
            input: Box::new(knows("a", "b")),
            group_names: Vec::new(),
            aggregates: vec![GroupElem {
                name: "n".into(),
                aggregate: Aggregate::count_all(),
            }],
        };
        let rows = run(&strategy(&store), &expr);
        assert_eq!(rows, vec![BindingSet::new().with("n", Literal::integer(2).into())]);

        let sum = TupleExpr::Group {
            input: Box::new(age("p", "age")),
            group_names: Vec::new(),
            aggregates: vec![GroupElem {
                name: "total".into(),
                aggregate: Aggregate::new(AggregateKind::Sum, ValueExpr::var("age")),
            }],
        };
        let rows = run(&strategy(&store), &sum);
        assert_eq!(rows[0].get("total"), Some(&Term::from(Literal::integer(90))));
    }

    #[test]
    fn test_values_merge_with_bindings() {
        let store = store_with(&[]);
        let expr = TupleExpr::BindingSetAssignment {
            names: vec!["x".into()],
            rows: vec![
                BindingSet::new().with("x", ex("a")),
                BindingSet::new().with("x", ex("b")),
            ],
        };
        let bindings = BindingSet::new().with("x", ex("a"));
        let mut cursor = strategy(&store).evaluate(&expr, &bindings).unwrap();
        let rows = memquad_core::execution::collect(&mut cursor).unwrap();
        assert_eq!(rows, vec![bindings]);
    }

    #[test]
    fn test_expired_deadline_interrupts() {
        let store = store_with(&people());
        let source: Arc<dyn TripleSource> = store.clone();
        let context = EvaluationContext::new(2)
            .with_deadline(Some(Deadline::after(std::time::Duration::ZERO)));
        let strategy = EvaluationStrategy::new(source, context);
        let err = strategy.evaluate(&age("p", "a"), &BindingSet::new()).err().unwrap();
        assert!(err.is_interrupted());
    }
}
