//! Grouping and aggregation.
//!
//! [`GroupCursor`] is blocking: the first pull drains its input into
//! groups keyed by the values of the group names, in first-seen order.
//! Unbound values are skipped by every aggregate. Any other evaluation
//! error skips the value for `COUNT` and `SAMPLE` and leaves the other
//! aggregates unbound for that group.

use super::EvaluationStrategy;
use super::ordering::compare_terms;
use super::value::Numeric;
use crate::query::algebra::{Aggregate, AggregateKind, GroupElem, MathOp};
use indexmap::IndexMap;
use memquad_common::types::{Literal, Term};
use memquad_common::utils::error::{Error, EvaluationError, Result};
use memquad_common::utils::hash::FxHashSet;
use memquad_core::{BindingSet, BoxCursor, Cursor};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::sync::Arc;

type GroupKey = SmallVec<[Option<Term>; 4]>;

enum Accumulator {
    Count(i64),
    Sum(Numeric),
    Avg { sum: Numeric, count: i64 },
    Min(Option<Term>),
    Max(Option<Term>),
    Sample(Option<Term>),
    GroupConcat { parts: Vec<String>, separator: Arc<str> },
}

struct AggregateState {
    accumulator: Accumulator,
    seen_values: Option<FxHashSet<Term>>,
    seen_rows: Option<FxHashSet<BindingSet>>,
    failed: bool,
}

impl AggregateState {
    fn new(aggregate: &Aggregate) -> Self {
        let accumulator = match &aggregate.kind {
            AggregateKind::Count => Accumulator::Count(0),
            AggregateKind::Sum => Accumulator::Sum(Numeric::Integer(0)),
            AggregateKind::Avg => Accumulator::Avg {
                sum: Numeric::Integer(0),
                count: 0,
            },
            AggregateKind::Min => Accumulator::Min(None),
            AggregateKind::Max => Accumulator::Max(None),
            AggregateKind::Sample => Accumulator::Sample(None),
            AggregateKind::GroupConcat { separator } => Accumulator::GroupConcat {
                parts: Vec::new(),
                separator: Arc::clone(separator),
            },
        };
        let distinct = aggregate.distinct;
        Self {
            accumulator,
            seen_values: (distinct && aggregate.expr.is_some()).then(FxHashSet::default),
            seen_rows: (distinct && aggregate.expr.is_none()).then(FxHashSet::default),
            failed: false,
        }
    }

    fn feed(&mut self, aggregate: &Aggregate, strategy: &EvaluationStrategy, row: &BindingSet) -> Result<()> {
        if self.failed {
            return Ok(());
        }
        let Some(expr) = &aggregate.expr else {
            // COUNT(*)
            if let Some(seen) = &mut self.seen_rows {
                if !seen.insert(row.clone()) {
                    return Ok(());
                }
            }
            if let Accumulator::Count(count) = &mut self.accumulator {
                *count += 1;
            }
            return Ok(());
        };

        let value = match strategy.evaluate_value(expr, row) {
            Ok(value) => value,
            Err(Error::Evaluation(EvaluationError::UnboundVariable(_))) => return Ok(()),
            Err(e) if e.is_evaluation_error() => {
                if !matches!(self.accumulator, Accumulator::Count(_) | Accumulator::Sample(_)) {
                    tracing::trace!(error = %e, "aggregate failed");
                    self.failed = true;
                }
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        if let Some(seen) = &mut self.seen_values {
            if !seen.insert(value.clone()) {
                return Ok(());
            }
        }
        if let Err(e) = self.accumulate(value) {
            if !e.is_evaluation_error() {
                return Err(e);
            }
            tracing::trace!(error = %e, "aggregate failed");
            self.failed = true;
        }
        Ok(())
    }

    fn accumulate(&mut self, value: Term) -> Result<()> {
        match &mut self.accumulator {
            Accumulator::Count(count) => *count += 1,
            Accumulator::Sum(sum) => {
                *sum = Numeric::apply(MathOp::Add, *sum, Numeric::from_term(&value)?)?;
            }
            Accumulator::Avg { sum, count } => {
                *sum = Numeric::apply(MathOp::Add, *sum, Numeric::from_term(&value)?)?;
                *count += 1;
            }
            Accumulator::Min(best) => keep_if(best, value, Ordering::Less),
            Accumulator::Max(best) => keep_if(best, value, Ordering::Greater),
            Accumulator::Sample(sample) => {
                sample.get_or_insert(value);
            }
            Accumulator::GroupConcat { parts, .. } => match &value {
                Term::Literal(literal) => parts.push(literal.value().to_string()),
                Term::Iri(iri) => parts.push(iri.as_str().to_string()),
                other => {
                    return Err(super::value::mismatch("literal or IRI", other).into());
                }
            },
        }
        Ok(())
    }

    fn finish(self) -> Result<Option<Term>> {
        if self.failed {
            return Ok(None);
        }
        Ok(match self.accumulator {
            Accumulator::Count(count) => Some(Literal::integer(count).into()),
            Accumulator::Sum(sum) => Some(sum.to_term()),
            Accumulator::Avg { count: 0, .. } => Some(Literal::integer(0).into()),
            Accumulator::Avg { sum, count } => {
                match Numeric::apply(MathOp::Div, sum, Numeric::Integer(count)) {
                    Ok(avg) => Some(avg.to_term()),
                    Err(e) if e.is_evaluation_error() => None,
                    Err(e) => return Err(e),
                }
            }
            Accumulator::Min(value) | Accumulator::Max(value) | Accumulator::Sample(value) => value,
            Accumulator::GroupConcat { parts, separator } => {
                Some(Term::literal(parts.join(&*separator)))
            }
        })
    }
}

fn keep_if(best: &mut Option<Term>, candidate: Term, wanted: Ordering) {
    let replace = best
        .as_ref()
        .is_none_or(|current| compare_terms(Some(&candidate), Some(current)) == wanted);
    if replace {
        *best = Some(candidate);
    }
}

struct Group {
    bindings: BindingSet,
    states: Vec<AggregateState>,
}

/// Groups its input and computes aggregates per group.
///
/// With no group names, an empty input still yields one solution.
pub struct GroupCursor {
    input: BoxCursor<BindingSet>,
    strategy: EvaluationStrategy,
    group_names: Vec<Arc<str>>,
    aggregates: Vec<GroupElem>,
    output: Option<std::vec::IntoIter<BindingSet>>,
    closed: bool,
}

impl GroupCursor {
    /// Creates a grouping cursor.
    pub fn new(
        input: BoxCursor<BindingSet>,
        strategy: EvaluationStrategy,
        group_names: Vec<Arc<str>>,
        aggregates: Vec<GroupElem>,
    ) -> Self {
        Self {
            input,
            strategy,
            group_names,
            aggregates,
            output: None,
            closed: false,
        }
    }

    fn new_group(&self, row: &BindingSet) -> Group {
        let bindings = self
            .group_names
            .iter()
            .filter_map(|n| row.get(n).map(|v| (Arc::clone(n), v.clone())))
            .collect();
        let states = self
            .aggregates
            .iter()
            .map(|a| AggregateState::new(&a.aggregate))
            .collect();
        Group { bindings, states }
    }

    fn materialize(&mut self) -> Result<Vec<BindingSet>> {
        let mut groups: IndexMap<GroupKey, Group> = IndexMap::new();
        while let Some(row) = self.input.next()? {
            let key = row.key(&self.group_names);
            if !groups.contains_key(&key) {
                let group = self.new_group(&row);
                groups.insert(key.clone(), group);
            }
            if let Some(group) = groups.get_mut(&key) {
                for (state, elem) in group.states.iter_mut().zip(&self.aggregates) {
                    state.feed(&elem.aggregate, &self.strategy, &row)?;
                }
            }
        }
        self.input.close();

        if groups.is_empty() && self.group_names.is_empty() {
            let group = self.new_group(&BindingSet::new());
            groups.insert(GroupKey::new(), group);
        }

        let mut output = Vec::with_capacity(groups.len());
        for group in groups.into_values() {
            let mut solution = group.bindings;
            for (state, elem) in group.states.into_iter().zip(&self.aggregates) {
                if let Some(value) = state.finish()? {
                    solution.insert(Arc::clone(&elem.name), value);
                }
            }
            output.push(solution);
        }
        tracing::trace!(groups = output.len(), "grouped input");
        Ok(output)
    }
}

impl Cursor for GroupCursor {
    type Item = BindingSet;

    fn next(&mut self) -> Result<Option<BindingSet>> {
        if self.closed {
            return Ok(None);
        }
        if self.output.is_none() {
            let rows = self.materialize()?;
            self.output = Some(rows.into_iter());
        }
        Ok(self.output.as_mut().and_then(Iterator::next))
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.output = None;
            self.input.close();
        }
    }

    fn name(&self) -> &'static str {
        "Group"
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{ex, store_with, strategy};
    use super::*;
    use crate::query::algebra::ValueExpr;
    use memquad_common::vocab::xsd;
    use memquad_core::execution::collect;
    use memquad_core::execution::operators::VecCursor;

    fn rows() -> Vec<BindingSet> {
        let row = |g: &str, v: i64| BindingSet::new().with("g", ex(g)).with("v", Literal::integer(v).into());
        vec![row("a", 1), row("b", 10), row("a", 3), row("a", 3), BindingSet::new().with("g", ex("b"))]
    }

    fn group(names: &[&str], aggregates: Vec<(&str, Aggregate)>, input: Vec<BindingSet>) -> Vec<BindingSet> {
        let strategy = strategy(&store_with(&[]));
        let mut cursor = GroupCursor::new(
            Box::new(VecCursor::new(input)),
            strategy,
            names.iter().map(|n| Arc::from(*n)).collect(),
            aggregates
                .into_iter()
                .map(|(name, aggregate)| GroupElem {
                    name: name.into(),
                    aggregate,
                })
                .collect(),
        );
        collect(&mut cursor).unwrap()
    }

    #[test]
    fn test_group_by_with_aggregates() {
        let out = group(
            &["g"],
            vec![
                ("n", Aggregate::count_all()),
                ("sum", Aggregate::new(AggregateKind::Sum, ValueExpr::var("v"))),
                ("distinct", Aggregate::new(AggregateKind::Count, ValueExpr::var("v")).distinct()),
                ("max", Aggregate::new(AggregateKind::Max, ValueExpr::var("v"))),
            ],
            rows(),
        );
        assert_eq!(out.len(), 2);
        let a = &out[0];
        assert_eq!(a.get("g"), Some(&ex("a")));
        assert_eq!(a.get("n"), Some(&Literal::integer(3).into()));
        assert_eq!(a.get("sum"), Some(&Literal::integer(7).into()));
        assert_eq!(a.get("distinct"), Some(&Literal::integer(2).into()));
        assert_eq!(a.get("max"), Some(&Literal::integer(3).into()));

        let b = &out[1];
        assert_eq!(b.get("n"), Some(&Literal::integer(2).into()));
        assert_eq!(b.get("sum"), Some(&Literal::integer(10).into()));
    }

    #[test]
    fn test_empty_input_without_group_names() {
        let out = group(&[], vec![("n", Aggregate::count_all())], Vec::new());
        assert_eq!(out, vec![BindingSet::new().with("n", Literal::integer(0).into())]);

        let grouped = group(&["g"], vec![("n", Aggregate::count_all())], Vec::new());
        assert!(grouped.is_empty());
    }

    #[test]
    fn test_avg_and_concat() {
        let out = group(
            &[],
            vec![
                ("avg", Aggregate::new(AggregateKind::Avg, ValueExpr::var("v"))),
                (
                    "all",
                    Aggregate::new(
                        AggregateKind::GroupConcat {
                            separator: Arc::from(","),
                        },
                        ValueExpr::var("v"),
                    ),
                ),
            ],
            rows(),
        );
        assert_eq!(out[0].get("avg"), Some(&Term::typed_literal("4.25", xsd::DECIMAL)));
        assert_eq!(out[0].get("all"), Some(&Term::literal("1,10,3,3")));
    }

    #[test]
    fn test_error_leaves_aggregate_unbound() {
        let input = vec![
            BindingSet::new().with("v", Literal::integer(1).into()),
            BindingSet::new().with("v", Term::literal("x")),
        ];
        let out = group(
            &[],
            vec![
                ("sum", Aggregate::new(AggregateKind::Sum, ValueExpr::var("v"))),
                ("sample", Aggregate::new(AggregateKind::Sample, ValueExpr::var("v"))),
            ],
            input,
        );
        assert!(!out[0].contains("sum"));
        assert_eq!(out[0].get("sample"), Some(&Literal::integer(1).into()));
    }
}
