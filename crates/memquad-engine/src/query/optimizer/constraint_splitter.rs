//! Conjunctive constraint splitting.

use crate::query::algebra::{TupleExpr, ValueExpr};

/// Splits every `Filter(A && B, X)` into `Filter(A, Filter(B, X))`, so the
/// conjuncts can be pushed down and rewritten independently.
pub fn split_constraints(expr: TupleExpr) -> TupleExpr {
    match expr.map_children(split_constraints) {
        TupleExpr::Filter { input, condition } => {
            let mut conjuncts = Vec::new();
            flatten_and(condition, &mut conjuncts);
            if conjuncts.len() > 1 {
                tracing::trace!(conjuncts = conjuncts.len(), "split filter");
            }
            conjuncts
                .into_iter()
                .rev()
                .fold(*input, TupleExpr::filter)
        }
        other => other,
    }
}

fn flatten_and(expr: ValueExpr, out: &mut Vec<ValueExpr>) {
    match expr {
        ValueExpr::And(left, right) => {
            flatten_and(*left, out);
            flatten_and(*right, out);
        }
        other => out.push(other),
    }
}
