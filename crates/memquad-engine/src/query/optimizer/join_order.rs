//! Greedy join ordering.
//!
//! Flattens each join tree into its operands and rebuilds it left-deep,
//! repeatedly picking the cheapest remaining operand given the names bound
//! by the operands already picked. Ties keep the original order.
//!
//! The cost of a statement pattern is `2^n` where `n` is the number of
//! slots that are neither fixed nor bound by an earlier operand.
//!
//! An operand that binds a name some other operand binds only optionally
//! is never picked ahead of that operand.

use crate::query::algebra::{NameSet, Scope, StatementPattern, TupleExpr};

/// Reorders the operands of every join in the tree.
pub fn reorder_joins(expr: TupleExpr) -> TupleExpr {
    match expr {
        join @ TupleExpr::Join(..) => {
            let mut operands = Vec::new();
            flatten_join(join, &mut operands);
            let operands = operands.into_iter().map(reorder_joins).collect();
            order_greedily(operands)
        }
        other => other.map_children(reorder_joins),
    }
}

fn flatten_join(expr: TupleExpr, out: &mut Vec<TupleExpr>) {
    match expr {
        TupleExpr::Join(left, right) => {
            flatten_join(*left, out);
            flatten_join(*right, out);
        }
        other => out.push(other),
    }
}

fn order_greedily(mut remaining: Vec<TupleExpr>) -> TupleExpr {
    let mut bound = NameSet::new();
    let mut ordered: Option<TupleExpr> = None;

    while !remaining.is_empty() {
        let waiting: Vec<bool> = (0..remaining.len())
            .map(|i| must_wait(&remaining, i))
            .collect();
        // a cycle of optional operands falls back to cost alone
        let all_waiting = waiting.iter().all(|w| *w);

        let mut best = 0;
        let mut best_cost = f64::INFINITY;
        for (i, operand) in remaining.iter().enumerate() {
            if waiting[i] && !all_waiting {
                continue;
            }
            let cost = estimate_cost(operand, &bound);
            if cost < best_cost {
                best = i;
                best_cost = cost;
            }
        }
        let chosen = remaining.remove(best);
        tracing::trace!(cost = best_cost, "picked join operand");
        bound.extend(chosen.binding_names());
        ordered = Some(match ordered {
            Some(left) => TupleExpr::join(left, chosen),
            None => chosen,
        });
    }

    ordered.unwrap_or(TupleExpr::SingletonSet)
}

/// Returns true if `remaining[i]` binds a name that another remaining
/// operand binds only optionally. Such an operand stays after the optional
/// one so the optional side is never evaluated with that name pre-bound.
fn must_wait(remaining: &[TupleExpr], i: usize) -> bool {
    let names = remaining[i].binding_names();
    remaining.iter().enumerate().any(|(j, other)| {
        j != i
            && other
                .optional_binding_names()
                .iter()
                .any(|n| names.contains(n))
    })
}

/// Estimates the number of solutions `expr` produces when the names in
/// `bound` are already bound.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn estimate_cost(expr: &TupleExpr, bound: &NameSet) -> f64 {
    match expr {
        TupleExpr::StatementPattern(pattern) => pattern_cost(pattern, bound),
        TupleExpr::Join(left, right)
        | TupleExpr::LeftJoin { left, right, .. }
        | TupleExpr::Intersection(left, right) => {
            let mut inner = bound.clone();
            inner.extend(left.binding_names());
            estimate_cost(left, bound) * estimate_cost(right, &inner)
        }
        TupleExpr::Union(left, right) => estimate_cost(left, bound) + estimate_cost(right, bound),
        TupleExpr::Difference(left, _) => estimate_cost(left, bound),
        TupleExpr::Filter { input, .. }
        | TupleExpr::Projection { input, .. }
        | TupleExpr::Extension { input, .. }
        | TupleExpr::Slice { input, .. }
        | TupleExpr::Order { input, .. }
        | TupleExpr::Group { input, .. }
        | TupleExpr::Distinct(input)
        | TupleExpr::Reduced(input) => estimate_cost(input, bound),
        TupleExpr::SingletonSet => 1.0,
        TupleExpr::EmptySet => 0.0,
        TupleExpr::BindingSetAssignment { rows, .. } => rows.len() as f64,
    }
}

fn pattern_cost(pattern: &StatementPattern, bound: &NameSet) -> f64 {
    let context = match pattern.scope {
        Scope::Named => pattern.context.as_ref(),
        Scope::Default => None,
    };
    let unbound = [
        Some(&pattern.subject),
        Some(&pattern.predicate),
        Some(&pattern.object),
        context,
    ]
    .into_iter()
    .flatten()
    .filter(|v| !v.has_value() && !bound.contains(v.name()))
    .count();
    // at most four slots
    f64::from(1u32 << unbound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::algebra::Var;
    use memquad_common::types::Term;
    use memquad_core::BindingSet;

    fn ex(local: &str) -> Term {
        Term::iri(format!("http://example.org/{local}"))
    }

    fn scan(s: &str, p: Option<&str>, o: &str) -> TupleExpr {
        let predicate = match p {
            Some(p) => Var::constant(ex(p)),
            None => Var::new("p"),
        };
        TupleExpr::pattern(StatementPattern::new(Var::new(s), predicate, Var::new(o)))
    }

    #[test]
    fn test_pattern_cost() {
        let bound = NameSet::new();
        assert!((estimate_cost(&scan("s", None, "o"), &bound) - 8.0).abs() < f64::EPSILON);
        assert!((estimate_cost(&scan("s", Some("p"), "o"), &bound) - 4.0).abs() < f64::EPSILON);

        let mut bound = NameSet::new();
        bound.insert("s".into());
        assert!((estimate_cost(&scan("s", Some("p"), "o"), &bound) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_selective_operand_first() {
        let broad = scan("s", None, "o");
        let narrow = TupleExpr::pattern(StatementPattern::new(
            Var::constant(ex("alice")),
            Var::constant(ex("name")),
            Var::new("n"),
        ));
        let follow = scan("n", Some("label"), "l");
        let expr = TupleExpr::join(TupleExpr::join(broad.clone(), follow.clone()), narrow.clone());

        let expected = TupleExpr::join(TupleExpr::join(narrow, follow), broad);
        assert_eq!(reorder_joins(expr), expected);
    }

    #[test]
    fn test_ties_keep_order() {
        let a = scan("a", Some("p"), "x");
        let b = scan("b", Some("q"), "y");
        let expr = TupleExpr::join(a, b);
        assert_eq!(reorder_joins(expr.clone()), expr);
    }

    #[test]
    fn test_optional_operand_stays_ahead() {
        let optional = TupleExpr::left_join(scan("s", Some("p"), "o"), scan("o", Some("q"), "v"), None);
        let cheap = TupleExpr::pattern(StatementPattern::new(
            Var::new("x"),
            Var::constant(ex("r")),
            Var::constant(ex("v2")),
        ));
        let binds_v = scan("x", Some("r"), "v");

        let expr = TupleExpr::join(optional.clone(), binds_v.clone());
        assert_eq!(reorder_joins(expr.clone()), expr);

        // unrelated operands still move ahead
        let expr = TupleExpr::join(optional.clone(), cheap.clone());
        assert_eq!(reorder_joins(expr), TupleExpr::join(cheap, optional));
    }

    #[test]
    fn test_empty_and_values_go_first() {
        let values = TupleExpr::BindingSetAssignment {
            names: vec!["s".into()],
            rows: vec![BindingSet::new().with("s", ex("a"))],
        };
        let expr = TupleExpr::join(scan("s", Some("p"), "o"), values.clone());
        let TupleExpr::Join(first, _) = reorder_joins(expr) else {
            panic!("expected a join");
        };
        assert_eq!(*first, values);
    }
}
