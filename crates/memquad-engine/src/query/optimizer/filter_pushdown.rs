//! Filter pushdown.
//!
//! Moves each filter as close to the operand it tests as possible, so
//! non-matching solutions are discarded before they are joined. A filter
//! moves into an operand only when every variable it reads has the same
//! value there as above the operand.

use crate::query::algebra::{NameSet, TupleExpr, ValueExpr};

/// Pushes every filter in the tree down as far as it can go.
pub fn push_filters_down(expr: TupleExpr) -> TupleExpr {
    match expr {
        TupleExpr::Filter { input, condition } => {
            let input = push_filters_down(*input);
            try_push_filter_into(condition, input)
        }
        other => other.map_children(push_filters_down),
    }
}

/// Tries to push `condition` into `expr`, keeping it on top when it cannot
/// move.
fn try_push_filter_into(condition: ValueExpr, expr: TupleExpr) -> TupleExpr {
    // EXISTS reads the full solution at its position
    if condition.contains_exists() {
        return TupleExpr::filter(expr, condition);
    }
    let vars = condition.variables();

    match expr {
        TupleExpr::Join(left, right) => {
            if can_push_into(&vars, &left, &right) {
                TupleExpr::Join(Box::new(try_push_filter_into(condition, *left)), right)
            } else if can_push_into(&vars, &right, &left) {
                TupleExpr::Join(left, Box::new(try_push_filter_into(condition, *right)))
            } else {
                TupleExpr::filter(TupleExpr::Join(left, right), condition)
            }
        }

        // Only the required side; a filter on the optional side would turn
        // dropped matches into unextended solutions
        TupleExpr::LeftJoin {
            left,
            right,
            condition: join_condition,
        } => {
            if can_push_into(&vars, &left, &right) {
                TupleExpr::LeftJoin {
                    left: Box::new(try_push_filter_into(condition, *left)),
                    right,
                    condition: join_condition,
                }
            } else {
                TupleExpr::filter(
                    TupleExpr::LeftJoin {
                        left,
                        right,
                        condition: join_condition,
                    },
                    condition,
                )
            }
        }

        TupleExpr::Union(left, right) => TupleExpr::union(
            try_push_filter_into(condition.clone(), *left),
            try_push_filter_into(condition, *right),
        ),

        TupleExpr::Difference(left, right) => {
            TupleExpr::Difference(Box::new(try_push_filter_into(condition, *left)), right)
        }

        // Filters commute
        TupleExpr::Filter {
            input,
            condition: inner,
        } => TupleExpr::Filter {
            input: Box::new(try_push_filter_into(condition, *input)),
            condition: inner,
        },

        TupleExpr::Extension { input, elements } => {
            if elements.iter().all(|e| !vars.contains(&e.name)) {
                TupleExpr::Extension {
                    input: Box::new(try_push_filter_into(condition, *input)),
                    elements,
                }
            } else {
                TupleExpr::filter(TupleExpr::Extension { input, elements }, condition)
            }
        }

        // Only through names the projection passes on unchanged
        TupleExpr::Projection { input, elements } => {
            let identity = vars
                .iter()
                .all(|v| elements.iter().any(|e| &e.target == v && e.source == e.target));
            if identity {
                TupleExpr::Projection {
                    input: Box::new(try_push_filter_into(condition, *input)),
                    elements,
                }
            } else {
                TupleExpr::filter(TupleExpr::Projection { input, elements }, condition)
            }
        }

        TupleExpr::Order { input, elements } => TupleExpr::Order {
            input: Box::new(try_push_filter_into(condition, *input)),
            elements,
        },
        TupleExpr::Distinct(input) => {
            TupleExpr::Distinct(Box::new(try_push_filter_into(condition, *input)))
        }
        TupleExpr::Reduced(input) => {
            TupleExpr::Reduced(Box::new(try_push_filter_into(condition, *input)))
        }

        // Slices, groups, and leaves keep the filter on top
        other => TupleExpr::filter(other, condition),
    }
}

/// Returns true if a filter reading `vars` can be evaluated inside
/// `target` instead of above its join with `other`.
fn can_push_into(vars: &NameSet, target: &TupleExpr, other: &TupleExpr) -> bool {
    let target_names = target.binding_names();
    if !vars.iter().any(|v| target_names.contains(v)) {
        return false;
    }
    let target_assured = target.assured_binding_names();
    let other_names = other.binding_names();
    vars.iter()
        .all(|v| target_assured.contains(v) || !other_names.contains(v))
}
