//! Binding assignment.
//!
//! Copies externally supplied bindings into the variable slots that carry
//! the same name, so pattern scans start from constants instead of joining
//! against the bindings later. Projections and groups only pass on the
//! bindings for names they expose.

use crate::query::algebra::TupleExpr;
use memquad_core::BindingSet;
use std::sync::Arc;

/// Inlines `bindings` into every unvalued variable of the same name.
pub fn assign_bindings(mut expr: TupleExpr, bindings: &BindingSet) -> TupleExpr {
    if bindings.is_empty() {
        return expr;
    }
    let mut assigned = 0usize;
    expr.for_each_var_mut(false, &mut |var| {
        if !var.has_value() {
            if let Some(value) = bindings.get(var.name()) {
                var.set_value(value.clone());
                assigned += 1;
            }
        }
    });
    tracing::trace!(assigned, "assigned bindings");
    assign_below_barriers(expr, bindings)
}

/// Finds projections and groups and assigns the bindings they let through.
fn assign_below_barriers(expr: TupleExpr, bindings: &BindingSet) -> TupleExpr {
    match expr {
        TupleExpr::Projection { input, elements } => {
            let inner: BindingSet = elements
                .iter()
                .filter_map(|e| {
                    bindings
                        .get(&e.target)
                        .map(|value| (Arc::clone(&e.source), value.clone()))
                })
                .collect();
            TupleExpr::Projection {
                input: Box::new(assign_bindings(*input, &inner)),
                elements,
            }
        }
        TupleExpr::Group {
            input,
            group_names,
            aggregates,
        } => {
            let inner: BindingSet = group_names
                .iter()
                .filter_map(|n| bindings.get(n).map(|value| (Arc::clone(n), value.clone())))
                .collect();
            TupleExpr::Group {
                input: Box::new(assign_bindings(*input, &inner)),
                group_names,
                aggregates,
            }
        }
        other => other.map_children(|child| assign_below_barriers(child, bindings)),
    }
}
