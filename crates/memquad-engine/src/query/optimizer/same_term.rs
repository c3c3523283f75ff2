//! `sameTerm` filter rewriting.
//!
//! - `sameTerm(?x, <c>)` fixes `?x` to `<c>` in the filtered subtree and
//!   keeps the filter for solutions where `?x` is optional
//! - `sameTerm(?x, ?y)` renames `?y` to `?x` when both are bound in every
//!   solution, then re-binds `?y` with an extension
//! - A variable the subtree never binds makes the filter false everywhere
//!
//! Variables with a fixed value and names bound externally count as
//! constants.

use crate::query::algebra::{ExtensionElem, TupleExpr, ValueExpr, Var};
use memquad_common::types::Term;
use memquad_core::BindingSet;
use std::sync::Arc;

enum Operand {
    Var(Arc<str>),
    Constant(Term),
    Other,
}

impl Operand {
    fn of(expr: &ValueExpr, bindings: &BindingSet) -> Self {
        match expr {
            ValueExpr::Constant(term) => Operand::Constant(term.clone()),
            ValueExpr::Var(var) => match var.value().or_else(|| bindings.get(var.name())) {
                Some(value) => Operand::Constant(value.clone()),
                None => Operand::Var(Arc::clone(var.name())),
            },
            _ => Operand::Other,
        }
    }
}

/// Rewrites every `Filter(sameTerm(a, b))` in the tree.
pub fn rewrite_same_term(expr: TupleExpr, bindings: &BindingSet) -> TupleExpr {
    match expr.map_children(|child| rewrite_same_term(child, bindings)) {
        TupleExpr::Filter {
            input,
            condition: ValueExpr::SameTerm(left, right),
        } => rewrite(*input, *left, *right, bindings),
        other => other,
    }
}

fn rewrite(mut input: TupleExpr, left: ValueExpr, right: ValueExpr, bindings: &BindingSet) -> TupleExpr {
    let operands = (Operand::of(&left, bindings), Operand::of(&right, bindings));
    let keep = |input: TupleExpr, left: ValueExpr, right: ValueExpr| {
        TupleExpr::filter(input, ValueExpr::same_term(left, right))
    };

    match operands {
        (Operand::Constant(a), Operand::Constant(b)) => {
            if a == b {
                tracing::trace!(term = %a, "dropped constant sameTerm filter");
                input
            } else {
                TupleExpr::EmptySet
            }
        }
        (Operand::Var(name), Operand::Constant(value))
        | (Operand::Constant(value), Operand::Var(name)) => {
            if !input.binding_names().contains(&name) {
                return TupleExpr::EmptySet;
            }
            input.for_each_var_mut(false, &mut |var| {
                if var.name() == &name && !var.has_value() {
                    var.set_value(value.clone());
                }
            });
            tracing::trace!(var = %name, term = %value, "bound sameTerm constant");
            keep(input, left, right)
        }
        (Operand::Var(x), Operand::Var(y)) => {
            let names = input.binding_names();
            if !names.contains(&x) || !names.contains(&y) {
                return TupleExpr::EmptySet;
            }
            let assured = input.assured_binding_names();
            if x == y || !assured.contains(&x) || !assured.contains(&y) || input.has_scoped_names() {
                return keep(input, left, right);
            }
            input.for_each_var_mut(true, &mut |var| {
                if var.name() == &y {
                    var.rename(Arc::clone(&x));
                }
            });
            tracing::trace!(from = %y, to = %x, "renamed sameTerm variable");
            TupleExpr::Extension {
                input: Box::new(input),
                elements: vec![ExtensionElem {
                    name: y,
                    expr: ValueExpr::Var(Var::new(x)),
                }],
            }
        }
        _ => keep(input, left, right),
    }
}
