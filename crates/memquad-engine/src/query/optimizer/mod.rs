//! Query optimizer.
//!
//! Rewrites an algebra tree before evaluation. Each pass consumes a
//! [`TupleExpr`] and returns the rewritten tree, in this order:
//!
//! - **Binding Assignment**: Inlines externally supplied bindings into
//!   variable slots
//! - **Constraint Splitting**: Turns `Filter(A && B)` into a filter chain
//! - **Same-Term Rewriting**: Replaces `sameTerm` filters with renames,
//!   constants, or the empty set
//! - **Filter Pushdown**: Moves filters next to the operands they test
//! - **Join Reordering**: Orders join operands by estimated selectivity
//!
//! ## Submodules
//!
//! - [`binding_assigner`] - Binding assignment
//! - [`constraint_splitter`] - Conjunctive constraint splitting
//! - [`same_term`] - `sameTerm` filter rewriting
//! - [`filter_pushdown`] - Filter pushdown
//! - [`join_order`] - Greedy join ordering and its cost function

pub mod binding_assigner;
pub mod constraint_splitter;
pub mod filter_pushdown;
pub mod join_order;
pub mod same_term;

pub use binding_assigner::assign_bindings;
pub use constraint_splitter::split_constraints;
pub use filter_pushdown::push_filters_down;
pub use join_order::{estimate_cost, reorder_joins};
pub use same_term::rewrite_same_term;

use crate::config::OptimizerConfig;
use crate::query::algebra::TupleExpr;
use memquad_common::utils::error::Result;
use memquad_core::BindingSet;

/// Runs the configured rewrite passes over a query tree.
#[derive(Debug, Clone, Default)]
pub struct Optimizer {
    config: OptimizerConfig,
}

impl Optimizer {
    /// Creates an optimizer with every pass enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an optimizer running the given passes.
    #[must_use]
    pub fn with_config(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Enables or disables filter pushdown.
    pub fn with_filter_pushdown(mut self, enabled: bool) -> Self {
        self.config.filter_pushdown = enabled;
        self
    }

    /// Enables or disables join reordering.
    pub fn with_join_reorder(mut self, enabled: bool) -> Self {
        self.config.join_reordering = enabled;
        self
    }

    /// Returns the pass configuration.
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Optimizes a query tree evaluated under `bindings`.
    ///
    /// # Errors
    ///
    /// Returns an error if a pass fails.
    pub fn optimize(&self, expr: TupleExpr, bindings: &BindingSet) -> Result<TupleExpr> {
        let mut root = expr;

        if self.config.binding_assignment {
            root = assign_bindings(root, bindings);
        }
        if self.config.constraint_splitting {
            root = split_constraints(root);
        }
        if self.config.same_term {
            root = rewrite_same_term(root, bindings);
        }
        if self.config.filter_pushdown {
            root = push_filters_down(root);
        }
        if self.config.join_reordering {
            root = reorder_joins(root);
        }

        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::algebra::{StatementPattern, ValueExpr, Var};
    use memquad_common::types::Term;

    fn ex(local: &str) -> Term {
        Term::iri(format!("http://example.org/{local}"))
    }

    #[test]
    fn test_disabled_optimizer_is_identity() {
        let expr = TupleExpr::filter(
            TupleExpr::join(
                TupleExpr::pattern(StatementPattern::new(Var::new("s"), Var::new("p"), Var::new("o"))),
                TupleExpr::pattern(StatementPattern::new(
                    Var::new("s"),
                    Var::constant(ex("name")),
                    Var::new("n"),
                )),
            ),
            ValueExpr::and(ValueExpr::var("s"), ValueExpr::var("n")),
        );
        let optimizer = Optimizer::with_config(OptimizerConfig::disabled());
        let optimized = optimizer.optimize(expr.clone(), &BindingSet::new()).unwrap();
        assert_eq!(optimized, expr);
    }

    #[test]
    fn test_full_pipeline_reorders_and_pushes() {
        let broad = TupleExpr::pattern(StatementPattern::new(Var::new("s"), Var::new("p"), Var::new("o")));
        let narrow = TupleExpr::pattern(StatementPattern::new(
            Var::new("s"),
            Var::constant(ex("name")),
            Var::new("n"),
        ));
        let expr = TupleExpr::filter(
            TupleExpr::join(broad.clone(), narrow.clone()),
            ValueExpr::Bound(Var::new("n")),
        );
        let optimized = Optimizer::new().optimize(expr, &BindingSet::new()).unwrap();

        let expected = TupleExpr::join(
            TupleExpr::filter(narrow, ValueExpr::Bound(Var::new("n"))),
            broad,
        );
        assert_eq!(optimized, expected);
    }
}
