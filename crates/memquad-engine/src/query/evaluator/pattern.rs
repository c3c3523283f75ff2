//! Statement pattern scans.
//!
//! A pattern becomes a [`QuadPattern`] lookup using every slot that has a
//! value, either fixed in the tree or bound by the incoming solution. Each
//! matching quad extends the incoming solution with the remaining slots.
//! A variable occurring in several slots must match the same term in all
//! of them.

use super::EvaluationStrategy;
use crate::query::algebra::{Scope, StatementPattern, Var};
use memquad_common::types::{Quad, Term};
use memquad_common::utils::error::Result;
use memquad_core::execution::operators::{EmptyCursor, MapCursor};
use memquad_core::{BindingSet, BoxCursor, QuadPattern};
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
enum Slot {
    Subject,
    Predicate,
    Object,
    Context,
}

impl Slot {
    fn of(self, quad: &Quad) -> Option<Term> {
        match self {
            Slot::Subject => Some(quad.subject.clone()),
            Slot::Predicate => Some(quad.predicate_term()),
            Slot::Object => Some(quad.object.clone()),
            Slot::Context => quad.context.clone(),
        }
    }
}

impl EvaluationStrategy {
    /// Scans the statements matching `pattern` under `bindings`.
    pub(crate) fn evaluate_pattern(
        &self,
        pattern: &StatementPattern,
        bindings: &BindingSet,
    ) -> Result<BoxCursor<BindingSet>> {
        let value_of = |var: &Var| var.value().or_else(|| bindings.get(var.name())).cloned();
        let context_value = pattern.context.as_ref().and_then(value_of);

        let Some((contexts, named_only)) = self.contexts_for(pattern.scope, context_value) else {
            tracing::trace!(pattern = %PatternDisplay(pattern), "dataset excludes pattern");
            return Ok(Box::new(EmptyCursor::new()));
        };

        let context = self.context();
        let mut lookup = QuadPattern::any()
            .with_contexts(contexts)
            .explicit_only(!context.include_inferred)
            .read_mode(context.read_mode);
        lookup.subject = value_of(&pattern.subject);
        lookup.predicate = value_of(&pattern.predicate);
        lookup.object = value_of(&pattern.object);
        if named_only {
            lookup = lookup.named_contexts_only();
        }

        let mut slots: Vec<(Arc<str>, Slot)> = vec![
            (&pattern.subject, Slot::Subject),
            (&pattern.predicate, Slot::Predicate),
            (&pattern.object, Slot::Object),
        ]
        .into_iter()
        .filter(|(var, _)| var.is_bindable())
        .map(|(var, slot)| (Arc::clone(var.name()), slot))
        .collect();
        if pattern.scope == Scope::Named {
            if let Some(var) = pattern.context.as_ref().filter(|v| v.is_bindable()) {
                slots.push((Arc::clone(var.name()), Slot::Context));
            }
        }

        let statements = self.source().statements(&lookup)?;
        let base = bindings.clone();
        Ok(Box::new(MapCursor::new(statements, move |quad: Quad| {
            Ok(bind_statement(&base, &slots, &quad))
        })))
    }

    /// Resolves the contexts a pattern may read: `None` if the dataset
    /// rules out every statement, otherwise the allowed contexts (empty
    /// for all) and whether the null context is excluded.
    fn contexts_for(&self, scope: Scope, context: Option<Term>) -> Option<(Vec<Option<Term>>, bool)> {
        let dataset = self.context().dataset();
        match (scope, dataset) {
            (Scope::Default, None) => Some((context.map(Some).into_iter().collect(), false)),
            (Scope::Named, None) => Some((context.map(Some).into_iter().collect(), true)),
            (Scope::Default, Some(dataset)) => {
                let graphs = dataset.default_contexts();
                match context {
                    _ if graphs.is_empty() => None,
                    Some(c) if dataset.has_default_context(Some(&c)) => Some((vec![Some(c)], false)),
                    Some(_) => None,
                    None => Some((graphs, false)),
                }
            }
            (Scope::Named, Some(dataset)) => {
                let graphs = dataset.named_contexts();
                match context {
                    _ if graphs.is_empty() => None,
                    Some(c) if dataset.has_named_context(&c) => Some((vec![Some(c)], true)),
                    Some(_) => None,
                    None => Some((graphs, true)),
                }
            }
        }
    }
}

/// Extends `base` with the slots of `quad`, or `None` if a name is already
/// bound to a different term.
fn bind_statement(base: &BindingSet, slots: &[(Arc<str>, Slot)], quad: &Quad) -> Option<BindingSet> {
    let mut solution = base.clone();
    for (name, slot) in slots {
        let value = slot.of(quad)?;
        match solution.get(name) {
            Some(existing) if *existing != value => return None,
            Some(_) => {}
            None => solution.insert(Arc::clone(name), value),
        }
    }
    Some(solution)
}

struct PatternDisplay<'a>(&'a StatementPattern);

impl std::fmt::Display for PatternDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let p = self.0;
        write!(f, "({} {} {}", p.subject, p.predicate, p.object)?;
        if let Some(context) = &p.context {
            write!(f, " {context}")?;
        }
        f.write_str(")")
    }
}
