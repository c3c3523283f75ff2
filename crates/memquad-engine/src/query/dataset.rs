//! Graph restrictions for a query.

use indexmap::IndexSet;
use memquad_common::types::{Iri, Term};

/// The default and named graphs a query may read.
///
/// A default graph entry of `None` stands for the null context. A query
/// without a dataset reads every context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    default_graphs: IndexSet<Option<Iri>>,
    named_graphs: IndexSet<Iri>,
}

impl Dataset {
    /// Creates a dataset with no graphs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a graph to the default graph.
    #[must_use]
    pub fn with_default_graph(mut self, graph: impl Into<Iri>) -> Self {
        self.default_graphs.insert(Some(graph.into()));
        self
    }

    /// Adds the null context to the default graph.
    #[must_use]
    pub fn with_null_context(mut self) -> Self {
        self.default_graphs.insert(None);
        self
    }

    /// Adds a named graph.
    #[must_use]
    pub fn with_named_graph(mut self, graph: impl Into<Iri>) -> Self {
        self.named_graphs.insert(graph.into());
        self
    }

    /// Returns the default graphs.
    pub fn default_graphs(&self) -> impl Iterator<Item = Option<&Iri>> {
        self.default_graphs.iter().map(Option::as_ref)
    }

    /// Returns the named graphs.
    pub fn named_graphs(&self) -> impl Iterator<Item = &Iri> {
        self.named_graphs.iter()
    }

    /// Returns the default graphs as store contexts.
    pub(crate) fn default_contexts(&self) -> Vec<Option<Term>> {
        self.default_graphs
            .iter()
            .map(|g| g.clone().map(Term::Iri))
            .collect()
    }

    /// Returns the named graphs as store contexts.
    pub(crate) fn named_contexts(&self) -> Vec<Option<Term>> {
        self.named_graphs
            .iter()
            .map(|g| Some(Term::Iri(g.clone())))
            .collect()
    }

    /// Returns true if `context` is one of the default graphs.
    pub(crate) fn has_default_context(&self, context: Option<&Term>) -> bool {
        match context {
            None => self.default_graphs.contains(&None),
            Some(Term::Iri(iri)) => self.default_graphs.contains(&Some(iri.clone())),
            Some(_) => false,
        }
    }

    /// Returns true if `context` is one of the named graphs.
    pub(crate) fn has_named_context(&self, context: &Term) -> bool {
        context.as_iri().is_some_and(|iri| self.named_graphs.contains(iri))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contexts() {
        let dataset = Dataset::new()
            .with_default_graph("http://example.org/g1")
            .with_null_context()
            .with_named_graph("http://example.org/g2");

        assert_eq!(
            dataset.default_contexts(),
            vec![Some(Term::iri("http://example.org/g1")), None]
        );
        assert!(dataset.has_default_context(None));
        assert!(!dataset.has_default_context(Some(&Term::iri("http://example.org/g2"))));
        assert!(dataset.has_named_context(&Term::iri("http://example.org/g2")));
        assert_eq!(dataset.named_graphs().count(), 1);
    }
}
