//! Binding sets (solutions).

use memquad_common::types::Term;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// A partial mapping from variable names to terms.
///
/// Entries are kept sorted by name, so two binding sets with the same
/// mappings are equal and hash the same regardless of insertion order. A
/// name is either bound to a term or absent; there is no null binding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BindingSet {
    bindings: SmallVec<[(Arc<str>, Term); 8]>,
}

impl BindingSet {
    /// Creates an empty binding set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Result<usize, usize> {
        self.bindings.binary_search_by(|(n, _)| (**n).cmp(name))
    }

    /// Returns the term bound to `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Term> {
        self.position(name).ok().map(|idx| &self.bindings[idx].1)
    }

    /// Returns true if `name` is bound.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_ok()
    }

    /// Binds `name`, replacing any previous binding.
    pub fn insert(&mut self, name: impl Into<Arc<str>>, value: Term) {
        let name = name.into();
        match self.position(&name) {
            Ok(idx) => self.bindings[idx].1 = value,
            Err(idx) => self.bindings.insert(idx, (name, value)),
        }
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: impl Into<Arc<str>>, value: Term) -> Self {
        self.insert(name, value);
        self
    }

    /// Unbinds `name`, returning its previous value.
    pub fn remove(&mut self, name: &str) -> Option<Term> {
        self.position(name)
            .ok()
            .map(|idx| self.bindings.remove(idx).1)
    }

    /// Returns the number of bound names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Iterates over the bound names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &Arc<str>> {
        self.bindings.iter().map(|(n, _)| n)
    }

    /// Iterates over `(name, term)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&Arc<str>, &Term)> {
        self.bindings.iter().map(|(n, t)| (n, t))
    }

    /// Returns true if every name bound in both sets is bound to the same term.
    #[must_use]
    pub fn is_compatible(&self, other: &BindingSet) -> bool {
        other
            .iter()
            .all(|(name, value)| self.get(name).is_none_or(|v| v == value))
    }

    /// Returns true if at least one name is bound in both sets.
    #[must_use]
    pub fn shares_name_with(&self, other: &BindingSet) -> bool {
        other.names().any(|name| self.contains(name))
    }

    /// Joins two binding sets: the union of their mappings, or `None` if
    /// they disagree on a shared name.
    #[must_use]
    pub fn merge(&self, other: &BindingSet) -> Option<BindingSet> {
        let (mut merged, smaller) = if self.len() >= other.len() {
            (self.clone(), other)
        } else {
            (other.clone(), self)
        };
        for (name, value) in smaller.iter() {
            match merged.get(name) {
                Some(existing) if existing != value => return None,
                Some(_) => {}
                None => merged.insert(Arc::clone(name), value.clone()),
            }
        }
        Some(merged)
    }

    /// Returns the values of `names`, in order, as a join key.
    #[must_use]
    pub fn key(&self, names: &[Arc<str>]) -> SmallVec<[Option<Term>; 4]> {
        names.iter().map(|n| self.get(n).cloned()).collect()
    }
}

impl<N: Into<Arc<str>>> FromIterator<(N, Term)> for BindingSet {
    fn from_iter<I: IntoIterator<Item = (N, Term)>>(iter: I) -> Self {
        let mut set = BindingSet::new();
        for (name, value) in iter {
            set.insert(name, value);
        }
        set
    }
}

impl fmt::Display for BindingSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "?{name}={value}")?;
        }
        f.write_str("}")
    }
}
