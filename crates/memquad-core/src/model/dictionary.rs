//! Term interning.
//!
//! Each distinct term the store has seen is interned once into a
//! [`MemTerm`], which owns one statement list per role the term can play.
//! Pattern lookup starts from these lists instead of scanning the store.
//!
//! The null context is a sentinel [`MemTerm`] with id 0 and no value.

use super::statement::MemStatement;
use memquad_common::types::{Term, TermId};
use memquad_common::utils::hash::FxHashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// The position a term occupies in a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Subject position.
    Subject,
    /// Predicate position.
    Predicate,
    /// Object position.
    Object,
    /// Context position.
    Context,
}

impl Role {
    /// All roles in statement order.
    pub const ALL: [Role; 4] = [Role::Subject, Role::Predicate, Role::Object, Role::Context];

    const fn index(self) -> usize {
        match self {
            Role::Subject => 0,
            Role::Predicate => 1,
            Role::Object => 2,
            Role::Context => 3,
        }
    }
}

/// An interned term and the statements it participates in.
#[derive(Debug)]
pub struct MemTerm {
    id: TermId,
    value: Option<Term>,
    statements: [RwLock<Vec<Arc<MemStatement>>>; 4],
}

impl MemTerm {
    fn new(id: TermId, value: Option<Term>) -> Self {
        Self {
            id,
            value,
            statements: std::array::from_fn(|_| RwLock::new(Vec::new())),
        }
    }

    /// Returns the interned id.
    #[must_use]
    pub fn id(&self) -> TermId {
        self.id
    }

    /// Returns the term, or `None` for the null context.
    #[must_use]
    pub fn value(&self) -> Option<&Term> {
        self.value.as_ref()
    }

    /// Returns the number of statements that use this term in `role`.
    #[must_use]
    pub fn statement_count(&self, role: Role) -> usize {
        self.statements[role.index()].read().len()
    }

    /// Returns a snapshot of the statements that use this term in `role`,
    /// in creation order.
    #[must_use]
    pub fn statements(&self, role: Role) -> Vec<Arc<MemStatement>> {
        self.statements[role.index()].read().clone()
    }

    /// Returns true if no statement references this term.
    #[must_use]
    pub fn is_unused(&self) -> bool {
        Role::ALL
            .iter()
            .all(|role| self.statements[role.index()].read().is_empty())
    }

    pub(crate) fn push(&self, role: Role, statement: Arc<MemStatement>) {
        self.statements[role.index()].write().push(statement);
    }

    pub(crate) fn retain(&self, role: Role, keep: impl FnMut(&Arc<MemStatement>) -> bool) {
        self.statements[role.index()].write().retain(keep);
    }
}

/// Interning dictionary from terms to [`MemTerm`]s.
#[derive(Debug)]
pub struct TermDictionary {
    terms: RwLock<FxHashMap<Term, Arc<MemTerm>>>,
    null_context: Arc<MemTerm>,
    next_id: AtomicU64,
}

impl TermDictionary {
    /// Creates an empty dictionary.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            terms: RwLock::new(FxHashMap::with_capacity_and_hasher(
                capacity,
                Default::default(),
            )),
            null_context: Arc::new(MemTerm::new(TermId::NULL_CONTEXT, None)),
            next_id: AtomicU64::new(1),
        }
    }

    /// Returns the null-context sentinel.
    #[must_use]
    pub fn null_context(&self) -> &Arc<MemTerm> {
        &self.null_context
    }

    /// Looks up an interned term without interning it.
    #[must_use]
    pub fn get(&self, term: &Term) -> Option<Arc<MemTerm>> {
        self.terms.read().get(term).cloned()
    }

    /// Looks up a context. `None` resolves to the null context.
    #[must_use]
    pub fn get_context(&self, context: Option<&Term>) -> Option<Arc<MemTerm>> {
        match context {
            None => Some(Arc::clone(&self.null_context)),
            Some(term) => self.get(term),
        }
    }

    /// Returns the interned term, interning it first if needed.
    pub fn get_or_intern(&self, term: &Term) -> Arc<MemTerm> {
        if let Some(existing) = self.get(term) {
            return existing;
        }
        let mut terms = self.terms.write();
        Arc::clone(terms.entry(term.clone()).or_insert_with(|| {
            let id = TermId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
            Arc::new(MemTerm::new(id, Some(term.clone())))
        }))
    }

    /// Interns a context. `None` resolves to the null context.
    pub fn get_or_intern_context(&self, context: Option<&Term>) -> Arc<MemTerm> {
        match context {
            None => Arc::clone(&self.null_context),
            Some(term) => self.get_or_intern(term),
        }
    }

    /// Drops the given terms from the dictionary if no statement uses them
    /// anymore. Returns the number of terms dropped.
    pub fn purge_unused<'a>(&self, candidates: impl IntoIterator<Item = &'a Term>) -> usize {
        let mut terms = self.terms.write();
        let mut purged = 0;
        for term in candidates {
            if terms.get(term).is_some_and(|t| t.is_unused()) {
                terms.remove(term);
                purged += 1;
            }
        }
        purged
    }

    /// Returns the number of interned terms, excluding the null context.
    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.read().len()
    }

    /// Returns true if no term is interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.read().is_empty()
    }
}
