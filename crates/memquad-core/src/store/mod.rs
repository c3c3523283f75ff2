//! The versioned in-memory quad store.
//!
//! Statements live in one append-only list in creation order, and every
//! interned term keeps its own per-role statement lists for pattern lookup.
//! Transactions mutate statement flags in place (see
//! [`model`](crate::model)); commit and rollback settle the flags and
//! physically purge statements that ended up with no assertion.
//!
//! ## Locking
//!
//! Readers take a query read lock from [`MemoryStore::locks`] for as long as
//! they iterate. A write transaction holds the transaction lock, and commit
//! additionally takes the query write lock while it publishes changes.

mod config;
mod iter;
mod pattern;
mod source;
mod transaction;

pub use config::StoreConfig;
pub use iter::{StatementCursor, StatementIter};
pub use pattern::QuadPattern;
pub use source::TripleSource;
pub use transaction::{StoreTransaction, TransactionSummary};

use crate::lock::LockManager;
use crate::model::{Assertions, MemStatement, MemTerm, ReadMode, Role, StatementState, TermDictionary};
use iter::StatementFilter;
use indexmap::IndexMap;
use memquad_common::types::{Quad, Term, TermId, TxId};
use memquad_common::utils::error::{Error, Result};
use memquad_common::utils::hash::{FxHashMap, FxHashSet};
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// In-memory quad store with transaction-aware visibility.
#[derive(Debug)]
pub struct MemoryStore {
    /// Configuration.
    config: StoreConfig,

    /// Read-only switch, initialized from the configuration.
    read_only: AtomicBool,

    /// Interned terms and their statement lists.
    dictionary: TermDictionary,

    /// All statements in creation order.
    statements: RwLock<Vec<Arc<MemStatement>>>,

    /// Next statement sequence number.
    next_seq: AtomicU64,

    /// Next transaction id.
    next_tx: AtomicU64,

    /// Namespace prefixes.
    namespaces: RwLock<IndexMap<String, String>>,

    /// Locks guarding this store.
    locks: LockManager,
}

impl MemoryStore {
    /// Creates an empty store with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Creates an empty store with the given configuration.
    #[must_use]
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            read_only: AtomicBool::new(config.read_only),
            dictionary: TermDictionary::new(config.initial_capacity),
            statements: RwLock::new(Vec::with_capacity(config.initial_capacity)),
            next_seq: AtomicU64::new(0),
            next_tx: AtomicU64::new(1),
            namespaces: RwLock::new(IndexMap::new()),
            locks: LockManager::new(),
            config,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the lock manager.
    #[must_use]
    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    /// Returns the term dictionary.
    #[must_use]
    pub fn dictionary(&self) -> &TermDictionary {
        &self.dictionary
    }

    /// Returns true if mutations are rejected.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only.load(Ordering::Acquire)
    }

    /// Switches the store between read-only and writable.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::Release);
    }

    pub(crate) fn ensure_writable(&self) -> Result<()> {
        if self.is_read_only() {
            return Err(Error::Configuration("store is read-only".to_string()));
        }
        Ok(())
    }

    /// Starts a write transaction, blocking while another one is open.
    ///
    /// # Errors
    ///
    /// Returns a lock error if the calling thread already has a transaction open.
    pub fn begin(self: &Arc<Self>) -> Result<StoreTransaction> {
        let guard = self.locks.transaction_lock()?;
        let id = TxId::new(self.next_tx.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(tx = %id, "began transaction");
        Ok(StoreTransaction::new(Arc::clone(self), id, guard))
    }

    /// Returns the statements matching `pattern`.
    ///
    /// The smallest per-term statement list among the bound components is
    /// used as the candidate set; the store-wide list is scanned only when
    /// nothing is bound. A bound term that was never interned matches nothing.
    #[must_use]
    pub fn statements(&self, pattern: &QuadPattern) -> StatementIter {
        let mut filter = StatementFilter {
            named_contexts_only: pattern.named_contexts_only,
            explicit_only: pattern.explicit_only,
            read_mode: pattern.read_mode,
            ..StatementFilter::default()
        };
        let mut best: Option<(usize, Candidates)> = None;
        let mut consider = |len: usize, candidates: Candidates| {
            if best.as_ref().is_none_or(|(best_len, _)| len < *best_len) {
                best = Some((len, candidates));
            }
        };

        for (role, term, slot) in [
            (Role::Subject, &pattern.subject, &mut filter.subject),
            (Role::Predicate, &pattern.predicate, &mut filter.predicate),
            (Role::Object, &pattern.object, &mut filter.object),
        ] {
            if let Some(term) = term {
                let Some(interned) = self.dictionary.get(term) else {
                    return StatementIter::empty();
                };
                *slot = Some(interned.id());
                consider(interned.statement_count(role), Candidates::Single(interned, role));
            }
        }

        if !pattern.contexts.is_empty() {
            let contexts: Vec<Arc<MemTerm>> = pattern
                .contexts
                .iter()
                .filter_map(|c| self.dictionary.get_context(c.as_ref()))
                .filter(|c| !(pattern.named_contexts_only && c.id().is_null_context()))
                .collect();
            if contexts.is_empty() {
                return StatementIter::empty();
            }
            filter.contexts = contexts.iter().map(|c| c.id()).collect();
            let len = contexts.iter().map(|c| c.statement_count(Role::Context)).sum();
            consider(len, Candidates::Contexts(contexts));
        }

        let candidates = match best {
            Some((_, candidates)) => candidates.materialize(),
            None => self.statements.read().clone(),
        };
        StatementIter::new(candidates, filter)
    }

    /// Returns the number of statements visible in `mode`.
    #[must_use]
    pub fn size(&self, mode: ReadMode, explicit_only: bool) -> usize {
        self.statements
            .read()
            .iter()
            .filter(|s| s.state().is_visible(mode, explicit_only))
            .count()
    }

    /// Returns the number of interned terms.
    #[must_use]
    pub fn term_count(&self) -> usize {
        self.dictionary.len()
    }

    /// Sets a namespace prefix.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the store is read-only.
    pub fn set_namespace(&self, prefix: &str, name: &str) -> Result<()> {
        self.ensure_writable()?;
        self.namespaces
            .write()
            .insert(prefix.to_string(), name.to_string());
        Ok(())
    }

    /// Removes a namespace prefix, returning its previous name.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the store is read-only.
    pub fn remove_namespace(&self, prefix: &str) -> Result<Option<String>> {
        self.ensure_writable()?;
        Ok(self.namespaces.write().shift_remove(prefix))
    }

    /// Returns the namespace for a prefix.
    #[must_use]
    pub fn namespace(&self, prefix: &str) -> Option<String> {
        self.namespaces.read().get(prefix).cloned()
    }

    /// Returns all namespace prefixes in insertion order.
    #[must_use]
    pub fn namespaces(&self) -> IndexMap<String, String> {
        self.namespaces.read().clone()
    }

    /// Finds the statement for a quad regardless of its status.
    pub(crate) fn find_statement(&self, quad: &Quad) -> Option<Arc<MemStatement>> {
        let subject = self.dictionary.get(&quad.subject)?;
        let predicate = self.dictionary.get(&quad.predicate_term())?;
        let object = self.dictionary.get(&quad.object)?;
        let context = self.dictionary.get_context(quad.context.as_ref())?;
        let ids = [subject.id(), predicate.id(), object.id(), context.id()];

        let (term, role) = [
            (&subject, Role::Subject),
            (&predicate, Role::Predicate),
            (&object, Role::Object),
            (&context, Role::Context),
        ]
        .into_iter()
        .min_by_key(|(term, role)| term.statement_count(*role))?;

        term.statements(role).into_iter().find(|s| s.ids() == ids)
    }

    /// Appends a new statement created by the open transaction.
    pub(crate) fn insert_statement(&self, quad: &Quad, assertion: Assertions) -> Arc<MemStatement> {
        let subject = self.dictionary.get_or_intern(&quad.subject);
        let predicate = self.dictionary.get_or_intern(&quad.predicate_term());
        let object = self.dictionary.get_or_intern(&quad.object);
        let context = self.dictionary.get_or_intern_context(quad.context.as_ref());

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let statement = Arc::new(MemStatement::new(
            quad.clone(),
            [subject.id(), predicate.id(), object.id(), context.id()],
            seq,
            StatementState::new_in_transaction(assertion),
        ));

        self.statements.write().push(Arc::clone(&statement));
        subject.push(Role::Subject, Arc::clone(&statement));
        predicate.push(Role::Predicate, Arc::clone(&statement));
        object.push(Role::Object, Arc::clone(&statement));
        context.push(Role::Context, Arc::clone(&statement));
        statement
    }

    /// Physically removes statements from the store and every term list.
    /// Returns the number of interned terms dropped as a consequence.
    pub(crate) fn purge(&self, statements: &[Arc<MemStatement>]) -> usize {
        if statements.is_empty() {
            return 0;
        }
        let seqs: FxHashSet<u64> = statements.iter().map(|s| s.seq()).collect();
        self.statements.write().retain(|s| !seqs.contains(&s.seq()));

        let mut affected: FxHashMap<TermId, Arc<MemTerm>> = FxHashMap::default();
        for statement in statements {
            let quad = statement.quad();
            let terms = [
                self.dictionary.get(&quad.subject),
                self.dictionary.get(&quad.predicate_term()),
                self.dictionary.get(&quad.object),
                self.dictionary.get_context(quad.context.as_ref()),
            ];
            for term in terms.into_iter().flatten() {
                affected.entry(term.id()).or_insert(term);
            }
        }
        for term in affected.values() {
            for role in Role::ALL {
                term.retain(role, |s| !seqs.contains(&s.seq()));
            }
        }

        if self.config.purge_unused_terms {
            let values: Vec<Term> = affected.values().filter_map(|t| t.value().cloned()).collect();
            self.dictionary.purge_unused(&values)
        } else {
            0
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Where the candidates of a lookup come from.
enum Candidates {
    Single(Arc<MemTerm>, Role),
    Contexts(Vec<Arc<MemTerm>>),
}

impl Candidates {
    fn materialize(self) -> Vec<Arc<MemStatement>> {
        match self {
            Candidates::Single(term, role) => term.statements(role),
            Candidates::Contexts(contexts) if contexts.len() == 1 => {
                contexts[0].statements(Role::Context)
            }
            Candidates::Contexts(contexts) => {
                let mut all: Vec<_> = contexts
                    .iter()
                    .flat_map(|c| c.statements(Role::Context))
                    .collect();
                all.sort_by_key(|s| s.seq());
                all
            }
        }
    }
}
