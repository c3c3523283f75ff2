//! Write transactions.

use super::{MemoryStore, QuadPattern};
use crate::lock::TransactionLockGuard;
use crate::model::{Assertions, MemStatement, ReadMode};
use memquad_common::types::{Quad, TxId};
use memquad_common::utils::error::{Result, TransactionError};
use std::sync::Arc;

/// Counts reported when a transaction finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionSummary {
    /// Statements whose changes were published (commit) or reverted (rollback).
    pub settled: usize,
    /// Statements physically removed from the store.
    pub purged: usize,
    /// Interned terms dropped because nothing used them anymore.
    pub terms_purged: usize,
}

/// An open write transaction on a [`MemoryStore`].
///
/// Holds the store's transaction lock until it is committed, rolled back, or
/// dropped. Dropping an unfinished transaction rolls it back.
#[derive(Debug)]
pub struct StoreTransaction {
    store: Arc<MemoryStore>,
    id: TxId,
    guard: TransactionLockGuard,
    /// Statements changed by this transaction, each logged once.
    touched: Vec<Arc<MemStatement>>,
    finished: bool,
}

impl StoreTransaction {
    pub(crate) fn new(store: Arc<MemoryStore>, id: TxId, guard: TransactionLockGuard) -> Self {
        Self {
            store,
            id,
            guard,
            touched: Vec::new(),
            finished: false,
        }
    }

    /// Returns the transaction id.
    #[must_use]
    pub fn id(&self) -> TxId {
        self.id
    }

    /// Returns true once committed or rolled back.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Returns the number of statements changed so far.
    #[must_use]
    pub fn pending_changes(&self) -> usize {
        self.touched.len()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.finished {
            return Err(TransactionError::Finished.into());
        }
        Ok(())
    }

    fn touch(&mut self, statement: &Arc<MemStatement>, was_touched: bool) {
        if !was_touched {
            self.touched.push(Arc::clone(statement));
        }
    }

    /// Asserts a quad explicitly or as inferred.
    ///
    /// Returns `None` if the quad already carries that assertion in this
    /// transaction's view. A statement removed earlier (even in this
    /// transaction) is revived rather than duplicated.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the store is read-only, or a
    /// transaction error if this transaction has finished.
    pub fn add_statement(&mut self, quad: &Quad, explicit: bool) -> Result<Option<Arc<MemStatement>>> {
        self.ensure_open()?;
        self.store.ensure_writable()?;
        let assertion = Assertions::of(explicit);

        if let Some(statement) = self.store.find_statement(quad) {
            let state = statement.state();
            if state.current.contains(assertion) {
                return Ok(None);
            }
            statement.set_state(state.with_current(state.current.with(assertion)));
            self.touch(&statement, state.touched);
            return Ok(Some(statement));
        }

        let statement = self.store.insert_statement(quad, assertion);
        self.touched.push(Arc::clone(&statement));
        Ok(Some(statement))
    }

    /// Retracts the explicit (or inferred) assertion from every statement
    /// matching the pattern in this transaction's view. Returns the number of
    /// statements changed.
    ///
    /// A statement that keeps its other assertion stays visible; one left
    /// with none becomes invisible and is purged on commit.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the store is read-only, or a
    /// transaction error if this transaction has finished.
    pub fn remove_statements(&mut self, pattern: &QuadPattern, explicit: bool) -> Result<usize> {
        self.ensure_open()?;
        self.store.ensure_writable()?;
        let assertion = Assertions::of(explicit);
        let pattern = pattern
            .clone()
            .read_mode(ReadMode::Transaction)
            .explicit_only(false);

        let mut removed = 0;
        for statement in self.store.statements(&pattern) {
            let state = statement.state();
            if !state.current.contains(assertion) {
                continue;
            }
            statement.set_state(state.with_current(state.current.without(assertion)));
            self.touch(&statement, state.touched);
            removed += 1;
        }
        Ok(removed)
    }

    /// Publishes all changes.
    ///
    /// Takes the query write lock for the duration, so it waits for open
    /// query cursors on other threads to close.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::ReadLockHeld`](memquad_common::utils::error::LockError)
    /// if the calling thread still has query cursors open. The transaction
    /// stays open in that case.
    pub fn commit(&mut self) -> Result<TransactionSummary> {
        self.ensure_open()?;
        let mut write = self.store.locks().write_lock()?;

        let mut summary = TransactionSummary::default();
        let mut purge = Vec::new();
        for statement in self.touched.drain(..) {
            let state = statement.state();
            if state.current.is_empty() {
                purge.push(statement);
            } else {
                statement.set_state(state.committed());
                summary.settled += 1;
            }
        }
        summary.purged = purge.len();
        summary.terms_purged = self.store.purge(&purge);
        write.release();

        self.finish();
        tracing::debug!(
            tx = %self.id,
            settled = summary.settled,
            purged = summary.purged,
            terms_purged = summary.terms_purged,
            "committed transaction"
        );
        Ok(summary)
    }

    /// Discards all changes.
    ///
    /// Statements created by this transaction are invisible to committed
    /// readers, so removing them does not need the query write lock; every
    /// other change is a single atomic state restore.
    ///
    /// # Errors
    ///
    /// Returns a transaction error if this transaction has finished.
    pub fn rollback(&mut self) -> Result<TransactionSummary> {
        self.ensure_open()?;
        let summary = self.revert();
        self.finish();
        tracing::debug!(
            tx = %self.id,
            settled = summary.settled,
            purged = summary.purged,
            "rolled back transaction"
        );
        Ok(summary)
    }

    fn revert(&mut self) -> TransactionSummary {
        let mut summary = TransactionSummary::default();
        let mut purge = Vec::new();
        for statement in self.touched.drain(..) {
            let state = statement.state();
            if state.committed.is_empty() {
                purge.push(statement);
            } else {
                statement.set_state(state.rolled_back());
                summary.settled += 1;
            }
        }
        summary.purged = purge.len();
        summary.terms_purged = self.store.purge(&purge);
        summary
    }

    fn finish(&mut self) {
        self.finished = true;
        self.guard.release();
    }
}

impl Drop for StoreTransaction {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(tx = %self.id, "transaction dropped while open, rolling back");
            self.revert();
            self.finish();
        }
    }
}
