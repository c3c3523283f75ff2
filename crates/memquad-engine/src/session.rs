//! Session management.
//!
//! A [`Session`] is one connection to a database: it owns at most one open
//! write transaction and evaluates queries against the store. Queries run
//! inside an open transaction see its uncommitted changes; all other reads
//! see committed statements only.

use crate::config::Config;
use crate::query::algebra::TupleExpr;
use crate::query::dataset::Dataset;
use crate::query::evaluator::{EvaluationContext, EvaluationStrategy};
use crate::query::optimizer::Optimizer;
use crate::query::result::{GraphQueryResult, TupleQueryResult};
use indexmap::IndexMap;
use memquad_common::types::Quad;
use memquad_common::utils::error::{Result, TransactionError};
use memquad_core::execution::operators::{Deadline, LockingCursor};
use memquad_core::store::{StatementCursor, TransactionSummary};
use memquad_core::{BindingSet, MemoryStore, QuadPattern, ReadMode, StoreTransaction, TripleSource};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A connection for reading, writing, and querying the database.
///
/// In auto-commit mode (the default) a mutation made outside an explicit
/// transaction runs in its own transaction. Dropping a session with an open
/// transaction rolls it back.
pub struct Session {
    store: Arc<MemoryStore>,
    config: Arc<Config>,
    optimizer: Optimizer,
    query_ids: Arc<AtomicU64>,
    transaction: Option<StoreTransaction>,
    auto_commit: bool,
    timeout: Option<Duration>,
}

impl Session {
    pub(crate) fn new(store: Arc<MemoryStore>, config: Arc<Config>, query_ids: Arc<AtomicU64>) -> Self {
        Self {
            optimizer: Optimizer::with_config(config.optimizer),
            timeout: config.query_timeout,
            store,
            config,
            query_ids,
            transaction: None,
            auto_commit: true,
        }
    }

    /// Sets the deadline for queries run by this session.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets or clears the query deadline.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Returns the query deadline.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Begins a new transaction, blocking while another session has one open.
    ///
    /// # Errors
    ///
    /// Returns an error if this session already has a transaction, or the
    /// calling thread holds the transaction lock through another session.
    pub fn begin(&mut self) -> Result<()> {
        if self.transaction.is_some() {
            return Err(TransactionError::AlreadyActive.into());
        }
        self.transaction = Some(self.store.begin()?);
        Ok(())
    }

    /// Commits the current transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if no transaction is active, or if this thread still
    /// has query results open; the transaction stays open in that case.
    pub fn commit(&mut self) -> Result<TransactionSummary> {
        let tx = self
            .transaction
            .as_mut()
            .ok_or(TransactionError::NoActiveTransaction)?;
        let summary = tx.commit()?;
        self.transaction = None;
        Ok(summary)
    }

    /// Rolls back the current transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if no transaction is active.
    pub fn rollback(&mut self) -> Result<TransactionSummary> {
        let mut tx = self
            .transaction
            .take()
            .ok_or(TransactionError::NoActiveTransaction)?;
        tx.rollback()
    }

    /// Returns whether a transaction is active.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    /// Sets auto-commit mode.
    pub fn set_auto_commit(&mut self, auto_commit: bool) {
        self.auto_commit = auto_commit;
    }

    /// Returns whether auto-commit is enabled.
    #[must_use]
    pub fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    fn write<T>(&mut self, op: impl FnOnce(&mut StoreTransaction) -> Result<T>) -> Result<T> {
        if let Some(tx) = self.transaction.as_mut() {
            return op(tx);
        }
        if !self.auto_commit {
            return Err(TransactionError::NoActiveTransaction.into());
        }
        let mut tx = self.store.begin()?;
        let value = op(&mut tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Asserts a quad explicitly or as inferred.
    ///
    /// Returns false if the quad already carried that assertion.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is read-only, or no transaction is
    /// active and auto-commit is off.
    pub fn add_statement(&mut self, quad: &Quad, explicit: bool) -> Result<bool> {
        self.write(|tx| tx.add_statement(quad, explicit).map(|added| added.is_some()))
    }

    /// Retracts the explicit (or inferred) assertion from every matching
    /// statement. Returns the number of statements changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is read-only, or no transaction is
    /// active and auto-commit is off.
    pub fn remove_statements(&mut self, pattern: &QuadPattern, explicit: bool) -> Result<usize> {
        self.write(|tx| tx.remove_statements(pattern, explicit))
    }

    fn read_mode(&self) -> ReadMode {
        if self.transaction.is_some() {
            ReadMode::Transaction
        } else {
            ReadMode::Committed
        }
    }

    /// Returns the quads matching `pattern` as seen by this session.
    ///
    /// The cursor holds a query read lock until it is closed, exhausted, or
    /// dropped.
    pub fn statements(&self, pattern: &QuadPattern) -> LockingCursor<Quad> {
        let pattern = pattern.clone().read_mode(self.read_mode());
        let guard = self.store.locks().read_lock();
        let statements = StatementCursor::new(self.store.statements(&pattern));
        LockingCursor::new(Box::new(statements), guard)
    }

    /// Returns the number of statements visible to this session.
    #[must_use]
    pub fn size(&self, explicit_only: bool) -> usize {
        self.store.size(self.read_mode(), explicit_only)
    }

    /// Binds a namespace prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is read-only.
    pub fn set_namespace(&self, prefix: &str, name: &str) -> Result<()> {
        self.store.set_namespace(prefix, name)
    }

    /// Removes a namespace prefix, returning its former name.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is read-only.
    pub fn remove_namespace(&self, prefix: &str) -> Result<Option<String>> {
        self.store.remove_namespace(prefix)
    }

    /// Returns the name bound to `prefix`.
    #[must_use]
    pub fn namespace(&self, prefix: &str) -> Option<String> {
        self.store.namespace(prefix)
    }

    /// Returns all namespace bindings.
    #[must_use]
    pub fn namespaces(&self) -> IndexMap<String, String> {
        self.store.namespaces()
    }

    fn compile(
        &self,
        expr: &TupleExpr,
        dataset: Option<&Dataset>,
        bindings: &BindingSet,
        include_inferred: bool,
    ) -> Result<TupleQueryResult> {
        let query_id = self.query_ids.fetch_add(1, Ordering::Relaxed);
        let context = EvaluationContext::new(query_id)
            .with_dataset(dataset.cloned())
            .with_include_inferred(include_inferred)
            .with_read_mode(self.read_mode())
            .with_join_algorithm(self.config.join_algorithm)
            .with_deadline(self.timeout.map(Deadline::after));
        let span = context.span().clone();
        let _entered = span.enter();

        let optimized = self.optimizer.optimize(expr.clone(), bindings)?;
        let names = optimized.binding_names().into_iter().collect();

        let guard = self.store.locks().read_lock();
        let source: Arc<dyn TripleSource> = Arc::clone(&self.store) as Arc<dyn TripleSource>;
        let strategy = EvaluationStrategy::new(source, context);
        let cursor = strategy.evaluate(&optimized, bindings)?;
        tracing::debug!(read_mode = ?self.read_mode(), include_inferred, "compiled query");

        Ok(TupleQueryResult::new(
            names,
            Box::new(LockingCursor::new(cursor, guard)),
            span.clone(),
        ))
    }

    /// Evaluates a tuple query.
    ///
    /// # Errors
    ///
    /// Returns an error if the deadline has already passed or compilation
    /// fails. The read lock is released in either case.
    pub fn evaluate_tuple(
        &self,
        expr: &TupleExpr,
        dataset: Option<&Dataset>,
        bindings: &BindingSet,
        include_inferred: bool,
    ) -> Result<TupleQueryResult> {
        self.compile(expr, dataset, bindings, include_inferred)
    }

    /// Evaluates a graph query whose solutions bind `subject`, `predicate`,
    /// `object` and optionally `context`.
    ///
    /// # Errors
    ///
    /// Returns an error if the deadline has already passed or compilation
    /// fails.
    pub fn evaluate_graph(
        &self,
        expr: &TupleExpr,
        dataset: Option<&Dataset>,
        bindings: &BindingSet,
        include_inferred: bool,
    ) -> Result<GraphQueryResult> {
        let namespaces = self.store.namespaces();
        let solutions = self.compile(expr, dataset, bindings, include_inferred)?;
        Ok(GraphQueryResult::new(solutions, namespaces))
    }

    /// Evaluates a boolean (ASK-style) query: true if there is any solution.
    ///
    /// # Errors
    ///
    /// Returns an error if compilation fails or the first pull fails.
    pub fn evaluate_boolean(
        &self,
        expr: &TupleExpr,
        dataset: Option<&Dataset>,
        bindings: &BindingSet,
        include_inferred: bool,
    ) -> Result<bool> {
        let mut result = self.compile(expr, dataset, bindings, include_inferred)?;
        let found = result.next().transpose()?.is_some();
        result.close();
        Ok(found)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("in_transaction", &self.in_transaction())
            .field("auto_commit", &self.auto_commit)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::database::MemQuadDB;
    use crate::query::algebra::{StatementPattern, TupleExpr, Var};
    use memquad_common::types::{Literal, Quad, Term};
    use memquad_common::utils::error::{Error, LockError, TransactionError};
    use memquad_core::{BindingSet, Cursor, QuadPattern};

    fn ex(local: &str) -> Term {
        Term::iri(format!("http://example.org/{local}"))
    }

    fn quad(s: &str, o: i64) -> Quad {
        Quad::new(ex(s), "http://example.org/p", Literal::integer(o))
    }

    fn all() -> TupleExpr {
        TupleExpr::pattern(StatementPattern::new(
            Var::new("s"),
            Var::constant(ex("p")),
            Var::new("o"),
        ))
    }

    #[test]
    fn test_session_transaction() {
        let db = MemQuadDB::new_in_memory();
        let mut session = db.session();

        assert!(!session.in_transaction());
        session.begin().unwrap();
        assert!(session.in_transaction());
        assert!(matches!(
            session.begin(),
            Err(Error::Transaction(TransactionError::AlreadyActive))
        ));

        assert!(session.add_statement(&quad("a", 1), true).unwrap());
        assert!(!session.add_statement(&quad("a", 1), true).unwrap());
        assert_eq!(session.size(false), 1);
        assert_eq!(db.session().size(false), 0);

        session.commit().unwrap();
        assert!(!session.in_transaction());
        assert_eq!(db.session().size(false), 1);
    }

    #[test]
    fn test_session_rollback() {
        let db = MemQuadDB::new_in_memory();
        let mut session = db.session();

        session.begin().unwrap();
        session.add_statement(&quad("a", 1), true).unwrap();
        session.rollback().unwrap();
        assert!(!session.in_transaction());
        assert_eq!(session.size(false), 0);
        assert!(matches!(
            session.rollback(),
            Err(Error::Transaction(TransactionError::NoActiveTransaction))
        ));
    }

    #[test]
    fn test_auto_commit() {
        let db = MemQuadDB::new_in_memory();
        let mut session = db.session();

        session.add_statement(&quad("a", 1), true).unwrap();
        assert_eq!(db.session().size(true), 1);

        session.set_auto_commit(false);
        assert!(matches!(
            session.add_statement(&quad("b", 2), true),
            Err(Error::Transaction(TransactionError::NoActiveTransaction))
        ));
        assert!(session.remove_statements(&QuadPattern::any(), true).is_err());
    }

    #[test]
    fn test_query_reads_own_transaction() {
        let db = MemQuadDB::new_in_memory();
        let mut session = db.session();
        session.add_statement(&quad("a", 1), true).unwrap();

        session.begin().unwrap();
        session.add_statement(&quad("b", 2), true).unwrap();
        {
            let own = session
                .evaluate_tuple(&all(), None, &BindingSet::new(), true)
                .unwrap()
                .collect_all()
                .unwrap();
            assert_eq!(own.len(), 2);
        }
        let other = db
            .session()
            .evaluate_tuple(&all(), None, &BindingSet::new(), true)
            .unwrap()
            .collect_all()
            .unwrap();
        assert_eq!(other.len(), 1);
        session.commit().unwrap();
    }

    #[test]
    fn test_commit_with_open_result_fails() {
        let db = MemQuadDB::new_in_memory();
        let mut session = db.session();
        session.add_statement(&quad("a", 1), true).unwrap();

        session.begin().unwrap();
        session.add_statement(&quad("b", 2), true).unwrap();
        let mut open = session
            .evaluate_tuple(&all(), None, &BindingSet::new(), true)
            .unwrap();
        assert!(matches!(
            session.commit(),
            Err(Error::Lock(LockError::ReadLockHeld { count: 1 }))
        ));
        assert!(session.in_transaction());

        open.close();
        session.commit().unwrap();
        assert_eq!(db.store().locks().read_lock_count(), 0);
    }

    #[test]
    fn test_statements_cursor_releases_lock() {
        let db = MemQuadDB::new_in_memory();
        let mut session = db.session();
        session.add_statement(&quad("a", 1), true).unwrap();

        let mut cursor = session.statements(&QuadPattern::any().with_subject(ex("a")));
        assert_eq!(db.store().locks().read_lock_count(), 1);
        assert_eq!(cursor.next().unwrap(), Some(quad("a", 1)));
        assert_eq!(cursor.next().unwrap(), None);
        assert_eq!(db.store().locks().read_lock_count(), 0);
        cursor.close();
    }

    #[test]
    fn test_evaluate_boolean_and_namespaces() {
        let db = MemQuadDB::new_in_memory();
        let mut session = db.session();
        assert!(!session.evaluate_boolean(&all(), None, &BindingSet::new(), true).unwrap());

        session.add_statement(&quad("a", 1), true).unwrap();
        assert!(session.evaluate_boolean(&all(), None, &BindingSet::new(), true).unwrap());
        assert_eq!(db.store().locks().read_lock_count(), 0);

        session.set_namespace("ex", "http://example.org/").unwrap();
        assert_eq!(session.namespace("ex").as_deref(), Some("http://example.org/"));
        assert_eq!(session.namespaces().len(), 1);
        assert_eq!(session.remove_namespace("ex").unwrap().as_deref(), Some("http://example.org/"));
    }
}
