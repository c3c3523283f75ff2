//! MemQuadDB main database struct.

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Duration;

use memquad_common::utils::error::{Error, Result};
use memquad_core::{MemoryStore, ReadMode};

use crate::config::Config;
use crate::session::Session;

/// The main MemQuad database.
pub struct MemQuadDB {
    /// Database configuration.
    config: Arc<Config>,
    /// The underlying quad store.
    store: Arc<MemoryStore>,
    /// Query id sequence shared by all sessions.
    query_ids: Arc<AtomicU64>,
}

impl MemQuadDB {
    /// Creates a new in-memory database.
    ///
    /// # Examples
    ///
    /// ```
    /// use memquad_engine::MemQuadDB;
    ///
    /// let db = MemQuadDB::new_in_memory();
    /// let session = db.session();
    /// ```
    #[must_use]
    pub fn new_in_memory() -> Self {
        Self::open(Config::in_memory())
    }

    /// Creates a database with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the query timeout is zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use memquad_engine::{Config, JoinAlgorithm, MemQuadDB};
    /// use std::time::Duration;
    ///
    /// let config = Config::in_memory()
    ///     .with_query_timeout(Duration::from_secs(30))
    ///     .with_join_algorithm(JoinAlgorithm::Hash);
    ///
    /// let db = MemQuadDB::with_config(config).unwrap();
    /// ```
    pub fn with_config(config: Config) -> Result<Self> {
        if config.query_timeout == Some(Duration::ZERO) {
            return Err(Error::Configuration(
                "query timeout must be greater than zero".to_string(),
            ));
        }
        Ok(Self::open(config))
    }

    fn open(config: Config) -> Self {
        tracing::debug!(read_only = config.store.read_only, "opened database");
        Self {
            store: Arc::new(MemoryStore::with_config(config.store.clone())),
            config: Arc::new(config),
            query_ids: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Creates a new session for interacting with the database.
    ///
    /// # Examples
    ///
    /// ```
    /// use memquad_engine::MemQuadDB;
    ///
    /// let db = MemQuadDB::new_in_memory();
    /// let mut session = db.session();
    /// session.begin().unwrap();
    /// session.rollback().unwrap();
    /// ```
    #[must_use]
    pub fn session(&self) -> Session {
        Session::new(
            Arc::clone(&self.store),
            Arc::clone(&self.config),
            Arc::clone(&self.query_ids),
        )
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// Returns the number of committed statements.
    #[must_use]
    pub fn statement_count(&self) -> usize {
        self.store.size(ReadMode::Committed, false)
    }

    /// Returns true if mutations are rejected.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.store.is_read_only()
    }
}

impl std::fmt::Debug for MemQuadDB {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemQuadDB")
            .field("config", &self.config)
            .field("statements", &self.statement_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memquad_common::types::{Quad, Term};

    #[test]
    fn test_create_in_memory_database() {
        let db = MemQuadDB::new_in_memory();
        assert_eq!(db.statement_count(), 0);
        assert!(!db.is_read_only());
        assert!(db.config().include_inferred);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = Config::in_memory().with_query_timeout(Duration::ZERO);
        assert!(matches!(MemQuadDB::with_config(config), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_read_only_database() {
        let db = MemQuadDB::with_config(Config::read_only()).unwrap();
        assert!(db.is_read_only());

        let mut session = db.session();
        let quad = Quad::new(Term::iri("http://example.org/a"), "http://example.org/p", Term::literal("x"));
        assert!(matches!(session.add_statement(&quad, true), Err(Error::Configuration(_))));
        assert_eq!(db.statement_count(), 0);
    }

    #[test]
    fn test_sessions_share_store() {
        let db = MemQuadDB::new_in_memory();
        let quad = Quad::new(Term::iri("http://example.org/a"), "http://example.org/p", Term::literal("x"));
        db.session().add_statement(&quad, true).unwrap();
        assert_eq!(db.session().size(false), 1);
        assert_eq!(db.statement_count(), 1);
    }
}
