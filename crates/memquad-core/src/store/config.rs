//! Store configuration.

use serde::{Deserialize, Serialize};

/// Configuration for a [`MemoryStore`](super::MemoryStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Reject all mutations with a configuration error.
    pub read_only: bool,
    /// Initial capacity of the term dictionary and statement list.
    pub initial_capacity: usize,
    /// Drop interned terms that no statement uses anymore after a commit or
    /// rollback purged statements.
    pub purge_unused_terms: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            read_only: false,
            initial_capacity: 1024,
            purge_unused_terms: true,
        }
    }
}

impl StoreConfig {
    /// Sets the read-only flag.
    #[must_use]
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Sets the initial capacity.
    #[must_use]
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Enables or disables purging of unused terms.
    #[must_use]
    pub fn with_term_purging(mut self, enabled: bool) -> Self {
        self.purge_unused_terms = enabled;
        self
    }
}
