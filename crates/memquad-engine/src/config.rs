//! Database configuration.

use memquad_core::StoreConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How joins are executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinAlgorithm {
    /// Bind joins, except hash joins when the right operand must not see
    /// the left operand's bindings: scope barriers, and operands that bind
    /// one of the left names only optionally.
    #[default]
    Auto,
    /// Always bind joins.
    Bind,
    /// Always hash joins.
    Hash,
}

/// Optimizer passes to run before evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Inline externally supplied bindings into variable slots.
    pub binding_assignment: bool,
    /// Split conjunctive filters into filter chains.
    pub constraint_splitting: bool,
    /// Rewrite `sameTerm` filters into renames and constants.
    pub same_term: bool,
    /// Move filters closer to the patterns they test.
    pub filter_pushdown: bool,
    /// Reorder join operands by estimated selectivity.
    pub join_reordering: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            binding_assignment: true,
            constraint_splitting: true,
            same_term: true,
            filter_pushdown: true,
            join_reordering: true,
        }
    }
}

impl OptimizerConfig {
    /// Runs no passes.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            binding_assignment: false,
            constraint_splitting: false,
            same_term: false,
            filter_pushdown: false,
            join_reordering: false,
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Store configuration.
    pub store: StoreConfig,

    /// Deadline applied to every query unless a session overrides it.
    pub query_timeout: Option<Duration>,

    /// Join execution strategy.
    pub join_algorithm: JoinAlgorithm,

    /// Whether queries see inferred statements unless told otherwise.
    pub include_inferred: bool,

    /// Optimizer passes.
    pub optimizer: OptimizerConfig,
}

impl Config {
    /// Creates a configuration for an in-memory database.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            include_inferred: true,
            ..Self::default()
        }
    }

    /// Creates a configuration for a read-only database.
    #[must_use]
    pub fn read_only() -> Self {
        Self {
            store: StoreConfig::default().with_read_only(true),
            ..Self::in_memory()
        }
    }

    /// Sets the store configuration.
    #[must_use]
    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    /// Sets the default query timeout.
    #[must_use]
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    /// Sets the join algorithm.
    #[must_use]
    pub fn with_join_algorithm(mut self, algorithm: JoinAlgorithm) -> Self {
        self.join_algorithm = algorithm;
        self
    }

    /// Sets whether queries include inferred statements by default.
    #[must_use]
    pub fn with_include_inferred(mut self, include: bool) -> Self {
        self.include_inferred = include;
        self
    }

    /// Sets the optimizer passes.
    #[must_use]
    pub fn with_optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let config = Config::in_memory()
            .with_query_timeout(Duration::from_secs(5))
            .with_join_algorithm(JoinAlgorithm::Hash)
            .with_optimizer(OptimizerConfig::disabled());

        assert_eq!(config.query_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.join_algorithm, JoinAlgorithm::Hash);
        assert!(!config.optimizer.join_reordering);
        assert!(config.include_inferred);
    }

    #[test]
    fn test_read_only() {
        assert!(Config::read_only().store.read_only);
        assert!(!Config::in_memory().store.read_only);
    }
}
