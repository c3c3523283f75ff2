//! Error types for MemQuad.
//!
//! Errors fall into four families with different handling:
//!
//! - Usage errors ([`Error::Configuration`], [`Error::Lock`],
//!   [`Error::Transaction`]) are fatal and signaled immediately.
//! - [`Error::Evaluation`] is scoped to one solution. Query operators drop
//!   the offending solution (or leave the computed binding unbound) and keep
//!   going; these errors never escape a running query.
//! - [`Error::Interrupted`] terminates the whole query.
//! - [`Error::Storage`] and [`Error::Internal`] are fatal and carry their
//!   original cause.

use thiserror::Error;

/// Result type alias for MemQuad operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration or a mutation of a read-only store.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Lock misuse.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// Transaction state error.
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// Value-expression evaluation failed for one solution.
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    /// The query deadline expired.
    #[error("query interrupted after {elapsed_ms} ms")]
    Interrupted {
        /// Milliseconds since the query started.
        elapsed_ms: u64,
    },

    /// A statement source failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// An internal invariant was violated.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns true for per-solution evaluation errors.
    #[must_use]
    pub fn is_evaluation_error(&self) -> bool {
        matches!(self, Self::Evaluation(_))
    }

    /// Returns true if the query was interrupted by its deadline.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted { .. })
    }
}

/// Lock misuse errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    /// The calling thread already holds the transaction lock.
    #[error("transaction lock already held by this thread")]
    AlreadyHeld,

    /// The calling thread tried to take the query write lock while holding
    /// query read locks, which would deadlock.
    #[error("cannot acquire query write lock while holding {count} query read lock(s)")]
    ReadLockHeld {
        /// Read locks held by the calling thread.
        count: usize,
    },
}

/// Transaction state errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    /// An operation needs a transaction but none is open.
    #[error("no active transaction")]
    NoActiveTransaction,

    /// A transaction is already open on this connection.
    #[error("transaction already active")]
    AlreadyActive,

    /// The transaction was already committed or rolled back.
    #[error("transaction already finished")]
    Finished,
}

/// Per-solution value-expression errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    /// A variable has no binding in the solution.
    #[error("unbound variable ?{0}")]
    UnboundVariable(String),

    /// An operand had the wrong kind of term.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// What the operator needed.
        expected: String,
        /// What it got.
        found: String,
    },

    /// Integer or decimal division by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// A literal's lexical form is invalid for its datatype.
    #[error("invalid literal: {0}")]
    InvalidLiteral(String),

    /// A regular expression failed to compile.
    #[error("invalid regular expression: {0}")]
    InvalidRegex(String),

    /// An expression with no operand producing a value, such as an empty
    /// `COALESCE`.
    #[error("{0} produced no value")]
    NoValue(String),

    /// An unsupported operand combination or function.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

/// Statement source errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The backing source failed.
    #[error("statement source failed: {message}")]
    Source {
        /// Description of the failed operation.
        message: String,
        /// The original cause.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
