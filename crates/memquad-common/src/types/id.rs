//! Identifier types.
//!
//! Identifiers are plain `u64` newtypes so that they are `Copy`, cheap to
//! compare, and cannot be mixed up with one another.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an interned term within one store instance.
///
/// Id 0 is reserved for the null context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TermId(u64);

impl TermId {
    /// The reserved id of the null context.
    pub const NULL_CONTEXT: Self = Self(0);

    /// Creates a new term id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns true if this is the null context id.
    #[must_use]
    pub const fn is_null_context(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Identifier of a write transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxId(u64);

impl TxId {
    /// Creates a new transaction id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_context_id() {
        assert!(TermId::NULL_CONTEXT.is_null_context());
        assert!(!TermId::new(7).is_null_context());
        assert_eq!(TermId::new(7).as_u64(), 7);
    }

    #[test]
    fn test_display() {
        assert_eq!(TermId::new(3).to_string(), "t3");
        assert_eq!(TxId::new(12).to_string(), "tx12");
    }
}
