//! Versioned statements.
//!
//! Every statement carries two sets of assertion flags, `committed` (what
//! readers of committed state see) and `current` (what the open transaction
//! sees), plus a transaction status derived from the pair. All three live in
//! a single `AtomicU32`, so a concurrent reader always observes either the
//! state before a transition or the state after it.

use memquad_common::types::{Quad, TermId};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};

/// Which snapshot a reader wants to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReadMode {
    /// Only committed state.
    #[default]
    Committed,
    /// Committed state plus the open transaction's changes.
    Transaction,
}

/// Explicit and inferred assertion bits of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Assertions(u8);

impl Assertions {
    /// No assertion.
    pub const NONE: Self = Self(0);
    /// Asserted directly by a client.
    pub const EXPLICIT: Self = Self(0b01);
    /// Derived by a reasoner.
    pub const INFERRED: Self = Self(0b10);
    /// Both.
    pub const BOTH: Self = Self(0b11);

    /// The single assertion bit for the given kind.
    #[must_use]
    pub const fn of(explicit: bool) -> Self {
        if explicit { Self::EXPLICIT } else { Self::INFERRED }
    }

    /// Returns true if every bit of `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true if no bit is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns true if the explicit bit is set.
    #[must_use]
    pub const fn is_explicit(self) -> bool {
        self.contains(Self::EXPLICIT)
    }

    /// Returns a copy with the bits of `other` set.
    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns a copy with the bits of `other` cleared.
    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

/// Pending-change status of a statement within the open transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TxnStatus {
    /// No pending change to the explicit assertion.
    Neutral = 0,
    /// Created by the open transaction.
    New = 1,
    /// The open transaction asserted it explicitly; it was inferred-only.
    Explicit = 2,
    /// The open transaction retracted its explicit assertion; it stays inferred.
    Inferred = 3,
    /// The open transaction removed every assertion of a committed statement.
    Deprecated = 4,
    /// Created and removed again by the open transaction.
    Zombie = 5,
}

impl TxnStatus {
    /// Derives the status from the committed and current assertions.
    #[must_use]
    pub const fn derive(committed: Assertions, current: Assertions) -> Self {
        if committed.is_empty() {
            if current.is_empty() { Self::Zombie } else { Self::New }
        } else if current.is_empty() {
            Self::Deprecated
        } else if current.is_explicit() && !committed.is_explicit() {
            Self::Explicit
        } else if !current.is_explicit() && committed.is_explicit() {
            Self::Inferred
        } else {
            Self::Neutral
        }
    }

    const fn from_bits(bits: u32) -> Self {
        match bits {
            1 => Self::New,
            2 => Self::Explicit,
            3 => Self::Inferred,
            4 => Self::Deprecated,
            5 => Self::Zombie,
            _ => Self::Neutral,
        }
    }
}

/// A decoded snapshot of a statement's flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementState {
    /// Assertions visible to committed-state readers.
    pub committed: Assertions,
    /// Assertions visible inside the open transaction.
    pub current: Assertions,
    /// Derived status.
    pub status: TxnStatus,
    /// Whether the open transaction has logged this statement.
    pub touched: bool,
}

impl StatementState {
    const COMMITTED_SHIFT: u32 = 0;
    const CURRENT_SHIFT: u32 = 2;
    const STATUS_SHIFT: u32 = 4;
    const TOUCHED_BIT: u32 = 1 << 7;

    /// State of a freshly created statement.
    #[must_use]
    pub const fn new_in_transaction(current: Assertions) -> Self {
        Self {
            committed: Assertions::NONE,
            current,
            status: TxnStatus::derive(Assertions::NONE, current),
            touched: true,
        }
    }

    /// Replaces the current assertions and re-derives the status.
    #[must_use]
    pub const fn with_current(self, current: Assertions) -> Self {
        Self {
            committed: self.committed,
            current,
            status: TxnStatus::derive(self.committed, current),
            touched: true,
        }
    }

    /// The settled state after commit: current becomes committed.
    #[must_use]
    pub const fn committed(self) -> Self {
        Self {
            committed: self.current,
            current: self.current,
            status: TxnStatus::Neutral,
            touched: false,
        }
    }

    /// The settled state after rollback: current reverts to committed.
    #[must_use]
    pub const fn rolled_back(self) -> Self {
        Self {
            committed: self.committed,
            current: self.committed,
            status: TxnStatus::Neutral,
            touched: false,
        }
    }

    /// Returns true if a reader in `mode` sees this statement.
    #[must_use]
    pub fn is_visible(&self, mode: ReadMode, explicit_only: bool) -> bool {
        let flags = match mode {
            ReadMode::Committed => {
                if matches!(
                    self.status,
                    TxnStatus::New | TxnStatus::Zombie | TxnStatus::Deprecated
                ) {
                    return false;
                }
                self.committed
            }
            ReadMode::Transaction => {
                if matches!(self.status, TxnStatus::Zombie | TxnStatus::Deprecated) {
                    return false;
                }
                self.current
            }
        };
        if explicit_only {
            flags.is_explicit()
        } else {
            !flags.is_empty()
        }
    }

    /// Assertions a reader in `mode` sees.
    #[must_use]
    pub const fn assertions(&self, mode: ReadMode) -> Assertions {
        match mode {
            ReadMode::Committed => self.committed,
            ReadMode::Transaction => self.current,
        }
    }

    const fn encode(self) -> u32 {
        let mut bits = ((self.committed.0 as u32) << Self::COMMITTED_SHIFT)
            | ((self.current.0 as u32) << Self::CURRENT_SHIFT)
            | ((self.status as u32) << Self::STATUS_SHIFT);
        if self.touched {
            bits |= Self::TOUCHED_BIT;
        }
        bits
    }

    const fn decode(bits: u32) -> Self {
        Self {
            committed: Assertions(((bits >> Self::COMMITTED_SHIFT) & 0b11) as u8),
            current: Assertions(((bits >> Self::CURRENT_SHIFT) & 0b11) as u8),
            status: TxnStatus::from_bits((bits >> Self::STATUS_SHIFT) & 0b111),
            touched: bits & Self::TOUCHED_BIT != 0,
        }
    }
}

/// A quad stored in a [`MemoryStore`](crate::store::MemoryStore).
///
/// The quad itself is immutable; only the packed state changes. State writes
/// happen only under the transaction lock, reads may happen from any thread.
#[derive(Debug)]
pub struct MemStatement {
    quad: Quad,
    ids: [TermId; 4],
    seq: u64,
    state: AtomicU32,
}

impl MemStatement {
    pub(crate) fn new(quad: Quad, ids: [TermId; 4], seq: u64, state: StatementState) -> Self {
        Self {
            quad,
            ids,
            seq,
            state: AtomicU32::new(state.encode()),
        }
    }

    /// Returns the quad.
    #[must_use]
    pub fn quad(&self) -> &Quad {
        &self.quad
    }

    /// Returns the interned ids of subject, predicate, object, and context.
    #[must_use]
    pub fn ids(&self) -> [TermId; 4] {
        self.ids
    }

    /// Returns the creation sequence number.
    #[must_use]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Loads a consistent snapshot of the flags.
    #[must_use]
    pub fn state(&self) -> StatementState {
        StatementState::decode(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: StatementState) {
        self.state.store(state.encode(), Ordering::Release);
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> TxnStatus {
        self.state().status
    }

    /// Returns true if the statement is explicit in the given view.
    #[must_use]
    pub fn is_explicit(&self, mode: ReadMode) -> bool {
        self.state().assertions(mode).is_explicit()
    }
}
