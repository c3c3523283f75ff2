//! # memquad-core
//!
//! Core layer for MemQuad: the versioned statement store, its lock manager,
//! and the cursor primitives query evaluation is built from.
//!
//! This crate depends only on `memquad-common`.
//!
//! ## Modules
//!
//! - [`model`] - Interned terms and versioned statements
//! - [`store`] - The in-memory quad store, pattern iteration, and transactions
//! - [`lock`] - Query read/write locks and the exclusive transaction lock
//! - [`execution`] - Binding sets, the cursor protocol, and cursor operators

pub mod execution;
pub mod lock;
pub mod model;
pub mod store;

// Re-export commonly used types
pub use execution::{BindingSet, BoxCursor, Cursor};
pub use lock::LockManager;
pub use model::{Assertions, MemStatement, ReadMode, TxnStatus};
pub use store::{MemoryStore, QuadPattern, StoreConfig, StoreTransaction, TripleSource};
