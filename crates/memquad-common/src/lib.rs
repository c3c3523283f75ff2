//! # memquad-common
//!
//! Foundation layer for MemQuad: RDF terms, quads, identifiers, and errors.
//!
//! This crate provides the fundamental building blocks used by all other
//! MemQuad crates. It has no internal dependencies and should be kept minimal.
//!
//! ## Modules
//!
//! - [`types`] - Core type definitions (Term, Iri, Literal, Quad, TermId, etc.)
//! - [`vocab`] - Well-known RDF and XML Schema IRIs
//! - [`utils`] - Utility functions and helpers (hashing, errors)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod types;
pub mod utils;
pub mod vocab;

// Re-export commonly used types at crate root
pub use types::{BlankNode, Iri, Literal, LiteralKind, Quad, Term, TermId, Triple, TxId};
pub use utils::error::{Error, Result};
