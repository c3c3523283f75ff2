//! Core type definitions for MemQuad.
//!
//! This module contains all fundamental types used throughout the store:
//! - Identifier types ([`TermId`], [`TxId`])
//! - RDF term types ([`Term`], [`Iri`], [`BlankNode`], [`Literal`], [`Triple`])
//! - Statement types ([`Quad`])

mod id;
mod quad;
mod term;

pub use id::{TermId, TxId};
pub use quad::Quad;
pub use term::{BlankNode, Iri, Literal, LiteralKind, Term, Triple};
