//! # MemQuad
//!
//! An embeddable in-memory RDF quad store with transaction-aware
//! visibility and a pull-based query engine.
//!
//! Start with [`MemQuadDB`]. Queries are algebra trees ([`TupleExpr`])
//! built by a front-end of your choice; the engine optimizes them and
//! returns lazy results that hold a read lock until they are closed.
//!
//! ## Quick Start
//!
//! ```rust
//! use memquad::{BindingSet, MemQuadDB, Quad, StatementPattern, Term, TupleExpr, Var};
//!
//! let db = MemQuadDB::new_in_memory();
//! let mut session = db.session();
//!
//! session.add_statement(
//!     &Quad::new(Term::iri("http://example.org/alice"), "http://example.org/knows", Term::iri("http://example.org/bob")),
//!     true,
//! )?;
//!
//! let query = TupleExpr::pattern(StatementPattern::new(
//!     Var::new("who"),
//!     Var::constant(Term::iri("http://example.org/knows")),
//!     Var::new("friend"),
//! ));
//! let solutions = session
//!     .evaluate_tuple(&query, None, &BindingSet::new(), true)?
//!     .collect_all()?;
//! assert_eq!(solutions.len(), 1);
//! # Ok::<(), memquad::Error>(())
//! ```

// Re-export the main database API
pub use memquad_engine::query::{
    Aggregate, AggregateKind, CompareOp, ExtensionElem, GroupElem, MathOp, OrderElem,
    ProjectionElem, Scope, StatementPattern, TupleExpr, ValueExpr, Var,
};
pub use memquad_engine::{
    Config, Dataset, GraphQueryResult, JoinAlgorithm, MemQuadDB, OptimizerConfig, Session,
    TupleQueryResult,
};

// Re-export the store and term types
pub use memquad_common::types::{BlankNode, Iri, Literal, Quad, Term, Triple};
pub use memquad_common::utils::error::{Error, Result};
pub use memquad_core::{BindingSet, Cursor, QuadPattern, ReadMode, StoreConfig};
