//! # memquad-engine
//!
//! The main entry point for MemQuad: database handles, sessions, and the
//! query pipeline from algebra tree to lazy result.
//!
//! ## Modules
//!
//! - [`database`] - MemQuadDB struct
//! - [`session`] - Session/connection management and transactions
//! - [`config`] - Configuration options
//! - [`query`] - Query algebra, optimization, evaluation, and results

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod database;
pub mod query;
pub mod session;

pub use config::{Config, JoinAlgorithm, OptimizerConfig};
pub use database::MemQuadDB;
pub use query::{Dataset, GraphQueryResult, TupleQueryResult};
pub use session::Session;
