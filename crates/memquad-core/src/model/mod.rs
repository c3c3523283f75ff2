//! Store data model: interned terms and versioned statements.

mod dictionary;
mod statement;

pub use dictionary::{MemTerm, Role, TermDictionary};
pub use statement::{Assertions, MemStatement, ReadMode, StatementState, TxnStatus};
