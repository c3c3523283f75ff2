//! Query processing pipeline.
//!
//! - **Algebra**: the tuple and value expression trees handed to the engine
//! - **Dataset**: default and named graph restrictions
//! - **Optimizer**: tree rewrites (binding assignment, filter pushdown, join reordering)
//! - **Evaluator**: compiles a tree into a lazy cursor pipeline
//! - **Result**: tuple and graph query results

pub mod algebra;
pub mod dataset;
pub mod evaluator;
pub mod optimizer;
pub mod result;

pub use algebra::{
    Aggregate, AggregateKind, CompareOp, ExtensionElem, GroupElem, MathOp, OrderElem,
    ProjectionElem, Scope, StatementPattern, TupleExpr, ValueExpr, Var,
};
pub use dataset::Dataset;
pub use evaluator::{EvaluationContext, EvaluationStrategy};
pub use optimizer::Optimizer;
pub use result::{GraphQueryResult, TupleQueryResult};
