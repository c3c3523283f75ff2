//! Shared fixtures for the engine integration tests.

#![allow(dead_code)]

use memquad_common::types::{Quad, Term};
use memquad_core::BindingSet;
use memquad_engine::query::TupleExpr;
use memquad_engine::{Config, MemQuadDB, OptimizerConfig, Session};

pub const EX: &str = "http://example.org/";

pub fn ex(local: &str) -> Term {
    Term::iri(format!("{EX}{local}"))
}

pub fn quad(s: &str, p: &str, o: Term) -> Quad {
    Quad::new(ex(s), format!("{EX}{p}"), o)
}

/// Routes engine logs to the test harness (shown with `--nocapture`).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// A database holding `quads`, committed in one transaction.
pub fn db_with(config: Config, quads: &[Quad]) -> MemQuadDB {
    init_tracing();
    let db = MemQuadDB::with_config(config).unwrap();
    let mut session = db.session();
    session.begin().unwrap();
    for quad in quads {
        session.add_statement(quad, true).unwrap();
    }
    session.commit().unwrap();
    db
}

pub fn unoptimized() -> Config {
    Config::in_memory().with_optimizer(OptimizerConfig::disabled())
}

pub fn solutions(session: &Session, expr: &TupleExpr) -> Vec<BindingSet> {
    session
        .evaluate_tuple(expr, None, &BindingSet::new(), true)
        .unwrap()
        .collect_all()
        .unwrap()
}

/// Solutions rendered and sorted, for comparing as multisets.
pub fn sorted(rows: &[BindingSet]) -> Vec<String> {
    let mut rendered: Vec<String> = rows.iter().map(ToString::to_string).collect();
    rendered.sort();
    rendered
}
