//! Read locks are released on every exit path of a query.

mod common;

use common::{db_with, ex, quad};
use memquad_common::types::{Quad, Term};
use memquad_core::BindingSet;
use memquad_engine::query::{StatementPattern, TupleExpr, Var};
use memquad_engine::{Config, MemQuadDB};
use std::time::Duration;

fn data() -> Vec<Quad> {
    (0..10)
        .map(|i| quad(&format!("s{i}"), "p", Term::literal(i.to_string())))
        .collect()
}

fn query() -> TupleExpr {
    TupleExpr::join(
        TupleExpr::pattern(StatementPattern::new(Var::new("s"), Var::constant(ex("p")), Var::new("o"))),
        TupleExpr::pattern(StatementPattern::new(Var::new("s"), Var::new("p"), Var::new("o2"))),
    )
}

fn read_locks(db: &MemQuadDB) -> usize {
    db.store().locks().read_lock_count()
}

#[test]
fn test_lock_released_on_exhaustion() {
    let db = db_with(Config::in_memory(), &data());
    let session = db.session();

    let mut result = session
        .evaluate_tuple(&query(), None, &BindingSet::new(), true)
        .unwrap();
    assert_eq!(read_locks(&db), 1);
    assert_eq!(result.by_ref().count(), 10);
    assert_eq!(read_locks(&db), 0);

    result.close();
    result.close();
    assert_eq!(read_locks(&db), 0);
}

#[test]
fn test_lock_released_on_early_close() {
    let db = db_with(Config::in_memory(), &data());
    let session = db.session();

    let mut result = session
        .evaluate_tuple(&query(), None, &BindingSet::new(), true)
        .unwrap();
    assert!(result.next().is_some());
    result.close();
    assert_eq!(read_locks(&db), 0);

    let abandoned = session
        .evaluate_tuple(&query(), None, &BindingSet::new(), true)
        .unwrap();
    assert_eq!(read_locks(&db), 1);
    drop(abandoned);
    assert_eq!(read_locks(&db), 0);
}

#[test]
fn test_lock_released_on_error() {
    let db = db_with(Config::in_memory(), &data());
    let session = db.session().with_timeout(Duration::from_millis(200));

    let mut result = session
        .evaluate_tuple(&query(), None, &BindingSet::new(), true)
        .unwrap();
    assert!(matches!(result.next(), Some(Ok(_))));

    std::thread::sleep(Duration::from_millis(300));
    let failure = result.next();
    assert!(matches!(failure, Some(Err(ref e)) if e.is_interrupted()));
    assert!(result.next().is_none());
    assert_eq!(read_locks(&db), 0);
}

#[test]
fn test_lock_released_when_compilation_fails() {
    let db = db_with(Config::in_memory(), &data());
    let mut session = db.session();
    // A zero timeout has expired by the time compilation checks it.
    session.set_timeout(Some(Duration::ZERO));
    let outcome = session.evaluate_tuple(&query(), None, &BindingSet::new(), true);
    assert!(matches!(outcome, Err(ref e) if e.is_interrupted()));
    assert_eq!(read_locks(&db), 0);
}

#[test]
fn test_nested_statement_cursors_on_one_thread() {
    let db = db_with(Config::in_memory(), &data());
    let session = db.session();

    let outer = session
        .evaluate_tuple(&query(), None, &BindingSet::new(), true)
        .unwrap();
    let inner = session
        .evaluate_tuple(&query(), None, &BindingSet::new(), true)
        .unwrap();
    assert_eq!(read_locks(&db), 2);
    drop(inner);
    drop(outer);
    assert_eq!(read_locks(&db), 0);
}
