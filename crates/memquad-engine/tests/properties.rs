//! Property tests for join and optional semantics and the optimizer.

mod common;

use common::{db_with, ex, quad, solutions, sorted, unoptimized};
use memquad_common::types::Quad;
use memquad_engine::query::{StatementPattern, TupleExpr, ValueExpr, Var};
use memquad_engine::{Config, JoinAlgorithm};
use proptest::prelude::*;

fn quads() -> impl Strategy<Value = Vec<Quad>> {
    let node = prop::sample::select(vec!["a", "b", "c", "d"]);
    let predicate = prop::sample::select(vec!["p", "q"]);
    prop::collection::vec((node.clone(), predicate, node), 0..16).prop_map(|triples| {
        triples
            .into_iter()
            .map(|(s, p, o)| quad(s, p, ex(o)))
            .collect()
    })
}

fn pattern(s: &str, p: &str, o: &str) -> TupleExpr {
    TupleExpr::pattern(StatementPattern::new(
        Var::new(s),
        Var::constant(ex(p)),
        Var::new(o),
    ))
}

fn configs() -> Vec<Config> {
    vec![
        unoptimized(),
        unoptimized().with_join_algorithm(JoinAlgorithm::Hash),
        Config::in_memory(),
    ]
}

proptest! {
    #[test]
    fn test_join_is_commutative(data in quads()) {
        let a = pattern("x", "p", "y");
        let b = pattern("y", "q", "z");
        for config in configs() {
            let db = db_with(config, &data);
            let session = db.session();
            let ab = solutions(&session, &TupleExpr::join(a.clone(), b.clone()));
            let ba = solutions(&session, &TupleExpr::join(b.clone(), a.clone()));
            prop_assert_eq!(sorted(&ab), sorted(&ba));
        }
    }

    #[test]
    fn test_join_with_optional_is_commutative(data in quads()) {
        let optional = TupleExpr::left_join(pattern("x", "p", "y"), pattern("y", "q", "z"), None);
        let c = pattern("w", "p", "z");
        let reference = {
            let db = db_with(unoptimized(), &data);
            sorted(&solutions(&db.session(), &TupleExpr::join(optional.clone(), c.clone())))
        };
        for config in configs() {
            let db = db_with(config, &data);
            let session = db.session();
            let lc = solutions(&session, &TupleExpr::join(optional.clone(), c.clone()));
            let cl = solutions(&session, &TupleExpr::join(c.clone(), optional.clone()));
            prop_assert_eq!(sorted(&lc), reference.clone());
            prop_assert_eq!(sorted(&cl), reference.clone());
        }
    }

    #[test]
    fn test_disjoint_join_is_cartesian_product(data in quads()) {
        let a = pattern("x", "p", "y");
        let b = pattern("u", "q", "w");
        for config in configs() {
            let db = db_with(config, &data);
            let session = db.session();
            let left = solutions(&session, &a).len();
            let right = solutions(&session, &b).len();
            let joined = solutions(&session, &TupleExpr::join(a.clone(), b.clone()));
            prop_assert_eq!(joined.len(), left * right);
        }
    }

    #[test]
    fn test_optional_never_loses_left_solutions(data in quads()) {
        let a = pattern("x", "p", "y");
        let b = pattern("y", "q", "z");
        for config in configs() {
            let db = db_with(config, &data);
            let session = db.session();
            let left = solutions(&session, &a);
            let right = solutions(&session, &b);
            let optional = solutions(&session, &TupleExpr::left_join(a.clone(), b.clone(), None));

            let mut expected = 0;
            for l in &left {
                let matches = right.iter().filter(|r| l.is_compatible(r)).count();
                let produced = optional
                    .iter()
                    .filter(|o| l.iter().all(|(name, value)| o.get(name) == Some(value)))
                    .count();
                prop_assert_eq!(produced, matches.max(1));
                expected += matches.max(1);
            }
            prop_assert_eq!(optional.len(), expected);
        }
    }

    #[test]
    fn test_same_term_rewrite_is_equivalent(data in quads()) {
        let join = TupleExpr::join(pattern("x", "p", "y"), pattern("u", "q", "w"));
        let by_vars = TupleExpr::filter(
            join.clone(),
            ValueExpr::same_term(ValueExpr::var("y"), ValueExpr::var("u")),
        );
        let by_constant = TupleExpr::filter(
            join,
            ValueExpr::same_term(ValueExpr::var("x"), ValueExpr::constant(ex("a"))),
        );

        let plain = db_with(unoptimized(), &data);
        let optimized = db_with(Config::in_memory(), &data);
        for expr in [&by_vars, &by_constant] {
            prop_assert_eq!(
                sorted(&solutions(&plain.session(), expr)),
                sorted(&solutions(&optimized.session(), expr))
            );
        }
    }

    #[test]
    fn test_empty_operand_empties_join(data in quads()) {
        let db = db_with(Config::in_memory(), &data);
        let session = db.session();
        let empty = TupleExpr::EmptySet;
        let a = pattern("x", "p", "y");
        prop_assert!(solutions(&session, &TupleExpr::join(a.clone(), empty.clone())).is_empty());
        prop_assert!(solutions(&session, &TupleExpr::join(empty, a)).is_empty());
    }
}

#[test]
fn test_optional_value_conflicting_with_join_drops_row() {
    let data = [
        quad("a", "p", ex("b")),
        quad("b", "q", ex("v1")),
        quad("x", "r", ex("v2")),
    ];
    let optional = TupleExpr::left_join(pattern("s", "p", "o"), pattern("o", "q", "v"), None);
    let other = pattern("x", "r", "v");

    for config in configs() {
        let db = db_with(config, &data);
        let session = db.session();
        // ?v=v1 from the optional side conflicts with ?v=v2
        assert!(solutions(&session, &TupleExpr::join(optional.clone(), other.clone())).is_empty());
        assert!(solutions(&session, &TupleExpr::join(other.clone(), optional.clone())).is_empty());
    }
}
