//! SPARQL `ORDER BY` term ordering.
//!
//! Unbound < blank node < IRI < literal < quoted triple. Numeric literals
//! compare by value; other literals by lexical form, then language tag,
//! then datatype. The order is total, so it is also used for `MIN` and
//! `MAX`.

use super::value::{Numeric, is_numeric_type};
use memquad_common::types::{Literal, Term};
use std::cmp::Ordering;

fn kind_rank(term: Option<&Term>) -> u8 {
    match term {
        None => 0,
        Some(Term::BlankNode(_)) => 1,
        Some(Term::Iri(_)) => 2,
        Some(Term::Literal(_)) => 3,
        Some(Term::Triple(_)) => 4,
    }
}

/// Compares two possibly unbound terms.
#[must_use]
pub fn compare_terms(left: Option<&Term>, right: Option<&Term>) -> Ordering {
    match (left, right) {
        (Some(Term::BlankNode(a)), Some(Term::BlankNode(b))) => a.as_str().cmp(b.as_str()),
        (Some(Term::Iri(a)), Some(Term::Iri(b))) => a.as_str().cmp(b.as_str()),
        (Some(Term::Literal(a)), Some(Term::Literal(b))) => compare_literals(a, b),
        (Some(Term::Triple(a)), Some(Term::Triple(b))) => {
            compare_terms(Some(&a.subject), Some(&b.subject))
                .then_with(|| a.predicate.as_str().cmp(b.predicate.as_str()))
                .then_with(|| compare_terms(Some(&a.object), Some(&b.object)))
        }
        _ => kind_rank(left).cmp(&kind_rank(right)),
    }
}

fn compare_literals(a: &Literal, b: &Literal) -> Ordering {
    if is_numeric_type(a.datatype()) && is_numeric_type(b.datatype()) {
        if let (Ok(Some(x)), Ok(Some(y))) = (Numeric::parse(a), Numeric::parse(b)) {
            if let Some(ordering) = Numeric::compare(x, y).filter(|o| o.is_ne()) {
                return ordering;
            }
        }
    }
    a.value()
        .cmp(b.value())
        .then_with(|| a.language().cmp(&b.language()))
        .then_with(|| a.datatype().cmp(b.datatype()))
}
