//! Typed views of RDF terms: numbers, booleans, and comparisons.
//!
//! Numeric promotion follows XML Schema: integer, then decimal, then float,
//! then double. Decimals are held as `f64`.

use crate::query::algebra::MathOp;
use memquad_common::types::{Literal, Term};
use memquad_common::utils::error::{EvaluationError, Result};
use memquad_common::vocab::xsd;
use std::cmp::Ordering;
use std::num::IntErrorKind;

/// A numeric literal value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    /// `xsd:integer` and its subtypes.
    Integer(i64),
    /// `xsd:decimal`
    Decimal(f64),
    /// `xsd:float`
    Float(f64),
    /// `xsd:double`
    Double(f64),
}

impl Numeric {
    /// Reads a literal as a number.
    ///
    /// Returns `Ok(None)` for non-numeric datatypes.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError::InvalidLiteral`] if the lexical form is
    /// not valid for its numeric datatype.
    pub fn parse(literal: &Literal) -> Result<Option<Numeric>> {
        let datatype = literal.datatype();
        let lexical = literal.value().trim();
        let invalid = || EvaluationError::InvalidLiteral(format!("{literal}"));

        let value = if is_integer_type(datatype) {
            match lexical.parse::<i64>() {
                Ok(value) => Numeric::Integer(value),
                // valid but out of range, held as a decimal
                Err(e)
                    if matches!(e.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) =>
                {
                    Numeric::Decimal(lexical.parse().map_err(|_| invalid())?)
                }
                Err(_) => return Err(invalid().into()),
            }
        } else if datatype == xsd::DECIMAL {
            if lexical.contains(['e', 'E']) || !lexical.chars().any(|c| c.is_ascii_digit()) {
                return Err(invalid().into());
            }
            Numeric::Decimal(lexical.parse().map_err(|_| invalid())?)
        } else if datatype == xsd::FLOAT {
            Numeric::Float(parse_floating(lexical).ok_or_else(invalid)?)
        } else if datatype == xsd::DOUBLE {
            Numeric::Double(parse_floating(lexical).ok_or_else(invalid)?)
        } else {
            return Ok(None);
        };
        Ok(Some(value))
    }

    /// Reads a term as a number, failing for anything else.
    ///
    /// # Errors
    ///
    /// Returns a type mismatch for non-numeric terms and an invalid-literal
    /// error for malformed numbers.
    pub fn from_term(term: &Term) -> Result<Numeric> {
        let parsed = match term {
            Term::Literal(literal) => Self::parse(literal)?,
            _ => None,
        };
        parsed.ok_or_else(|| mismatch("numeric literal", term).into())
    }

    fn rank(self) -> u8 {
        match self {
            Numeric::Integer(_) => 0,
            Numeric::Decimal(_) => 1,
            Numeric::Float(_) => 2,
            Numeric::Double(_) => 3,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn as_f64(self) -> f64 {
        match self {
            Numeric::Integer(v) => v as f64,
            Numeric::Decimal(v) | Numeric::Float(v) | Numeric::Double(v) => v,
        }
    }

    fn with_rank(rank: u8, value: f64) -> Numeric {
        match rank {
            0 | 1 => Numeric::Decimal(value),
            2 => Numeric::Float(value),
            _ => Numeric::Double(value),
        }
    }

    /// Returns true for zero and NaN.
    #[must_use]
    pub fn is_zero_or_nan(self) -> bool {
        match self {
            Numeric::Integer(v) => v == 0,
            Numeric::Decimal(v) | Numeric::Float(v) | Numeric::Double(v) => v == 0.0 || v.is_nan(),
        }
    }

    /// Applies an arithmetic operator after promoting both operands to
    /// their common type. Integer division yields a decimal; integer
    /// overflow falls back to decimal arithmetic.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError::DivisionByZero`] for integer or decimal
    /// division by zero.
    pub fn apply(op: MathOp, left: Numeric, right: Numeric) -> Result<Numeric> {
        if let (Numeric::Integer(a), Numeric::Integer(b)) = (left, right) {
            let exact = match op {
                MathOp::Add => a.checked_add(b),
                MathOp::Sub => a.checked_sub(b),
                MathOp::Mul => a.checked_mul(b),
                MathOp::Div => None,
            };
            if let Some(value) = exact {
                return Ok(Numeric::Integer(value));
            }
        }

        let rank = left.rank().max(right.rank());
        let (a, b) = (left.as_f64(), right.as_f64());
        let value = match op {
            MathOp::Add => a + b,
            MathOp::Sub => a - b,
            MathOp::Mul => a * b,
            MathOp::Div => {
                if b == 0.0 && rank <= 1 {
                    return Err(EvaluationError::DivisionByZero.into());
                }
                a / b
            }
        };
        Ok(Numeric::with_rank(rank, value))
    }

    /// Compares two numbers. `None` when either is NaN.
    #[must_use]
    pub fn compare(left: Numeric, right: Numeric) -> Option<Ordering> {
        match (left, right) {
            (Numeric::Integer(a), Numeric::Integer(b)) => Some(a.cmp(&b)),
            _ => left.as_f64().partial_cmp(&right.as_f64()),
        }
    }

    /// Converts back to a literal term.
    #[must_use]
    pub fn to_term(self) -> Term {
        match self {
            Numeric::Integer(v) => Literal::integer(v).into(),
            Numeric::Decimal(v) => Term::typed_literal(format_floating(v), xsd::DECIMAL),
            Numeric::Float(v) => Term::typed_literal(format_floating(v), xsd::FLOAT),
            Numeric::Double(v) => Term::typed_literal(format_floating(v), xsd::DOUBLE),
        }
    }
}

fn is_integer_type(datatype: &str) -> bool {
    datatype == xsd::INTEGER || xsd::INTEGER_SUBTYPES.contains(&datatype)
}

/// Returns true if `datatype` is one of the numeric XML Schema types.
pub fn is_numeric_type(datatype: &str) -> bool {
    is_integer_type(datatype)
        || datatype == xsd::DECIMAL
        || datatype == xsd::FLOAT
        || datatype == xsd::DOUBLE
}

fn parse_floating(lexical: &str) -> Option<f64> {
    match lexical {
        "INF" | "+INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        _ if lexical.chars().any(|c| c.is_ascii_digit()) => lexical.parse().ok(),
        _ => None,
    }
}

fn format_floating(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let lexical = if value > 0.0 { "INF" } else { "-INF" };
        lexical.to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Reads an `xsd:boolean` literal. `None` for other terms or invalid
/// lexical forms.
pub fn parse_boolean(term: &Term) -> Option<bool> {
    let literal = term.as_literal()?;
    if literal.datatype() != xsd::BOOLEAN {
        return None;
    }
    match literal.value().trim() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn is_string_literal(literal: &Literal) -> bool {
    literal.is_plain_string() || literal.language().is_some()
}

/// Computes the effective boolean value of a term.
///
/// # Errors
///
/// Returns a type mismatch for IRIs, blank nodes, triples, and literals of
/// other datatypes.
pub fn effective_boolean_value(term: &Term) -> Result<bool> {
    let Term::Literal(literal) = term else {
        return Err(mismatch("boolean-compatible literal", term).into());
    };
    if literal.datatype() == xsd::BOOLEAN {
        return Ok(parse_boolean(term).unwrap_or(false));
    }
    if is_numeric_type(literal.datatype()) {
        return Ok(match Numeric::parse(literal) {
            Ok(Some(n)) => !n.is_zero_or_nan(),
            _ => false,
        });
    }
    if is_string_literal(literal) {
        return Ok(!literal.value().is_empty());
    }
    Err(mismatch("boolean-compatible literal", term).into())
}

/// Value equality (`=`): numbers and booleans by value, everything else by
/// term identity.
///
/// # Errors
///
/// Returns an invalid-literal error when a malformed number is compared.
pub fn value_equals(left: &Term, right: &Term) -> Result<bool> {
    if left == right {
        return Ok(true);
    }
    if let (Term::Literal(a), Term::Literal(b)) = (left, right) {
        if is_numeric_type(a.datatype()) && is_numeric_type(b.datatype()) {
            let (Some(x), Some(y)) = (Numeric::parse(a)?, Numeric::parse(b)?) else {
                return Ok(false);
            };
            return Ok(Numeric::compare(x, y) == Some(Ordering::Equal));
        }
        if let (Some(x), Some(y)) = (parse_boolean(left), parse_boolean(right)) {
            return Ok(x == y);
        }
    }
    Ok(false)
}

/// Value ordering for `<`, `<=`, `>`, and `>=`. `None` when the values are
/// unordered (NaN).
///
/// # Errors
///
/// Returns a type mismatch when the terms are not comparable: different
/// kinds of values, or terms other than numbers, strings, booleans, and
/// calendar values of the same datatype.
pub fn compare_values(left: &Term, right: &Term) -> Result<Option<Ordering>> {
    if let (Term::Literal(a), Term::Literal(b)) = (left, right) {
        if is_numeric_type(a.datatype()) && is_numeric_type(b.datatype()) {
            let (Some(x), Some(y)) = (Numeric::parse(a)?, Numeric::parse(b)?) else {
                return Ok(None);
            };
            return Ok(Numeric::compare(x, y));
        }
        if a.is_plain_string() && b.is_plain_string() {
            return Ok(Some(a.value().cmp(b.value())));
        }
        if let (Some(x), Some(y)) = (parse_boolean(left), parse_boolean(right)) {
            return Ok(Some(x.cmp(&y)));
        }
        let calendar = [xsd::DATE_TIME, xsd::DATE];
        if a.datatype() == b.datatype() && calendar.contains(&a.datatype()) {
            return Ok(Some(a.value().cmp(b.value())));
        }
    }
    Err(EvaluationError::TypeMismatch {
        expected: "comparable values".to_string(),
        found: format!("{left} and {right}"),
    }
    .into())
}

/// Builds a type-mismatch error for `found`.
pub fn mismatch(expected: &str, found: &Term) -> EvaluationError {
    EvaluationError::TypeMismatch {
        expected: expected.to_string(),
        found: found.to_string(),
    }
}
