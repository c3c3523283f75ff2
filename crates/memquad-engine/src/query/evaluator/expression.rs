//! Value expression evaluation.
//!
//! Errors are per solution: an [`Error::Evaluation`] raised here makes the
//! enclosing filter drop the solution or the enclosing extension leave its
//! name unbound. `&&` and `||` use three-valued logic, so an error on one
//! side is absorbed when the other side decides the result. Errors of any
//! other kind (an interrupted `EXISTS` subquery) always propagate.

use super::EvaluationStrategy;
use super::value::{Numeric, compare_values, effective_boolean_value, mismatch, value_equals};
use crate::query::algebra::{CompareOp, ValueExpr, Var};
use memquad_common::types::{Literal, Term};
use memquad_common::utils::error::{Error, EvaluationError, Result};
use memquad_core::{BindingSet, Cursor};
use regex::{Regex, RegexBuilder};
use std::cmp::Ordering;

impl EvaluationStrategy {
    /// Evaluates `expr` against one solution.
    ///
    /// # Errors
    ///
    /// Returns an evaluation error when the expression has no value for
    /// this solution, or any error raised by an `EXISTS` subquery.
    pub fn evaluate_value(&self, expr: &ValueExpr, bindings: &BindingSet) -> Result<Term> {
        match expr {
            ValueExpr::Var(var) => lookup(var, bindings),
            ValueExpr::Constant(term) => Ok(term.clone()),
            ValueExpr::And(..)
            | ValueExpr::Or(..)
            | ValueExpr::Not(_)
            | ValueExpr::SameTerm(..)
            | ValueExpr::Compare { .. }
            | ValueExpr::Bound(_)
            | ValueExpr::IsIri(_)
            | ValueExpr::IsBlank(_)
            | ValueExpr::IsLiteral(_)
            | ValueExpr::IsNumeric(_)
            | ValueExpr::LangMatches(..)
            | ValueExpr::Regex { .. }
            | ValueExpr::In { .. }
            | ValueExpr::Exists(_) => Ok(Literal::boolean(self.is_true(expr, bindings)?).into()),
            ValueExpr::Math { left, right, op } => {
                let left = Numeric::from_term(&self.evaluate_value(left, bindings)?)?;
                let right = Numeric::from_term(&self.evaluate_value(right, bindings)?)?;
                Ok(Numeric::apply(*op, left, right)?.to_term())
            }
            ValueExpr::Str(arg) => match self.evaluate_value(arg, bindings)? {
                Term::Iri(iri) => Ok(Term::literal(iri.as_str())),
                Term::Literal(literal) => Ok(Term::literal(literal.value())),
                other => Err(mismatch("IRI or literal", &other).into()),
            },
            ValueExpr::Lang(arg) => match self.evaluate_value(arg, bindings)? {
                Term::Literal(literal) => Ok(Term::literal(literal.language().unwrap_or(""))),
                other => Err(mismatch("literal", &other).into()),
            },
            ValueExpr::Datatype(arg) => match self.evaluate_value(arg, bindings)? {
                Term::Literal(literal) => Ok(Term::iri(literal.datatype())),
                other => Err(mismatch("literal", &other).into()),
            },
            ValueExpr::If {
                condition,
                then,
                otherwise,
            } => {
                if self.is_true(condition, bindings)? {
                    self.evaluate_value(then, bindings)
                } else {
                    self.evaluate_value(otherwise, bindings)
                }
            }
            ValueExpr::Coalesce(args) => {
                for arg in args {
                    match self.evaluate_value(arg, bindings) {
                        Ok(value) => return Ok(value),
                        Err(e) if e.is_evaluation_error() => {}
                        Err(e) => return Err(e),
                    }
                }
                Err(EvaluationError::NoValue("COALESCE".to_string()).into())
            }
        }
    }

    /// Evaluates `expr` as a condition.
    ///
    /// # Errors
    ///
    /// Returns an evaluation error when the condition is an error under
    /// SPARQL semantics, or any error raised by an `EXISTS` subquery.
    pub fn is_true(&self, expr: &ValueExpr, bindings: &BindingSet) -> Result<bool> {
        match expr {
            ValueExpr::And(left, right) => match self.is_true(left, bindings) {
                Ok(false) => Ok(false),
                Err(e) if !e.is_evaluation_error() => Err(e),
                Ok(true) => self.is_true(right, bindings),
                Err(e) => {
                    if self.is_true(right, bindings)? {
                        Err(e)
                    } else {
                        Ok(false)
                    }
                }
            },
            ValueExpr::Or(left, right) => match self.is_true(left, bindings) {
                Ok(true) => Ok(true),
                Err(e) if !e.is_evaluation_error() => Err(e),
                Ok(false) => self.is_true(right, bindings),
                Err(e) => {
                    if self.is_true(right, bindings)? {
                        Ok(true)
                    } else {
                        Err(e)
                    }
                }
            },
            ValueExpr::Not(arg) => Ok(!self.is_true(arg, bindings)?),
            ValueExpr::SameTerm(left, right) => {
                Ok(self.evaluate_value(left, bindings)? == self.evaluate_value(right, bindings)?)
            }
            ValueExpr::Compare { left, right, op } => {
                let left = self.evaluate_value(left, bindings)?;
                let right = self.evaluate_value(right, bindings)?;
                compare(*op, &left, &right)
            }
            ValueExpr::Bound(var) => Ok(var.has_value() || bindings.contains(var.name())),
            ValueExpr::IsIri(arg) => Ok(self.evaluate_value(arg, bindings)?.is_iri()),
            ValueExpr::IsBlank(arg) => Ok(self.evaluate_value(arg, bindings)?.is_blank_node()),
            ValueExpr::IsLiteral(arg) => Ok(self.evaluate_value(arg, bindings)?.is_literal()),
            ValueExpr::IsNumeric(arg) => Ok(match self.evaluate_value(arg, bindings)? {
                Term::Literal(literal) => matches!(Numeric::parse(&literal), Ok(Some(_))),
                _ => false,
            }),
            ValueExpr::LangMatches(tag, range) => {
                let tag = self.evaluate_value(tag, bindings)?;
                let range = self.evaluate_value(range, bindings)?;
                Ok(lang_matches(simple_label(&tag)?, simple_label(&range)?))
            }
            ValueExpr::Regex {
                text,
                pattern,
                flags,
            } => {
                let text = self.evaluate_value(text, bindings)?;
                let Some(text) = text.as_literal().filter(|l| is_string(l)) else {
                    return Err(mismatch("string literal", &text).into());
                };
                let pattern = simple_label(&self.evaluate_value(pattern, bindings)?)?.to_string();
                let flags = match flags {
                    Some(flags) => simple_label(&self.evaluate_value(flags, bindings)?)?.to_string(),
                    None => String::new(),
                };
                let regex = self.cached_regex((pattern, flags), compile_regex)?;
                Ok(regex.is_match(text.value()))
            }
            ValueExpr::In { needle, haystack } => {
                let needle = self.evaluate_value(needle, bindings)?;
                let mut error = None;
                for candidate in haystack {
                    let result = self
                        .evaluate_value(candidate, bindings)
                        .and_then(|value| value_equals(&needle, &value));
                    match result {
                        Ok(true) => return Ok(true),
                        Ok(false) => {}
                        Err(e) if e.is_evaluation_error() => error = Some(e),
                        Err(e) => return Err(e),
                    }
                }
                error.map_or(Ok(false), Err)
            }
            ValueExpr::Exists(subquery) => {
                let mut cursor = self.evaluate(subquery, bindings)?;
                let found = cursor.next().map(|row| row.is_some());
                cursor.close();
                found
            }
            other => effective_boolean_value(&self.evaluate_value(other, bindings)?),
        }
    }
}

fn lookup(var: &Var, bindings: &BindingSet) -> Result<Term> {
    var.value()
        .or_else(|| bindings.get(var.name()))
        .cloned()
        .ok_or_else(|| EvaluationError::UnboundVariable(var.name().to_string()).into())
}

fn compare(op: CompareOp, left: &Term, right: &Term) -> Result<bool> {
    let ordered = |test: fn(Ordering) -> bool| -> Result<bool> {
        Ok(compare_values(left, right)?.is_some_and(test))
    };
    match op {
        CompareOp::Eq => value_equals(left, right),
        CompareOp::Ne => value_equals(left, right).map(|equal| !equal),
        CompareOp::Lt => ordered(Ordering::is_lt),
        CompareOp::Le => ordered(Ordering::is_le),
        CompareOp::Gt => ordered(Ordering::is_gt),
        CompareOp::Ge => ordered(Ordering::is_ge),
    }
}

fn is_string(literal: &Literal) -> bool {
    literal.is_plain_string() || literal.language().is_some()
}

fn simple_label(term: &Term) -> Result<&str> {
    match term.as_literal() {
        Some(literal) if literal.is_plain_string() => Ok(literal.value()),
        _ => Err(mismatch("simple literal", term).into()),
    }
}

/// `langMatches` with basic filtering: `*` matches any non-empty tag,
/// otherwise the range must equal the tag or a prefix of it ending at `-`.
fn lang_matches(tag: &str, range: &str) -> bool {
    if range == "*" {
        return !tag.is_empty();
    }
    let tag = tag.to_ascii_lowercase();
    let range = range.to_ascii_lowercase();
    tag == range
        || tag
            .strip_prefix(range.as_str())
            .is_some_and(|rest| rest.starts_with('-'))
}

fn compile_regex(pattern: &str, flags: &str) -> Result<Regex> {
    let invalid = |message: String| -> Error { EvaluationError::InvalidRegex(message).into() };
    let pattern = if flags.contains('q') {
        regex::escape(pattern)
    } else {
        pattern.to_string()
    };
    let mut builder = RegexBuilder::new(&pattern);
    for flag in flags.chars() {
        match flag {
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            'x' => {
                builder.ignore_whitespace(true);
            }
            'q' => {}
            other => return Err(invalid(format!("unknown flag '{other}'"))),
        }
    }
    builder.build().map_err(|e| invalid(e.to_string()))
}
