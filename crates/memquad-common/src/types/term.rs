//! RDF terms.
//!
//! All term payloads are `Arc<str>` so cloning a term is a reference-count
//! increment. The store interns terms on top of this, but the values
//! themselves are plain, self-contained, and usable without a store.

use crate::vocab::{rdf, xsd};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// An absolute IRI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Iri(Arc<str>);

impl Iri {
    /// Creates an IRI from its string form. No validation is performed.
    pub fn new(iri: impl Into<Arc<str>>) -> Self {
        Self(iri.into())
    }

    /// Returns the IRI string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the namespace part: everything up to and including the last
    /// `#`, or failing that the last `/`, or failing that the last `:`.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.0[..self.local_name_index()]
    }

    /// Returns the local name: everything after [`namespace`](Self::namespace).
    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.0[self.local_name_index()..]
    }

    fn local_name_index(&self) -> usize {
        self.0
            .rfind('#')
            .or_else(|| self.0.rfind('/'))
            .or_else(|| self.0.rfind(':'))
            .map_or(0, |idx| idx + 1)
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

impl From<&str> for Iri {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Iri {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// A blank node, identified by a store-local label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlankNode(Arc<str>);

impl BlankNode {
    /// Creates a blank node with the given label.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Returns the label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlankNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_:{}", self.0)
    }
}

/// How a literal is qualified beyond its label.
///
/// A language tag and a datatype are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LiteralKind {
    /// Plain literal, implicitly `xsd:string`.
    Simple,
    /// Language-tagged literal. The tag is stored lower-cased.
    LanguageTagged(Arc<str>),
    /// Literal with an explicit datatype other than `xsd:string`.
    Typed(Iri),
}

/// An RDF literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Literal {
    value: Arc<str>,
    kind: LiteralKind,
}

impl Literal {
    /// Creates a simple literal.
    pub fn simple(value: impl Into<Arc<str>>) -> Self {
        Self {
            value: value.into(),
            kind: LiteralKind::Simple,
        }
    }

    /// Creates a language-tagged literal.
    pub fn with_language(value: impl Into<Arc<str>>, language: &str) -> Self {
        Self {
            value: value.into(),
            kind: LiteralKind::LanguageTagged(language.to_ascii_lowercase().into()),
        }
    }

    /// Creates a typed literal. `xsd:string` collapses to a simple literal.
    pub fn typed(value: impl Into<Arc<str>>, datatype: impl Into<Iri>) -> Self {
        let datatype = datatype.into();
        let kind = if datatype.as_str() == xsd::STRING {
            LiteralKind::Simple
        } else {
            LiteralKind::Typed(datatype)
        };
        Self {
            value: value.into(),
            kind,
        }
    }

    /// Creates an `xsd:integer` literal.
    #[must_use]
    pub fn integer(value: i64) -> Self {
        Self::typed(value.to_string(), xsd::INTEGER)
    }

    /// Creates an `xsd:boolean` literal.
    #[must_use]
    pub fn boolean(value: bool) -> Self {
        Self::typed(if value { "true" } else { "false" }, xsd::BOOLEAN)
    }

    /// Returns the lexical form.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns the kind.
    #[must_use]
    pub fn kind(&self) -> &LiteralKind {
        &self.kind
    }

    /// Returns the language tag, if any.
    #[must_use]
    pub fn language(&self) -> Option<&str> {
        match &self.kind {
            LiteralKind::LanguageTagged(lang) => Some(lang),
            _ => None,
        }
    }

    /// Returns the datatype IRI string.
    ///
    /// Simple literals report `xsd:string`, language-tagged ones
    /// `rdf:langString`.
    #[must_use]
    pub fn datatype(&self) -> &str {
        match &self.kind {
            LiteralKind::Simple => xsd::STRING,
            LiteralKind::LanguageTagged(_) => rdf::LANG_STRING,
            LiteralKind::Typed(iri) => iri.as_str(),
        }
    }

    /// Returns true for simple and `xsd:string` literals.
    #[must_use]
    pub fn is_plain_string(&self) -> bool {
        matches!(self.kind, LiteralKind::Simple)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"")?;
        for c in self.value.chars() {
            match c {
                '"' => f.write_str("\\\"")?,
                '\\' => f.write_str("\\\\")?,
                '\n' => f.write_str("\\n")?,
                '\r' => f.write_str("\\r")?,
                c => write!(f, "{c}")?,
            }
        }
        f.write_str("\"")?;
        match &self.kind {
            LiteralKind::Simple => Ok(()),
            LiteralKind::LanguageTagged(lang) => write!(f, "@{lang}"),
            LiteralKind::Typed(dt) => write!(f, "^^{dt}"),
        }
    }
}

/// A statement used as a term (RDF-star quoted triple).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    /// The subject.
    pub subject: Term,
    /// The predicate.
    pub predicate: Iri,
    /// The object.
    pub object: Term,
}

impl Triple {
    /// Creates a new triple.
    pub fn new(subject: impl Into<Term>, predicate: impl Into<Iri>, object: impl Into<Term>) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<< {} {} {} >>", self.subject, self.predicate, self.object)
    }
}

/// Any RDF term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Term {
    /// An IRI.
    Iri(Iri),
    /// A blank node.
    BlankNode(BlankNode),
    /// A literal.
    Literal(Literal),
    /// A quoted triple.
    Triple(Arc<Triple>),
}

impl Term {
    /// Creates an IRI term.
    pub fn iri(iri: impl Into<Arc<str>>) -> Self {
        Self::Iri(Iri::new(iri))
    }

    /// Creates a blank node term.
    pub fn blank(id: impl Into<Arc<str>>) -> Self {
        Self::BlankNode(BlankNode::new(id))
    }

    /// Creates a simple literal term.
    pub fn literal(value: impl Into<Arc<str>>) -> Self {
        Self::Literal(Literal::simple(value))
    }

    /// Creates a typed literal term.
    pub fn typed_literal(value: impl Into<Arc<str>>, datatype: impl Into<Iri>) -> Self {
        Self::Literal(Literal::typed(value, datatype))
    }

    /// Creates a language-tagged literal term.
    pub fn lang_literal(value: impl Into<Arc<str>>, language: &str) -> Self {
        Self::Literal(Literal::with_language(value, language))
    }

    /// Creates a quoted triple term.
    pub fn triple(triple: Triple) -> Self {
        Self::Triple(Arc::new(triple))
    }

    /// Returns true if this is an IRI.
    #[must_use]
    pub fn is_iri(&self) -> bool {
        matches!(self, Self::Iri(_))
    }

    /// Returns true if this is a blank node.
    #[must_use]
    pub fn is_blank_node(&self) -> bool {
        matches!(self, Self::BlankNode(_))
    }

    /// Returns true if this is a literal.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    /// Returns true if this is a quoted triple.
    #[must_use]
    pub fn is_triple(&self) -> bool {
        matches!(self, Self::Triple(_))
    }

    /// Returns the IRI, if this is one.
    #[must_use]
    pub fn as_iri(&self) -> Option<&Iri> {
        match self {
            Self::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    /// Returns the literal, if this is one.
    #[must_use]
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Self::Literal(lit) => Some(lit),
            _ => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iri(iri) => fmt::Display::fmt(iri, f),
            Self::BlankNode(b) => fmt::Display::fmt(b, f),
            Self::Literal(l) => fmt::Display::fmt(l, f),
            Self::Triple(t) => fmt::Display::fmt(t.as_ref(), f),
        }
    }
}

impl From<Iri> for Term {
    fn from(iri: Iri) -> Self {
        Self::Iri(iri)
    }
}

impl From<BlankNode> for Term {
    fn from(b: BlankNode) -> Self {
        Self::BlankNode(b)
    }
}

impl From<Literal> for Term {
    fn from(l: Literal) -> Self {
        Self::Literal(l)
    }
}

impl From<Triple> for Term {
    fn from(t: Triple) -> Self {
        Self::triple(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_iri_split() {
        let iri = Iri::new("http://example.org/ns#thing");
        assert_eq!(iri.namespace(), "http://example.org/ns#");
        assert_eq!(iri.local_name(), "thing");

        let iri = Iri::new("http://example.org/people/alice");
        assert_eq!(iri.namespace(), "http://example.org/people/");
        assert_eq!(iri.local_name(), "alice");

        let iri = Iri::new("urn:isbn:0451450523");
        assert_eq!(iri.namespace(), "urn:isbn:");
        assert_eq!(iri.local_name(), "0451450523");
    }

    #[test]
    fn test_literal_kinds() {
        let plain = Literal::simple("hello");
        assert_eq!(plain.datatype(), xsd::STRING);
        assert_eq!(plain.language(), None);

        let tagged = Literal::with_language("hallo", "DE");
        assert_eq!(tagged.language(), Some("de"));
        assert_eq!(tagged.datatype(), rdf::LANG_STRING);

        let typed = Literal::typed("hello", xsd::STRING);
        assert_eq!(typed, plain);

        assert_eq!(Literal::integer(42).datatype(), xsd::INTEGER);
        assert_eq!(Literal::boolean(true).value(), "true");
    }

    #[test]
    fn test_display() {
        assert_eq!(Term::iri("http://ex.org/a").to_string(), "<http://ex.org/a>");
        assert_eq!(Term::blank("b0").to_string(), "_:b0");
        assert_eq!(Term::literal("say \"hi\"").to_string(), "\"say \\\"hi\\\"\"");
        assert_eq!(Term::lang_literal("chat", "fr").to_string(), "\"chat\"@fr");
        assert_eq!(
            Term::typed_literal("1", xsd::INTEGER).to_string(),
            "\"1\"^^<http://www.w3.org/2001/XMLSchema#integer>"
        );
        let t = Triple::new(Term::iri("s"), "p", Term::literal("o"));
        assert_eq!(Term::from(t).to_string(), "<< <s> <p> \"o\" >>");
    }

    #[test]
    fn test_term_equality_by_value() {
        assert_eq!(Term::iri("http://ex.org/a"), Term::iri(String::from("http://ex.org/a")));
        assert_ne!(Term::iri("http://ex.org/a"), Term::literal("http://ex.org/a"));
        assert_ne!(Term::literal("1"), Term::typed_literal("1", xsd::INTEGER));
    }

    proptest! {
        #[test]
        fn prop_iri_split_is_lossless(s in "[a-z:/#.]{0,40}") {
            let iri = Iri::new(s.as_str());
            prop_assert_eq!(format!("{}{}", iri.namespace(), iri.local_name()), s);
            prop_assert!(!iri.local_name().contains('#'));
        }
    }
}
