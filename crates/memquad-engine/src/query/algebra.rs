//! Query algebra.
//!
//! The tree an external parser hands to the engine. Tuple expressions
//! ([`TupleExpr`]) produce solutions; value expressions ([`ValueExpr`])
//! compute one term per solution. Optimizer passes consume a tree and return
//! the rewritten tree, so a tree is always owned by one compilation.
//!
//! Every tuple expression reports the names it may bind
//! ([`TupleExpr::binding_names`]) and the names it binds in every solution
//! ([`TupleExpr::assured_binding_names`]).

use indexmap::IndexSet;
use memquad_common::types::Term;
use memquad_core::BindingSet;
use std::fmt;
use std::sync::Arc;

/// Ordered set of variable names.
pub type NameSet = IndexSet<Arc<str>>;

/// A variable slot, optionally carrying a fixed value.
///
/// Anonymous variables stand for constants written in the query or for
/// blank nodes in patterns; an anonymous variable with a value is never
/// bound in solutions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Var {
    name: Arc<str>,
    value: Option<Term>,
    anonymous: bool,
}

impl Var {
    /// Creates a named, unvalued variable.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            value: None,
            anonymous: false,
        }
    }

    /// Creates an anonymous variable for a constant.
    pub fn constant(value: impl Into<Term>) -> Self {
        let value = value.into();
        Self {
            name: format!("_const_{value}").into(),
            value: Some(value),
            anonymous: true,
        }
    }

    /// Creates an anonymous, unvalued variable.
    pub fn anonymous(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            value: None,
            anonymous: true,
        }
    }

    /// Returns the name.
    #[must_use]
    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    /// Returns the fixed value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&Term> {
        self.value.as_ref()
    }

    /// Returns true if the variable has a fixed value.
    #[must_use]
    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    /// Returns true for anonymous variables.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    /// Returns true if evaluation binds this variable in solutions.
    #[must_use]
    pub fn is_bindable(&self) -> bool {
        !(self.anonymous && self.value.is_some())
    }

    /// Fixes the value of this variable.
    pub fn set_value(&mut self, value: Term) {
        self.value = Some(value);
    }

    /// Renames this variable.
    pub fn rename(&mut self, name: Arc<str>) {
        self.name = name;
    }

    /// Builder form of [`set_value`](Self::set_value).
    #[must_use]
    pub fn with_value(mut self, value: Term) -> Self {
        self.set_value(value);
        self
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) if self.anonymous => write!(f, "{value}"),
            Some(value) => write!(f, "?{}={value}", self.name),
            None => write!(f, "?{}", self.name),
        }
    }
}

impl From<Term> for Var {
    fn from(value: Term) -> Self {
        Var::constant(value)
    }
}

/// Which graphs a statement pattern ranges over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Scope {
    /// The default graph. The context variable is not bound.
    #[default]
    Default,
    /// Named graphs only. The context variable is bound.
    Named,
}

/// A quad pattern leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatementPattern {
    /// Subject slot.
    pub subject: Var,
    /// Predicate slot.
    pub predicate: Var,
    /// Object slot.
    pub object: Var,
    /// Context slot.
    pub context: Option<Var>,
    /// Graph scope.
    pub scope: Scope,
}

impl StatementPattern {
    /// Creates a default-scope triple pattern.
    pub fn new(subject: impl Into<Var>, predicate: impl Into<Var>, object: impl Into<Var>) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            context: None,
            scope: Scope::Default,
        }
    }

    /// Creates a named-graph pattern with a context slot.
    pub fn named(
        subject: impl Into<Var>,
        predicate: impl Into<Var>,
        object: impl Into<Var>,
        context: impl Into<Var>,
    ) -> Self {
        Self {
            context: Some(context.into()),
            scope: Scope::Named,
            ..Self::new(subject, predicate, object)
        }
    }

    /// Sets the context slot.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<Var>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Sets the scope.
    #[must_use]
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Iterates over the slots whose values end up in solutions.
    pub fn bound_slots(&self) -> impl Iterator<Item = &Var> {
        let context = match self.scope {
            Scope::Named => self.context.as_ref(),
            Scope::Default => None,
        };
        [Some(&self.subject), Some(&self.predicate), Some(&self.object), context]
            .into_iter()
            .flatten()
            .filter(|v| v.is_bindable())
    }

    /// Iterates over all slots.
    pub fn vars(&self) -> impl Iterator<Item = &Var> {
        [&self.subject, &self.predicate, &self.object]
            .into_iter()
            .chain(self.context.as_ref())
    }

    /// Iterates mutably over all slots.
    pub fn vars_mut(&mut self) -> impl Iterator<Item = &mut Var> {
        [&mut self.subject, &mut self.predicate, &mut self.object]
            .into_iter()
            .chain(self.context.as_mut())
    }
}

/// `source AS target` in a projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionElem {
    /// Name read from the input.
    pub source: Arc<str>,
    /// Name in the output.
    pub target: Arc<str>,
}

impl ProjectionElem {
    /// Projects `name` unchanged.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        let name = name.into();
        Self {
            source: Arc::clone(&name),
            target: name,
        }
    }

    /// Projects `source` renamed to `target`.
    pub fn renamed(source: impl Into<Arc<str>>, target: impl Into<Arc<str>>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// `expr AS name` in an extension.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionElem {
    /// The bound name.
    pub name: Arc<str>,
    /// The computed value.
    pub expr: ValueExpr,
}

/// One sort criterion.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderElem {
    /// The sort key expression.
    pub expr: ValueExpr,
    /// Ascending or descending.
    pub ascending: bool,
}

impl OrderElem {
    /// Ascending order on `expr`.
    pub fn asc(expr: ValueExpr) -> Self {
        Self {
            expr,
            ascending: true,
        }
    }

    /// Descending order on `expr`.
    pub fn desc(expr: ValueExpr) -> Self {
        Self {
            expr,
            ascending: false,
        }
    }
}

/// Aggregate functions.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateKind {
    /// `COUNT`, or `COUNT(*)` when the aggregate has no expression.
    Count,
    /// `SUM`
    Sum,
    /// `AVG`
    Avg,
    /// `MIN`
    Min,
    /// `MAX`
    Max,
    /// `SAMPLE`
    Sample,
    /// `GROUP_CONCAT` with a separator.
    GroupConcat {
        /// Separator between values.
        separator: Arc<str>,
    },
}

/// An aggregate over a group.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    /// The function.
    pub kind: AggregateKind,
    /// The argument; `None` only for `COUNT(*)`.
    pub expr: Option<ValueExpr>,
    /// Aggregate distinct values only.
    pub distinct: bool,
}

impl Aggregate {
    /// Creates an aggregate over `expr`.
    pub fn new(kind: AggregateKind, expr: ValueExpr) -> Self {
        Self {
            kind,
            expr: Some(expr),
            distinct: false,
        }
    }

    /// `COUNT(*)`.
    pub fn count_all() -> Self {
        Self {
            kind: AggregateKind::Count,
            expr: None,
            distinct: false,
        }
    }

    /// Makes this aggregate `DISTINCT`.
    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }
}

/// `aggregate AS name` in a group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupElem {
    /// The bound name.
    pub name: Arc<str>,
    /// The aggregate.
    pub aggregate: Aggregate,
}

/// Value comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MathOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
}

/// A term-valued expression over one solution.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueExpr {
    /// A variable, or a constant held in an anonymous variable.
    Var(Var),
    /// A constant term.
    Constant(Term),
    /// Logical conjunction.
    And(Box<ValueExpr>, Box<ValueExpr>),
    /// Logical disjunction.
    Or(Box<ValueExpr>, Box<ValueExpr>),
    /// Logical negation.
    Not(Box<ValueExpr>),
    /// Term identity.
    SameTerm(Box<ValueExpr>, Box<ValueExpr>),
    /// Value comparison.
    Compare {
        /// Left operand.
        left: Box<ValueExpr>,
        /// Right operand.
        right: Box<ValueExpr>,
        /// Operator.
        op: CompareOp,
    },
    /// Arithmetic.
    Math {
        /// Left operand.
        left: Box<ValueExpr>,
        /// Right operand.
        right: Box<ValueExpr>,
        /// Operator.
        op: MathOp,
    },
    /// True if the variable is bound.
    Bound(Var),
    /// `isIRI`
    IsIri(Box<ValueExpr>),
    /// `isBlank`
    IsBlank(Box<ValueExpr>),
    /// `isLiteral`
    IsLiteral(Box<ValueExpr>),
    /// `isNumeric`
    IsNumeric(Box<ValueExpr>),
    /// `str`
    Str(Box<ValueExpr>),
    /// `lang`
    Lang(Box<ValueExpr>),
    /// `datatype`
    Datatype(Box<ValueExpr>),
    /// `langMatches(tag, range)`
    LangMatches(Box<ValueExpr>, Box<ValueExpr>),
    /// `regex(text, pattern, flags?)`
    Regex {
        /// Text to match.
        text: Box<ValueExpr>,
        /// Pattern.
        pattern: Box<ValueExpr>,
        /// Flags.
        flags: Option<Box<ValueExpr>>,
    },
    /// `IF(condition, then, otherwise)`
    If {
        /// Condition.
        condition: Box<ValueExpr>,
        /// Value when true.
        then: Box<ValueExpr>,
        /// Value when false.
        otherwise: Box<ValueExpr>,
    },
    /// First argument that evaluates without error.
    Coalesce(Vec<ValueExpr>),
    /// `needle IN (haystack...)`
    In {
        /// Value searched for.
        needle: Box<ValueExpr>,
        /// Candidates.
        haystack: Vec<ValueExpr>,
    },
    /// True if the subquery has a solution under the current bindings.
    Exists(Box<TupleExpr>),
}

impl ValueExpr {
    /// A variable reference.
    pub fn var(name: impl Into<Arc<str>>) -> Self {
        ValueExpr::Var(Var::new(name))
    }

    /// A constant.
    pub fn constant(value: impl Into<Term>) -> Self {
        ValueExpr::Constant(value.into())
    }

    /// `left && right`
    #[must_use]
    pub fn and(left: ValueExpr, right: ValueExpr) -> Self {
        ValueExpr::And(Box::new(left), Box::new(right))
    }

    /// `left || right`
    #[must_use]
    pub fn or(left: ValueExpr, right: ValueExpr) -> Self {
        ValueExpr::Or(Box::new(left), Box::new(right))
    }

    /// `!expr`
    #[must_use]
    pub fn not(expr: ValueExpr) -> Self {
        ValueExpr::Not(Box::new(expr))
    }

    /// `sameTerm(left, right)`
    #[must_use]
    pub fn same_term(left: ValueExpr, right: ValueExpr) -> Self {
        ValueExpr::SameTerm(Box::new(left), Box::new(right))
    }

    /// `left op right`
    #[must_use]
    pub fn compare(left: ValueExpr, op: CompareOp, right: ValueExpr) -> Self {
        ValueExpr::Compare {
            left: Box::new(left),
            right: Box::new(right),
            op,
        }
    }

    /// `left op right`
    #[must_use]
    pub fn math(left: ValueExpr, op: MathOp, right: ValueExpr) -> Self {
        ValueExpr::Math {
            left: Box::new(left),
            right: Box::new(right),
            op,
        }
    }

    /// `EXISTS { expr }`
    #[must_use]
    pub fn exists(expr: TupleExpr) -> Self {
        ValueExpr::Exists(Box::new(expr))
    }

    /// Returns the names of all variables referenced, excluding anonymous
    /// constants and variables inside `EXISTS` subqueries.
    #[must_use]
    pub fn variables(&self) -> NameSet {
        let mut names = NameSet::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables(&self, names: &mut NameSet) {
        match self {
            ValueExpr::Var(var) | ValueExpr::Bound(var) => {
                if var.is_bindable() {
                    names.insert(Arc::clone(var.name()));
                }
            }
            ValueExpr::Exists(_) | ValueExpr::Constant(_) => {}
            _ => self.for_each_child(&mut |child| child.collect_variables(names)),
        }
    }

    /// Returns true if the expression contains an `EXISTS` subquery.
    #[must_use]
    pub fn contains_exists(&self) -> bool {
        match self {
            ValueExpr::Exists(_) => true,
            _ => {
                let mut found = false;
                self.for_each_child(&mut |child| found |= child.contains_exists());
                found
            }
        }
    }

    fn for_each_child(&self, f: &mut dyn FnMut(&ValueExpr)) {
        match self {
            ValueExpr::Var(_) | ValueExpr::Constant(_) | ValueExpr::Bound(_) | ValueExpr::Exists(_) => {}
            ValueExpr::Not(e)
            | ValueExpr::IsIri(e)
            | ValueExpr::IsBlank(e)
            | ValueExpr::IsLiteral(e)
            | ValueExpr::IsNumeric(e)
            | ValueExpr::Str(e)
            | ValueExpr::Lang(e)
            | ValueExpr::Datatype(e) => f(e),
            ValueExpr::And(a, b)
            | ValueExpr::Or(a, b)
            | ValueExpr::SameTerm(a, b)
            | ValueExpr::LangMatches(a, b)
            | ValueExpr::Compare { left: a, right: b, .. }
            | ValueExpr::Math { left: a, right: b, .. } => {
                f(a);
                f(b);
            }
            ValueExpr::Regex {
                text,
                pattern,
                flags,
            } => {
                f(text);
                f(pattern);
                if let Some(flags) = flags {
                    f(flags);
                }
            }
            ValueExpr::If {
                condition,
                then,
                otherwise,
            } => {
                f(condition);
                f(then);
                f(otherwise);
            }
            ValueExpr::Coalesce(args) => args.iter().for_each(f),
            ValueExpr::In { needle, haystack } => {
                f(needle);
                haystack.iter().for_each(f);
            }
        }
    }

    /// Calls `f` on every variable, including those inside `EXISTS`
    /// subqueries. Scope barriers in subqueries are entered only when
    /// `enter_barriers` is set.
    pub fn for_each_var_mut(&mut self, enter_barriers: bool, f: &mut dyn FnMut(&mut Var)) {
        match self {
            ValueExpr::Var(var) | ValueExpr::Bound(var) => f(var),
            ValueExpr::Constant(_) => {}
            ValueExpr::Exists(expr) => expr.for_each_var_mut(enter_barriers, f),
            ValueExpr::Not(e)
            | ValueExpr::IsIri(e)
            | ValueExpr::IsBlank(e)
            | ValueExpr::IsLiteral(e)
            | ValueExpr::IsNumeric(e)
            | ValueExpr::Str(e)
            | ValueExpr::Lang(e)
            | ValueExpr::Datatype(e) => e.for_each_var_mut(enter_barriers, f),
            ValueExpr::And(a, b)
            | ValueExpr::Or(a, b)
            | ValueExpr::SameTerm(a, b)
            | ValueExpr::LangMatches(a, b)
            | ValueExpr::Compare { left: a, right: b, .. }
            | ValueExpr::Math { left: a, right: b, .. } => {
                a.for_each_var_mut(enter_barriers, f);
                b.for_each_var_mut(enter_barriers, f);
            }
            ValueExpr::Regex {
                text,
                pattern,
                flags,
            } => {
                text.for_each_var_mut(enter_barriers, f);
                pattern.for_each_var_mut(enter_barriers, f);
                if let Some(flags) = flags {
                    flags.for_each_var_mut(enter_barriers, f);
                }
            }
            ValueExpr::If {
                condition,
                then,
                otherwise,
            } => {
                condition.for_each_var_mut(enter_barriers, f);
                then.for_each_var_mut(enter_barriers, f);
                otherwise.for_each_var_mut(enter_barriers, f);
            }
            ValueExpr::Coalesce(args) => {
                for arg in args {
                    arg.for_each_var_mut(enter_barriers, f);
                }
            }
            ValueExpr::In { needle, haystack } => {
                needle.for_each_var_mut(enter_barriers, f);
                for item in haystack {
                    item.for_each_var_mut(enter_barriers, f);
                }
            }
        }
    }

    /// Returns true if an `EXISTS` subquery anywhere below contains a
    /// node that scopes or introduces names (see
    /// [`TupleExpr::has_scoped_names`]).
    fn has_scoped_subquery(&self) -> bool {
        match self {
            ValueExpr::Exists(expr) => expr.has_scoped_names(),
            _ => {
                let mut found = false;
                self.for_each_child(&mut |child| found |= child.has_scoped_subquery());
                found
            }
        }
    }
}

/// A solution-producing expression.
#[derive(Debug, Clone, PartialEq)]
pub enum TupleExpr {
    /// Quad pattern leaf.
    StatementPattern(StatementPattern),
    /// Inner join.
    Join(Box<TupleExpr>, Box<TupleExpr>),
    /// Left-outer join with an optional condition over the combined scope.
    LeftJoin {
        /// Required side.
        left: Box<TupleExpr>,
        /// Optional side.
        right: Box<TupleExpr>,
        /// Join condition.
        condition: Option<ValueExpr>,
    },
    /// Concatenation of both operands.
    Union(Box<TupleExpr>, Box<TupleExpr>),
    /// SPARQL `MINUS`.
    Difference(Box<TupleExpr>, Box<TupleExpr>),
    /// Left solutions also produced by the right operand.
    Intersection(Box<TupleExpr>, Box<TupleExpr>),
    /// Solutions for which the condition is true.
    Filter {
        /// Input.
        input: Box<TupleExpr>,
        /// Condition.
        condition: ValueExpr,
    },
    /// Selects and renames names.
    Projection {
        /// Input.
        input: Box<TupleExpr>,
        /// Output names in order.
        elements: Vec<ProjectionElem>,
    },
    /// Adds computed bindings.
    Extension {
        /// Input.
        input: Box<TupleExpr>,
        /// Computed names.
        elements: Vec<ExtensionElem>,
    },
    /// Offset and limit.
    Slice {
        /// Input.
        input: Box<TupleExpr>,
        /// Solutions skipped.
        offset: usize,
        /// Maximum solutions produced.
        limit: Option<usize>,
    },
    /// Sorted output.
    Order {
        /// Input.
        input: Box<TupleExpr>,
        /// Sort criteria, most significant first.
        elements: Vec<OrderElem>,
    },
    /// Grouping and aggregation.
    Group {
        /// Input.
        input: Box<TupleExpr>,
        /// Grouping names.
        group_names: Vec<Arc<str>>,
        /// Aggregates.
        aggregates: Vec<GroupElem>,
    },
    /// Duplicate-free output.
    Distinct(Box<TupleExpr>),
    /// Output with adjacent duplicates removed.
    Reduced(Box<TupleExpr>),
    /// One empty solution.
    SingletonSet,
    /// No solutions.
    EmptySet,
    /// Inline solutions (`VALUES`).
    BindingSetAssignment {
        /// Names the rows may bind.
        names: Vec<Arc<str>>,
        /// The rows.
        rows: Vec<BindingSet>,
    },
}

impl TupleExpr {
    /// A statement pattern leaf.
    pub fn pattern(pattern: StatementPattern) -> Self {
        TupleExpr::StatementPattern(pattern)
    }

    /// `Join(left, right)`
    #[must_use]
    pub fn join(left: TupleExpr, right: TupleExpr) -> Self {
        TupleExpr::Join(Box::new(left), Box::new(right))
    }

    /// `LeftJoin(left, right, condition)`
    #[must_use]
    pub fn left_join(left: TupleExpr, right: TupleExpr, condition: Option<ValueExpr>) -> Self {
        TupleExpr::LeftJoin {
            left: Box::new(left),
            right: Box::new(right),
            condition,
        }
    }

    /// `Union(left, right)`
    #[must_use]
    pub fn union(left: TupleExpr, right: TupleExpr) -> Self {
        TupleExpr::Union(Box::new(left), Box::new(right))
    }

    /// `Difference(left, right)`
    #[must_use]
    pub fn difference(left: TupleExpr, right: TupleExpr) -> Self {
        TupleExpr::Difference(Box::new(left), Box::new(right))
    }

    /// `Intersection(left, right)`
    #[must_use]
    pub fn intersection(left: TupleExpr, right: TupleExpr) -> Self {
        TupleExpr::Intersection(Box::new(left), Box::new(right))
    }

    /// `Filter(condition, input)`
    #[must_use]
    pub fn filter(input: TupleExpr, condition: ValueExpr) -> Self {
        TupleExpr::Filter {
            input: Box::new(input),
            condition,
        }
    }

    /// Projects the given names unchanged.
    #[must_use]
    pub fn project<N: Into<Arc<str>>>(input: TupleExpr, names: impl IntoIterator<Item = N>) -> Self {
        TupleExpr::Projection {
            input: Box::new(input),
            elements: names.into_iter().map(ProjectionElem::new).collect(),
        }
    }

    /// Binds `name` to `expr`.
    #[must_use]
    pub fn extend(input: TupleExpr, name: impl Into<Arc<str>>, expr: ValueExpr) -> Self {
        TupleExpr::Extension {
            input: Box::new(input),
            elements: vec![ExtensionElem {
                name: name.into(),
                expr,
            }],
        }
    }

    /// `Slice(input, offset, limit)`
    #[must_use]
    pub fn slice(input: TupleExpr, offset: usize, limit: Option<usize>) -> Self {
        TupleExpr::Slice {
            input: Box::new(input),
            offset,
            limit,
        }
    }

    /// `Order(input, elements)`
    #[must_use]
    pub fn order(input: TupleExpr, elements: Vec<OrderElem>) -> Self {
        TupleExpr::Order {
            input: Box::new(input),
            elements,
        }
    }

    /// `Distinct(input)`
    #[must_use]
    pub fn distinct(input: TupleExpr) -> Self {
        TupleExpr::Distinct(Box::new(input))
    }

    /// Returns every name a solution of this expression may bind, in
    /// first-occurrence order.
    #[must_use]
    pub fn binding_names(&self) -> NameSet {
        match self {
            TupleExpr::StatementPattern(pattern) => pattern
                .bound_slots()
                .map(|v| Arc::clone(v.name()))
                .collect(),
            TupleExpr::Join(l, r)
            | TupleExpr::Union(l, r)
            | TupleExpr::Intersection(l, r)
            | TupleExpr::LeftJoin {
                left: l, right: r, ..
            } => {
                let mut names = l.binding_names();
                names.extend(r.binding_names());
                names
            }
            TupleExpr::Difference(l, _) => l.binding_names(),
            TupleExpr::Filter { input, .. }
            | TupleExpr::Slice { input, .. }
            | TupleExpr::Order { input, .. }
            | TupleExpr::Distinct(input)
            | TupleExpr::Reduced(input) => input.binding_names(),
            TupleExpr::Projection { elements, .. } => {
                elements.iter().map(|e| Arc::clone(&e.target)).collect()
            }
            TupleExpr::Extension { input, elements } => {
                let mut names = input.binding_names();
                names.extend(elements.iter().map(|e| Arc::clone(&e.name)));
                names
            }
            TupleExpr::Group {
                group_names,
                aggregates,
                ..
            } => group_names
                .iter()
                .cloned()
                .chain(aggregates.iter().map(|a| Arc::clone(&a.name)))
                .collect(),
            TupleExpr::SingletonSet | TupleExpr::EmptySet => NameSet::new(),
            TupleExpr::BindingSetAssignment { names, .. } => names.iter().cloned().collect(),
        }
    }

    /// Returns the names bound in every solution of this expression.
    #[must_use]
    pub fn assured_binding_names(&self) -> NameSet {
        match self {
            TupleExpr::StatementPattern(_) => self.binding_names(),
            TupleExpr::Join(l, r) => {
                let mut names = l.assured_binding_names();
                names.extend(r.assured_binding_names());
                names
            }
            TupleExpr::Union(l, r) => {
                let right = r.assured_binding_names();
                l.assured_binding_names()
                    .into_iter()
                    .filter(|n| right.contains(n))
                    .collect()
            }
            TupleExpr::LeftJoin { left, .. }
            | TupleExpr::Difference(left, _)
            | TupleExpr::Intersection(left, _) => left.assured_binding_names(),
            TupleExpr::Filter { input, .. }
            | TupleExpr::Slice { input, .. }
            | TupleExpr::Order { input, .. }
            | TupleExpr::Extension { input, .. }
            | TupleExpr::Distinct(input)
            | TupleExpr::Reduced(input) => input.assured_binding_names(),
            TupleExpr::Projection { input, elements } => {
                let assured = input.assured_binding_names();
                elements
                    .iter()
                    .filter(|e| assured.contains(&e.source))
                    .map(|e| Arc::clone(&e.target))
                    .collect()
            }
            TupleExpr::Group {
                input, group_names, ..
            } => {
                let assured = input.assured_binding_names();
                group_names
                    .iter()
                    .filter(|n| assured.contains(*n))
                    .cloned()
                    .collect()
            }
            TupleExpr::SingletonSet | TupleExpr::EmptySet => NameSet::new(),
            TupleExpr::BindingSetAssignment { names, rows } => names
                .iter()
                .filter(|n| rows.iter().all(|row| row.contains(n)))
                .cloned()
                .collect(),
        }
    }

    /// Returns true for nodes whose input must not see outer bindings:
    /// projections, groups, slices, orders, and duplicate removal.
    #[must_use]
    pub fn is_scope_barrier(&self) -> bool {
        matches!(
            self,
            TupleExpr::Projection { .. }
                | TupleExpr::Group { .. }
                | TupleExpr::Slice { .. }
                | TupleExpr::Order { .. }
                | TupleExpr::Distinct(_)
                | TupleExpr::Reduced(_)
        )
    }

    /// Returns the names this tree binds in some solutions but not all.
    #[must_use]
    pub fn optional_binding_names(&self) -> NameSet {
        let assured = self.assured_binding_names();
        self.binding_names()
            .into_iter()
            .filter(|n| !assured.contains(n))
            .collect()
    }

    /// Returns true if pre-binding any of `outer` could change this tree's
    /// solutions other than by filtering them. That happens when a name is
    /// bound only optionally somewhere in the tree, or when a filter or
    /// optional condition reads a name its operand never binds.
    #[must_use]
    pub fn is_sensitive_to(&self, outer: &NameSet) -> bool {
        let unbound_read = |condition: &ValueExpr, scope: NameSet| {
            condition
                .variables()
                .iter()
                .any(|n| outer.contains(n) && !scope.contains(n))
        };
        let local = match self {
            TupleExpr::Filter { input, condition } => {
                unbound_read(condition, input.binding_names())
            }
            TupleExpr::LeftJoin {
                condition: Some(condition),
                ..
            } => unbound_read(condition, self.binding_names()),
            _ => false,
        };
        local
            || self
                .optional_binding_names()
                .iter()
                .any(|n| outer.contains(n))
            || self
                .children()
                .into_iter()
                .any(|child| child.is_sensitive_to(outer))
    }

    /// Returns true if this tree contains a node that renames, computes,
    /// or hides names: projections, groups, extensions, or inline values.
    /// Such trees cannot have a variable renamed throughout by rewriting
    /// variable slots alone.
    #[must_use]
    pub fn has_scoped_names(&self) -> bool {
        match self {
            TupleExpr::Projection { .. }
            | TupleExpr::Group { .. }
            | TupleExpr::Extension { .. }
            | TupleExpr::BindingSetAssignment { .. } => true,
            TupleExpr::Filter { input, condition } => {
                condition.has_scoped_subquery() || input.has_scoped_names()
            }
            TupleExpr::LeftJoin {
                left,
                right,
                condition,
            } => {
                condition.as_ref().is_some_and(ValueExpr::has_scoped_subquery)
                    || left.has_scoped_names()
                    || right.has_scoped_names()
            }
            TupleExpr::Order { input, elements } => {
                elements.iter().any(|e| e.expr.has_scoped_subquery()) || input.has_scoped_names()
            }
            _ => self.children().into_iter().any(TupleExpr::has_scoped_names),
        }
    }

    /// Returns the direct tuple operands.
    #[must_use]
    pub fn children(&self) -> Vec<&TupleExpr> {
        match self {
            TupleExpr::Join(l, r)
            | TupleExpr::Union(l, r)
            | TupleExpr::Difference(l, r)
            | TupleExpr::Intersection(l, r)
            | TupleExpr::LeftJoin {
                left: l, right: r, ..
            } => vec![&**l, &**r],
            TupleExpr::Filter { input, .. }
            | TupleExpr::Projection { input, .. }
            | TupleExpr::Extension { input, .. }
            | TupleExpr::Slice { input, .. }
            | TupleExpr::Order { input, .. }
            | TupleExpr::Group { input, .. }
            | TupleExpr::Distinct(input)
            | TupleExpr::Reduced(input) => vec![&**input],
            TupleExpr::StatementPattern(_)
            | TupleExpr::SingletonSet
            | TupleExpr::EmptySet
            | TupleExpr::BindingSetAssignment { .. } => Vec::new(),
        }
    }

    /// Rebuilds this node with every direct tuple operand passed through `f`.
    #[must_use]
    pub fn map_children(self, mut f: impl FnMut(TupleExpr) -> TupleExpr) -> TupleExpr {
        let mut apply = |expr: Box<TupleExpr>| Box::new(f(*expr));
        match self {
            TupleExpr::Join(l, r) => TupleExpr::Join(apply(l), apply(r)),
            TupleExpr::Union(l, r) => TupleExpr::Union(apply(l), apply(r)),
            TupleExpr::Difference(l, r) => TupleExpr::Difference(apply(l), apply(r)),
            TupleExpr::Intersection(l, r) => TupleExpr::Intersection(apply(l), apply(r)),
            TupleExpr::LeftJoin {
                left,
                right,
                condition,
            } => TupleExpr::LeftJoin {
                left: apply(left),
                right: apply(right),
                condition,
            },
            TupleExpr::Filter { input, condition } => TupleExpr::Filter {
                input: apply(input),
                condition,
            },
            TupleExpr::Projection { input, elements } => TupleExpr::Projection {
                input: apply(input),
                elements,
            },
            TupleExpr::Extension { input, elements } => TupleExpr::Extension {
                input: apply(input),
                elements,
            },
            TupleExpr::Slice {
                input,
                offset,
                limit,
            } => TupleExpr::Slice {
                input: apply(input),
                offset,
                limit,
            },
            TupleExpr::Order { input, elements } => TupleExpr::Order {
                input: apply(input),
                elements,
            },
            TupleExpr::Group {
                input,
                group_names,
                aggregates,
            } => TupleExpr::Group {
                input: apply(input),
                group_names,
                aggregates,
            },
            TupleExpr::Distinct(input) => TupleExpr::Distinct(apply(input)),
            TupleExpr::Reduced(input) => TupleExpr::Reduced(apply(input)),
            leaf @ (TupleExpr::StatementPattern(_)
            | TupleExpr::SingletonSet
            | TupleExpr::EmptySet
            | TupleExpr::BindingSetAssignment { .. }) => leaf,
        }
    }

    /// Calls `f` on every variable in patterns and value expressions,
    /// including `EXISTS` subqueries. Inputs of projections and groups are
    /// skipped unless `enter_barriers` is set.
    pub fn for_each_var_mut(&mut self, enter_barriers: bool, f: &mut dyn FnMut(&mut Var)) {
        match self {
            TupleExpr::StatementPattern(pattern) => pattern.vars_mut().for_each(f),
            TupleExpr::Projection { input, .. } | TupleExpr::Group { input, .. } => {
                if enter_barriers {
                    input.for_each_var_mut(enter_barriers, f);
                }
            }
            TupleExpr::Filter { input, condition } => {
                condition.for_each_var_mut(enter_barriers, f);
                input.for_each_var_mut(enter_barriers, f);
            }
            TupleExpr::LeftJoin {
                left,
                right,
                condition,
            } => {
                if let Some(condition) = condition {
                    condition.for_each_var_mut(enter_barriers, f);
                }
                left.for_each_var_mut(enter_barriers, f);
                right.for_each_var_mut(enter_barriers, f);
            }
            TupleExpr::Extension { input, elements } => {
                for element in elements {
                    element.expr.for_each_var_mut(enter_barriers, f);
                }
                input.for_each_var_mut(enter_barriers, f);
            }
            TupleExpr::Order { input, elements } => {
                for element in elements {
                    element.expr.for_each_var_mut(enter_barriers, f);
                }
                input.for_each_var_mut(enter_barriers, f);
            }
            TupleExpr::Join(l, r)
            | TupleExpr::Union(l, r)
            | TupleExpr::Difference(l, r)
            | TupleExpr::Intersection(l, r) => {
                l.for_each_var_mut(enter_barriers, f);
                r.for_each_var_mut(enter_barriers, f);
            }
            TupleExpr::Slice { input, .. }
            | TupleExpr::Distinct(input)
            | TupleExpr::Reduced(input) => input.for_each_var_mut(enter_barriers, f),
            TupleExpr::SingletonSet
            | TupleExpr::EmptySet
            | TupleExpr::BindingSetAssignment { .. } => {}
        }
    }
}

impl From<StatementPattern> for TupleExpr {
    fn from(pattern: StatementPattern) -> Self {
        TupleExpr::StatementPattern(pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ex(local: &str) -> Term {
        Term::iri(format!("http://example.org/{local}"))
    }

    fn names(set: &NameSet) -> Vec<&str> {
        set.iter().map(|n| &**n).collect()
    }

    #[test]
    fn test_pattern_binding_names_skip_constants_and_default_context() {
        let pattern = StatementPattern::new(Var::new("s"), Var::constant(ex("p")), Var::new("o"))
            .with_context(Var::new("g"));
        let expr = TupleExpr::pattern(pattern.clone());
        assert_eq!(names(&expr.binding_names()), vec!["s", "o"]);

        let named = TupleExpr::pattern(pattern.with_scope(Scope::Named));
        assert_eq!(names(&named.binding_names()), vec!["s", "o", "g"]);
    }

    #[test]
    fn test_assured_names() {
        let a = TupleExpr::pattern(StatementPattern::new(
            Var::new("s"),
            Var::constant(ex("p")),
            Var::new("o"),
        ));
        let b = TupleExpr::pattern(StatementPattern::new(
            Var::new("s"),
            Var::constant(ex("q")),
            Var::new("x"),
        ));

        let optional = TupleExpr::left_join(a.clone(), b.clone(), None);
        assert_eq!(names(&optional.binding_names()), vec!["s", "o", "x"]);
        assert_eq!(names(&optional.assured_binding_names()), vec!["s", "o"]);

        let union = TupleExpr::union(a, b);
        assert_eq!(names(&union.assured_binding_names()), vec!["s"]);
    }

    #[test]
    fn test_projection_names_follow_projection_order() {
        let pattern = TupleExpr::pattern(StatementPattern::new(
            Var::new("s"),
            Var::new("p"),
            Var::new("o"),
        ));
        let projection = TupleExpr::project(pattern, ["o", "s"]);
        assert_eq!(names(&projection.binding_names()), vec!["o", "s"]);
        assert!(projection.is_scope_barrier());
        assert!(projection.has_scoped_names());
    }

    #[test]
    fn test_value_expr_variables() {
        let expr = ValueExpr::and(
            ValueExpr::compare(ValueExpr::var("a"), CompareOp::Lt, ValueExpr::constant(Term::literal("1"))),
            ValueExpr::exists(TupleExpr::pattern(StatementPattern::new(
                Var::new("hidden"),
                Var::new("p"),
                Var::new("o"),
            ))),
        );
        assert_eq!(names(&expr.variables()), vec!["a"]);
        assert!(expr.contains_exists());
    }

    #[test]
    fn test_for_each_var_mut_respects_barriers() {
        let inner = TupleExpr::project(
            TupleExpr::pattern(StatementPattern::new(Var::new("x"), Var::new("p"), Var::new("o"))),
            ["x"],
        );
        let mut expr = TupleExpr::join(
            TupleExpr::pattern(StatementPattern::new(Var::new("x"), Var::new("q"), Var::new("y"))),
            inner,
        );
        let mut visited = 0;
        expr.for_each_var_mut(false, &mut |_| visited += 1);
        assert_eq!(visited, 3);
        visited = 0;
        expr.for_each_var_mut(true, &mut |_| visited += 1);
        assert_eq!(visited, 6);
    }
}
