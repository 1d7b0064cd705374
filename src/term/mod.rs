//! # Term Algebra
//!
//! Immutable symbolic expressions that can be evaluated, compiled to a tape and
//! differentiated in reverse mode.
//!
//! ## Core Components
//!
//! - [`Variable`]: A leaf identified by a stable [`VariableId`], never by value
//! - [`Term`]: A cheap-to-clone handle to an immutable [`TermNode`]; subterms may be shared
//! - [`CompiledTerm`]: A term bound to an ordered variable list (and optional parametric variables)
//! - [`substitute`]: Replaces variables by constants and folds constant subexpressions
//! - [`TermVec3`]: Three-component vectors of terms for geometric constraints
//! - [`Expression`]: Textual front-end producing terms
//!
//! ## Example Usage
//!
//! ```rust
//! use alopt_rs::term::{Term, Variable};
//! use ndarray::array;
//!
//! let x = Variable::named("x");
//! let y = Variable::named("y");
//!
//! // f(x, y) = (x - 2)^2 + x * y
//! let f = (&x - 2.0).powi(2) + &x * &y;
//!
//! let compiled = f.compile(&[x, y]).unwrap();
//! let (gradient, value) = compiled.differentiate(&array![1.0, 3.0]).unwrap();
//! assert_eq!(value, 4.0);
//! assert_eq!(gradient, array![1.0, 1.0]);
//! ```

pub mod compiled;
pub mod expression;
pub mod functions;
pub mod substitution;
pub mod vector;

pub use compiled::CompiledTerm;
pub use expression::{Expression, ExpressionError, VariableScope};
pub use functions::{BinaryFunc, NaryFunc, UnaryFunc};
pub use substitution::{substitute, substitute_values};
pub use vector::TermVec3;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{AlOptError, Result};

static NEXT_VARIABLE_ID: AtomicU64 = AtomicU64::new(0);

/// Opaque, process-unique identity of a [`Variable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(u64);

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A free variable of a term.
///
/// Two variables are equal only if they were created by the same call to
/// [`Variable::new`] or [`Variable::named`]; the name is purely informative.
#[derive(Clone)]
pub struct Variable {
    id: VariableId,
    name: Option<Arc<str>>,
}

impl Variable {
    /// Create a new anonymous variable.
    pub fn new() -> Self {
        Self {
            id: VariableId(NEXT_VARIABLE_ID.fetch_add(1, Ordering::Relaxed)),
            name: None,
        }
    }

    /// Create a new variable carrying a display name.
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(Arc::from(name)),
            ..Self::new()
        }
    }

    /// The identity of this variable.
    pub fn id(&self) -> VariableId {
        self.id
    }

    /// The display name, if one was given.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Wrap this variable in a [`Term`].
    pub fn term(&self) -> Term {
        Term::from(self)
    }
}

impl Default for Variable {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Variable {}

impl std::hash::Hash for Variable {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "{}", self.id),
        }
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "Variable({name}#{})", self.id.0),
            None => write!(f, "Variable(#{})", self.id.0),
        }
    }
}

/// The node kinds of the term algebra.
#[derive(Debug)]
pub enum TermNode {
    /// The constant zero
    Zero,

    /// A non-zero constant
    Constant(f64),

    /// A free variable
    Variable(Variable),

    /// Sum of any number of terms
    Sum(Vec<Term>),

    /// Product of two terms
    Product(Term, Term),

    /// `base ^ exponent` with a symbolic exponent
    TermPower(Term, Term),

    /// `base ^ n` with a fixed integer exponent
    ConstPower(Term, i32),

    /// A user-defined function of one argument
    UnaryFunc(UnaryFunc, Term),

    /// A user-defined function of two arguments
    BinaryFunc(BinaryFunc, Term, Term),

    /// A user-defined function of any number of arguments
    NaryFunc(NaryFunc, Vec<Term>),

    /// Natural exponential
    Exp(Term),

    /// Natural logarithm
    Log(Term),
}

/// An immutable symbolic expression.
///
/// Cloning a term clones a reference; structurally, terms form a DAG.
#[derive(Clone)]
pub struct Term(Arc<TermNode>);

impl Term {
    /// Wrap a node.
    pub fn from_node(node: TermNode) -> Self {
        Term(Arc::new(node))
    }

    /// The constant zero.
    pub fn zero() -> Self {
        Self::from_node(TermNode::Zero)
    }

    /// A constant. Zero is represented by [`TermNode::Zero`].
    pub fn constant(value: f64) -> Self {
        if value == 0.0 {
            Self::zero()
        } else {
            Self::from_node(TermNode::Constant(value))
        }
    }

    /// The node this term points to.
    pub fn node(&self) -> &TermNode {
        &self.0
    }

    /// Whether both handles point to the very same node.
    pub fn ptr_eq(&self, other: &Term) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Address of the node, used to memoize work over shared subterms.
    pub(crate) fn node_key(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// The value of this term if it is `Zero` or a `Constant`.
    pub fn as_constant(&self) -> Option<f64> {
        match self.node() {
            TermNode::Zero => Some(0.0),
            TermNode::Constant(value) => Some(*value),
            _ => None,
        }
    }

    /// Sum of the given terms. An empty sum is zero; a single term is returned as-is.
    pub fn sum<I>(terms: I) -> Self
    where
        I: IntoIterator<Item = Term>,
    {
        let mut terms: Vec<Term> = terms.into_iter().collect();
        match terms.len() {
            0 => Self::zero(),
            1 => terms.remove(0),
            _ => Self::from_node(TermNode::Sum(terms)),
        }
    }

    /// Product of two terms.
    pub fn product(left: impl Into<Term>, right: impl Into<Term>) -> Self {
        Self::from_node(TermNode::Product(left.into(), right.into()))
    }

    /// `self ^ exponent` for a fixed integer exponent.
    pub fn powi(&self, exponent: i32) -> Self {
        Self::from_node(TermNode::ConstPower(self.clone(), exponent))
    }

    /// `self ^ exponent` for a symbolic exponent.
    pub fn pow(&self, exponent: impl Into<Term>) -> Self {
        Self::from_node(TermNode::TermPower(self.clone(), exponent.into()))
    }

    /// `e ^ self`.
    pub fn exp(&self) -> Self {
        Self::from_node(TermNode::Exp(self.clone()))
    }

    /// Natural logarithm of `self`.
    pub fn ln(&self) -> Self {
        Self::from_node(TermNode::Log(self.clone()))
    }

    /// Square root of `self`.
    pub fn sqrt(&self) -> Self {
        functions::sqrt(self)
    }

    /// Distinct free variables in first-seen order.
    pub fn variables(&self) -> Vec<Variable> {
        let mut seen_nodes = HashSet::new();
        let mut seen_vars = HashSet::new();
        let mut vars = Vec::new();
        self.collect_variables(&mut seen_nodes, &mut seen_vars, &mut vars);
        vars
    }

    fn collect_variables(
        &self,
        seen_nodes: &mut HashSet<usize>,
        seen_vars: &mut HashSet<VariableId>,
        vars: &mut Vec<Variable>,
    ) {
        if !seen_nodes.insert(self.node_key()) {
            return;
        }
        match self.node() {
            TermNode::Zero | TermNode::Constant(_) => {}
            TermNode::Variable(var) => {
                if seen_vars.insert(var.id()) {
                    vars.push(var.clone());
                }
            }
            TermNode::Sum(terms) | TermNode::NaryFunc(_, terms) => {
                for term in terms {
                    term.collect_variables(seen_nodes, seen_vars, vars);
                }
            }
            TermNode::Product(left, right)
            | TermNode::TermPower(left, right)
            | TermNode::BinaryFunc(_, left, right) => {
                left.collect_variables(seen_nodes, seen_vars, vars);
                right.collect_variables(seen_nodes, seen_vars, vars);
            }
            TermNode::ConstPower(arg, _)
            | TermNode::UnaryFunc(_, arg)
            | TermNode::Exp(arg)
            | TermNode::Log(arg) => arg.collect_variables(seen_nodes, seen_vars, vars),
        }
    }

    /// Evaluate the term directly, without compiling it.
    ///
    /// Every free variable must have a value in `values`.
    pub fn evaluate_with(&self, values: &HashMap<Variable, f64>) -> Result<f64> {
        let value = match self.node() {
            TermNode::Zero => 0.0,
            TermNode::Constant(value) => *value,
            TermNode::Variable(var) => *values
                .get(var)
                .ok_or_else(|| AlOptError::UnboundVariable(var.to_string()))?,
            TermNode::Sum(terms) => {
                let mut sum = 0.0;
                for term in terms {
                    sum += term.evaluate_with(values)?;
                }
                sum
            }
            TermNode::Product(left, right) => {
                left.evaluate_with(values)? * right.evaluate_with(values)?
            }
            TermNode::TermPower(base, exponent) => base
                .evaluate_with(values)?
                .powf(exponent.evaluate_with(values)?),
            TermNode::ConstPower(base, exponent) => base.evaluate_with(values)?.powi(*exponent),
            TermNode::UnaryFunc(func, arg) => func.eval(arg.evaluate_with(values)?),
            TermNode::BinaryFunc(func, left, right) => {
                func.eval(left.evaluate_with(values)?, right.evaluate_with(values)?)
            }
            TermNode::NaryFunc(func, args) => {
                let args = args
                    .iter()
                    .map(|arg| arg.evaluate_with(values))
                    .collect::<Result<Vec<_>>>()?;
                func.eval(&args)
            }
            TermNode::Exp(arg) => arg.evaluate_with(values)?.exp(),
            TermNode::Log(arg) => arg.evaluate_with(values)?.ln(),
        };
        Ok(value)
    }

    /// Compile the term against an ordered list of variables.
    pub fn compile(&self, variables: &[Variable]) -> Result<CompiledTerm> {
        CompiledTerm::new(self, variables, &[])
    }

    /// Compile the term against variables and parametric variables.
    ///
    /// Parametric variables receive values at evaluation time but are never
    /// differentiated.
    pub fn compile_parametric(
        &self,
        variables: &[Variable],
        parameters: &[Variable],
    ) -> Result<CompiledTerm> {
        CompiledTerm::new(self, variables, parameters)
    }

    /// Replace the given variables by constants and fold constant subexpressions.
    pub fn substitute(&self, substitutions: &HashMap<Variable, f64>) -> Term {
        substitute(self, substitutions)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node() {
            TermNode::Zero => write!(f, "0"),
            TermNode::Constant(value) => write!(f, "{value}"),
            TermNode::Variable(var) => write!(f, "{var}"),
            TermNode::Sum(terms) => write_list(f, "(", " + ", ")", terms),
            TermNode::Product(left, right) => write!(f, "({left} * {right})"),
            TermNode::TermPower(base, exponent) => write!(f, "({base})^({exponent})"),
            TermNode::ConstPower(base, exponent) => write!(f, "({base})^{exponent}"),
            TermNode::UnaryFunc(func, arg) => write!(f, "{}({arg})", func.name()),
            TermNode::BinaryFunc(func, left, right) => {
                write!(f, "{}({left}, {right})", func.name())
            }
            TermNode::NaryFunc(func, args) => {
                write!(f, "{}", func.name())?;
                write_list(f, "(", ", ", ")", args)
            }
            TermNode::Exp(arg) => write!(f, "exp({arg})"),
            TermNode::Log(arg) => write!(f, "ln({arg})"),
        }
    }
}

fn write_list(
    f: &mut fmt::Formatter<'_>,
    open: &str,
    separator: &str,
    close: &str,
    terms: &[Term],
) -> fmt::Result {
    write!(f, "{open}")?;
    for (i, term) in terms.iter().enumerate() {
        if i > 0 {
            write!(f, "{separator}")?;
        }
        write!(f, "{term}")?;
    }
    write!(f, "{close}")
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Term({self})")
    }
}

impl From<f64> for Term {
    fn from(value: f64) -> Self {
        Term::constant(value)
    }
}

impl From<&Term> for Term {
    fn from(term: &Term) -> Self {
        term.clone()
    }
}

impl From<Variable> for Term {
    fn from(var: Variable) -> Self {
        Term::from_node(TermNode::Variable(var))
    }
}

impl From<&Variable> for Term {
    fn from(var: &Variable) -> Self {
        Term::from(var.clone())
    }
}

fn add_terms(left: Term, right: Term) -> Term {
    match left.node() {
        TermNode::Sum(terms) => {
            let mut terms = terms.clone();
            terms.push(right);
            Term::from_node(TermNode::Sum(terms))
        }
        _ => Term::from_node(TermNode::Sum(vec![left, right])),
    }
}

fn negate(term: Term) -> Term {
    Term::product(Term::constant(-1.0), term)
}

fn sub_terms(left: Term, right: Term) -> Term {
    add_terms(left, negate(right))
}

fn mul_terms(left: Term, right: Term) -> Term {
    Term::product(left, right)
}

fn div_terms(left: Term, right: Term) -> Term {
    Term::product(left, right.powi(-1))
}

macro_rules! impl_term_op {
    ($trait:ident, $method:ident, $combine:ident) => {
        impl<R: Into<Term>> $trait<R> for Term {
            type Output = Term;
            fn $method(self, rhs: R) -> Term {
                $combine(self, rhs.into())
            }
        }

        impl<R: Into<Term>> $trait<R> for &Term {
            type Output = Term;
            fn $method(self, rhs: R) -> Term {
                $combine(self.clone(), rhs.into())
            }
        }

        impl<R: Into<Term>> $trait<R> for Variable {
            type Output = Term;
            fn $method(self, rhs: R) -> Term {
                $combine(Term::from(self), rhs.into())
            }
        }

        impl<R: Into<Term>> $trait<R> for &Variable {
            type Output = Term;
            fn $method(self, rhs: R) -> Term {
                $combine(Term::from(self), rhs.into())
            }
        }

        impl $trait<Term> for f64 {
            type Output = Term;
            fn $method(self, rhs: Term) -> Term {
                $combine(Term::constant(self), rhs)
            }
        }

        impl $trait<&Term> for f64 {
            type Output = Term;
            fn $method(self, rhs: &Term) -> Term {
                $combine(Term::constant(self), rhs.clone())
            }
        }

        impl $trait<Variable> for f64 {
            type Output = Term;
            fn $method(self, rhs: Variable) -> Term {
                $combine(Term::constant(self), Term::from(rhs))
            }
        }

        impl $trait<&Variable> for f64 {
            type Output = Term;
            fn $method(self, rhs: &Variable) -> Term {
                $combine(Term::constant(self), Term::from(rhs))
            }
        }
    };
}

impl_term_op!(Add, add, add_terms);
impl_term_op!(Sub, sub, sub_terms);
impl_term_op!(Mul, mul, mul_terms);
impl_term_op!(Div, div, div_terms);

impl Neg for Term {
    type Output = Term;
    fn neg(self) -> Term {
        negate(self)
    }
}

impl Neg for &Term {
    type Output = Term;
    fn neg(self) -> Term {
        negate(self.clone())
    }
}

impl Neg for Variable {
    type Output = Term;
    fn neg(self) -> Term {
        negate(Term::from(self))
    }
}

impl Neg for &Variable {
    type Output = Term;
    fn neg(self) -> Term {
        negate(Term::from(self))
    }
}
