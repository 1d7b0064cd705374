//! User-defined function nodes and the built-in functions based on them.

use std::fmt;
use std::sync::Arc;

use super::{Term, TermNode};

type UnaryFn = dyn Fn(f64) -> f64 + Send + Sync;
type BinaryFn = dyn Fn(f64, f64) -> f64 + Send + Sync;
type BinaryDiffFn = dyn Fn(f64, f64) -> (f64, f64) + Send + Sync;
type NaryFn = dyn Fn(&[f64]) -> f64 + Send + Sync;
type NaryDiffFn = dyn Fn(&[f64]) -> Vec<f64> + Send + Sync;

/// A function of one argument together with its derivative.
#[derive(Clone)]
pub struct UnaryFunc {
    name: Arc<str>,
    eval: Arc<UnaryFn>,
    diff: Arc<UnaryFn>,
}

impl UnaryFunc {
    pub fn new<E, D>(name: &str, eval: E, diff: D) -> Self
    where
        E: Fn(f64) -> f64 + Send + Sync + 'static,
        D: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            eval: Arc::new(eval),
            diff: Arc::new(diff),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn eval(&self, x: f64) -> f64 {
        (self.eval)(x)
    }

    pub fn diff(&self, x: f64) -> f64 {
        (self.diff)(x)
    }

    /// Apply the function to a term.
    pub fn apply(&self, arg: impl Into<Term>) -> Term {
        Term::from_node(TermNode::UnaryFunc(self.clone(), arg.into()))
    }
}

impl fmt::Debug for UnaryFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnaryFunc({})", self.name)
    }
}

/// A function of two arguments together with its partial derivatives.
#[derive(Clone)]
pub struct BinaryFunc {
    name: Arc<str>,
    eval: Arc<BinaryFn>,
    diff: Arc<BinaryDiffFn>,
}

impl BinaryFunc {
    pub fn new<E, D>(name: &str, eval: E, diff: D) -> Self
    where
        E: Fn(f64, f64) -> f64 + Send + Sync + 'static,
        D: Fn(f64, f64) -> (f64, f64) + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            eval: Arc::new(eval),
            diff: Arc::new(diff),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn eval(&self, x: f64, y: f64) -> f64 {
        (self.eval)(x, y)
    }

    /// Partial derivatives with respect to the first and second argument.
    pub fn diff(&self, x: f64, y: f64) -> (f64, f64) {
        (self.diff)(x, y)
    }

    pub fn apply(&self, left: impl Into<Term>, right: impl Into<Term>) -> Term {
        Term::from_node(TermNode::BinaryFunc(self.clone(), left.into(), right.into()))
    }
}

impl fmt::Debug for BinaryFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BinaryFunc({})", self.name)
    }
}

/// A function of any number of arguments together with its gradient.
#[derive(Clone)]
pub struct NaryFunc {
    name: Arc<str>,
    eval: Arc<NaryFn>,
    diff: Arc<NaryDiffFn>,
}

impl NaryFunc {
    pub fn new<E, D>(name: &str, eval: E, diff: D) -> Self
    where
        E: Fn(&[f64]) -> f64 + Send + Sync + 'static,
        D: Fn(&[f64]) -> Vec<f64> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            eval: Arc::new(eval),
            diff: Arc::new(diff),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn eval(&self, args: &[f64]) -> f64 {
        (self.eval)(args)
    }

    /// Gradient with respect to every argument; one entry per argument.
    pub fn diff(&self, args: &[f64]) -> Vec<f64> {
        (self.diff)(args)
    }

    pub fn apply<I>(&self, args: I) -> Term
    where
        I: IntoIterator<Item = Term>,
    {
        Term::from_node(TermNode::NaryFunc(
            self.clone(),
            args.into_iter().collect(),
        ))
    }
}

impl fmt::Debug for NaryFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NaryFunc({})", self.name)
    }
}

pub fn sin(arg: impl Into<Term>) -> Term {
    UnaryFunc::new("sin", f64::sin, f64::cos).apply(arg)
}

pub fn cos(arg: impl Into<Term>) -> Term {
    UnaryFunc::new("cos", f64::cos, |x| -x.sin()).apply(arg)
}

pub fn tan(arg: impl Into<Term>) -> Term {
    UnaryFunc::new("tan", f64::tan, |x| {
        let c = x.cos();
        1.0 / (c * c)
    })
    .apply(arg)
}

pub fn abs(arg: impl Into<Term>) -> Term {
    UnaryFunc::new("abs", f64::abs, f64::signum).apply(arg)
}

pub fn sqrt(arg: impl Into<Term>) -> Term {
    UnaryFunc::new("sqrt", f64::sqrt, |x| 0.5 / x.sqrt()).apply(arg)
}

/// `atan2(y, x)`.
pub fn atan2(y: impl Into<Term>, x: impl Into<Term>) -> Term {
    BinaryFunc::new("atan2", f64::atan2, |y, x| {
        let r2 = x * x + y * y;
        (x / r2, -y / r2)
    })
    .apply(y, x)
}

/// Maximum of the arguments. The derivative flows to the first maximal argument.
pub fn max<I>(args: I) -> Term
where
    I: IntoIterator<Item = Term>,
{
    NaryFunc::new(
        "max",
        |xs| xs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        |xs| indicator(xs, |candidate, best| candidate > best),
    )
    .apply(args)
}

/// Minimum of the arguments. The derivative flows to the first minimal argument.
pub fn min<I>(args: I) -> Term
where
    I: IntoIterator<Item = Term>,
{
    NaryFunc::new(
        "min",
        |xs| xs.iter().copied().fold(f64::INFINITY, f64::min),
        |xs| indicator(xs, |candidate, best| candidate < best),
    )
    .apply(args)
}

fn indicator(xs: &[f64], better: impl Fn(f64, f64) -> bool) -> Vec<f64> {
    let mut gradient = vec![0.0; xs.len()];
    let mut best: Option<usize> = None;
    for (i, &x) in xs.iter().enumerate() {
        match best {
            Some(b) if !better(x, xs[b]) => {}
            _ => best = Some(i),
        }
    }
    if let Some(b) = best {
        gradient[b] = 1.0;
    }
    gradient
}
