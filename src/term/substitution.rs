//! Variable substitution with constant folding.

use std::collections::HashMap;

use super::{Term, TermNode, Variable};
use crate::error::{ensure_len, Result};

/// Replace every occurrence of the mapped variables by constants.
///
/// Any subexpression whose children all become constants is folded into a
/// single constant. Subexpressions that contain none of the mapped variables
/// are returned as the very same shared node, so substituting into a large
/// term allocates only along the paths that actually change.
pub fn substitute(term: &Term, substitutions: &HashMap<Variable, f64>) -> Term {
    if substitutions.is_empty() {
        return term.clone();
    }
    Substituter {
        substitutions,
        cache: HashMap::new(),
    }
    .visit(term)
}

/// Substitute `values[i]` for `variables[i]`.
pub fn substitute_values(term: &Term, variables: &[Variable], values: &[f64]) -> Result<Term> {
    ensure_len("substituted values", variables.len(), values.len())?;
    let substitutions: HashMap<Variable, f64> = variables
        .iter()
        .cloned()
        .zip(values.iter().copied())
        .collect();
    Ok(substitute(term, &substitutions))
}

struct Substituter<'a> {
    substitutions: &'a HashMap<Variable, f64>,
    cache: HashMap<usize, Term>,
}

impl Substituter<'_> {
    fn visit(&mut self, term: &Term) -> Term {
        if let Some(done) = self.cache.get(&term.node_key()) {
            return done.clone();
        }
        let result = self.rewrite(term);
        self.cache.insert(term.node_key(), result.clone());
        result
    }

    fn visit_all(&mut self, terms: &[Term]) -> Vec<Term> {
        terms.iter().map(|term| self.visit(term)).collect()
    }

    fn rewrite(&mut self, term: &Term) -> Term {
        match term.node() {
            TermNode::Zero | TermNode::Constant(_) => term.clone(),
            TermNode::Variable(var) => match self.substitutions.get(var) {
                Some(&value) => Term::constant(value),
                None => term.clone(),
            },
            TermNode::Sum(terms) => {
                let visited = self.visit_all(terms);
                if unchanged(terms, &visited) {
                    return term.clone();
                }
                fold_sum(visited)
            }
            TermNode::Product(left, right) => {
                let (l, r) = (self.visit(left), self.visit(right));
                match (l.as_constant(), r.as_constant()) {
                    (Some(a), Some(b)) => Term::constant(a * b),
                    _ if l.ptr_eq(left) && r.ptr_eq(right) => term.clone(),
                    _ => Term::from_node(TermNode::Product(l, r)),
                }
            }
            TermNode::TermPower(base, exponent) => {
                let (b, e) = (self.visit(base), self.visit(exponent));
                match (b.as_constant(), e.as_constant()) {
                    (Some(b), Some(e)) => Term::constant(b.powf(e)),
                    _ if b.ptr_eq(base) && e.ptr_eq(exponent) => term.clone(),
                    _ => Term::from_node(TermNode::TermPower(b, e)),
                }
            }
            TermNode::ConstPower(base, exponent) => {
                let b = self.visit(base);
                match b.as_constant() {
                    Some(value) => Term::constant(value.powi(*exponent)),
                    None if b.ptr_eq(base) => term.clone(),
                    None => Term::from_node(TermNode::ConstPower(b, *exponent)),
                }
            }
            TermNode::UnaryFunc(func, arg) => {
                let a = self.visit(arg);
                match a.as_constant() {
                    Some(value) => Term::constant(func.eval(value)),
                    None if a.ptr_eq(arg) => term.clone(),
                    None => Term::from_node(TermNode::UnaryFunc(func.clone(), a)),
                }
            }
            TermNode::BinaryFunc(func, left, right) => {
                let (l, r) = (self.visit(left), self.visit(right));
                match (l.as_constant(), r.as_constant()) {
                    (Some(a), Some(b)) => Term::constant(func.eval(a, b)),
                    _ if l.ptr_eq(left) && r.ptr_eq(right) => term.clone(),
                    _ => Term::from_node(TermNode::BinaryFunc(func.clone(), l, r)),
                }
            }
            TermNode::NaryFunc(func, args) => {
                let visited = self.visit_all(args);
                if let Some(values) = constants(&visited) {
                    return Term::constant(func.eval(&values));
                }
                if unchanged(args, &visited) {
                    return term.clone();
                }
                Term::from_node(TermNode::NaryFunc(func.clone(), visited))
            }
            TermNode::Exp(arg) => {
                let a = self.visit(arg);
                match a.as_constant() {
                    Some(value) => Term::constant(value.exp()),
                    None if a.ptr_eq(arg) => term.clone(),
                    None => Term::from_node(TermNode::Exp(a)),
                }
            }
            TermNode::Log(arg) => {
                let a = self.visit(arg);
                match a.as_constant() {
                    Some(value) => Term::constant(value.ln()),
                    None if a.ptr_eq(arg) => term.clone(),
                    None => Term::from_node(TermNode::Log(a)),
                }
            }
        }
    }
}

fn unchanged(original: &[Term], visited: &[Term]) -> bool {
    original.iter().zip(visited).all(|(a, b)| a.ptr_eq(b))
}

fn constants(terms: &[Term]) -> Option<Vec<f64>> {
    terms.iter().map(Term::as_constant).collect()
}

/// Rebuild a sum, merging all constant summands into one.
fn fold_sum(terms: Vec<Term>) -> Term {
    let mut constant = 0.0;
    let mut rest = Vec::with_capacity(terms.len());
    for term in terms {
        match term.as_constant() {
            Some(value) => constant += value,
            None => rest.push(term),
        }
    }
    if constant != 0.0 || rest.is_empty() {
        rest.push(Term::constant(constant));
    }
    Term::sum(rest)
}
