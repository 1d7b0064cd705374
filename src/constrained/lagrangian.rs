//! Compilation of the augmented Lagrangian.
//!
//! For an objective `f`, constraints `c_i`, multipliers `λ_i` and penalty `μ`
//! the augmented Lagrangian is
//!
//! ```text
//! L(x; λ, μ) = f(x) + Σ λ_i c_i(x) + μ Σ c_i(x)^2
//! ```
//!
//! `λ` and `μ` are compiled as parametric variables, so one compilation serves
//! every outer iteration of a solve.

use ndarray::Array1;

use crate::error::{ensure_len, Result};
use crate::term::{CompiledTerm, Term, Variable};

/// A compiled augmented Lagrangian together with its compiled constraints.
pub trait CompiledLagrangian {
    /// Value and gradient (with respect to `x` only) of the augmented Lagrangian,
    /// returned as `(gradient, value)`.
    fn lagrangian_with_gradient(
        &self,
        x: &Array1<f64>,
        multipliers: &[f64],
        mu: f64,
    ) -> Result<(Array1<f64>, f64)>;

    /// The raw constraint values at `x`.
    fn evaluate_constraints(&self, x: &Array1<f64>) -> Result<Array1<f64>>;

    fn constraints_count(&self) -> usize;
}

/// Builds a [`CompiledLagrangian`] for a problem.
pub trait LagrangianCompiler {
    type Output: CompiledLagrangian;

    fn compile(
        &self,
        objective: &Term,
        constraints: &[Term],
        variables: &[Variable],
    ) -> Result<Self::Output>;
}

/// The default compiler, producing [`CompiledAugmentedLagrangian`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct AugmentedLagrangianCompiler;

impl AugmentedLagrangianCompiler {
    pub fn new() -> Self {
        Self
    }

    /// The symbolic augmented Lagrangian over the given multiplier and penalty variables.
    pub fn build_term(objective: &Term, constraints: &[Term], multipliers: &[Variable], mu: &Variable) -> Term {
        let linear = constraints
            .iter()
            .zip(multipliers)
            .map(|(constraint, multiplier)| multiplier * constraint);
        let penalty = Term::sum(constraints.iter().map(|constraint| constraint.powi(2)));
        Term::sum(std::iter::once(objective.clone()).chain(linear).chain([mu * penalty]))
    }
}

impl LagrangianCompiler for AugmentedLagrangianCompiler {
    type Output = CompiledAugmentedLagrangian;

    fn compile(
        &self,
        objective: &Term,
        constraints: &[Term],
        variables: &[Variable],
    ) -> Result<Self::Output> {
        let multipliers: Vec<Variable> = (0..constraints.len()).map(|_| Variable::new()).collect();
        let mu = Variable::named("mu");

        let lagrangian = Self::build_term(objective, constraints, &multipliers, &mu);

        // parameter layout: [mu, λ_0, ..., λ_{m-1}]
        let parameters: Vec<Variable> = std::iter::once(mu).chain(multipliers).collect();
        let lagrangian = lagrangian.compile_parametric(variables, &parameters)?;
        let constraints = constraints
            .iter()
            .map(|constraint| constraint.compile(variables))
            .collect::<Result<Vec<_>>>()?;

        Ok(CompiledAugmentedLagrangian {
            lagrangian,
            constraints,
        })
    }
}

/// Output of [`AugmentedLagrangianCompiler`].
#[derive(Debug, Clone)]
pub struct CompiledAugmentedLagrangian {
    lagrangian: CompiledTerm,
    constraints: Vec<CompiledTerm>,
}

impl CompiledLagrangian for CompiledAugmentedLagrangian {
    fn lagrangian_with_gradient(
        &self,
        x: &Array1<f64>,
        multipliers: &[f64],
        mu: f64,
    ) -> Result<(Array1<f64>, f64)> {
        ensure_len("multipliers", self.constraints.len(), multipliers.len())?;
        let mut parameters = Vec::with_capacity(multipliers.len() + 1);
        parameters.push(mu);
        parameters.extend_from_slice(multipliers);
        self.lagrangian.differentiate_parametric(x, &parameters)
    }

    fn evaluate_constraints(&self, x: &Array1<f64>) -> Result<Array1<f64>> {
        self.constraints
            .iter()
            .map(|constraint| constraint.evaluate(x))
            .collect::<Result<Vec<_>>>()
            .map(Array1::from)
    }

    fn constraints_count(&self) -> usize {
        self.constraints.len()
    }
}
