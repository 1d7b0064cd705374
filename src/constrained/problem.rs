//! Constrained optimization problem definition.
//!
//! An [`OptimizationProblem`] bundles an objective term, the constraint terms
//! that are driven toward zero and the ordered variables that make up the
//! solution vector.

use std::collections::HashSet;

use ndarray::Array1;

use super::solver::ConstrainedSolver;
use crate::error::{ensure_len, AlOptError, Result};
use crate::term::{Term, Variable};

/// Minimize `objective` subject to `constraints[i] == 0`.
#[derive(Debug, Clone)]
pub struct OptimizationProblem {
    /// The function to minimize.
    pub objective: Term,

    /// Terms whose values are driven toward zero.
    pub constraints: Vec<Term>,

    /// Ordered variables; the solution vector follows this order.
    pub variables: Vec<Variable>,
}

impl OptimizationProblem {
    pub fn new(objective: Term, constraints: Vec<Term>, variables: Vec<Variable>) -> Self {
        Self {
            objective,
            constraints,
            variables,
        }
    }

    pub fn constraints_count(&self) -> usize {
        self.constraints.len()
    }

    /// Check that the variables are distinct and that every free variable of
    /// the objective and the constraints is listed.
    pub fn validate(&self) -> Result<()> {
        let mut listed = HashSet::with_capacity(self.variables.len());
        for var in &self.variables {
            if !listed.insert(var.id()) {
                return Err(AlOptError::DuplicateVariable(var.to_string()));
            }
        }

        for term in std::iter::once(&self.objective).chain(&self.constraints) {
            if let Some(missing) = term.variables().into_iter().find(|var| !listed.contains(&var.id())) {
                return Err(AlOptError::UnboundVariable(missing.to_string()));
            }
        }
        Ok(())
    }

    /// Solve the problem with `solver` starting from `start_point`.
    pub fn solve_with(
        &self,
        solver: &mut dyn ConstrainedSolver,
        start_point: &Array1<f64>,
    ) -> Result<Array1<f64>> {
        ensure_len("start point", self.variables.len(), start_point.len())?;
        solver.solve(&self.objective, &self.constraints, &self.variables, start_point)
    }
}
