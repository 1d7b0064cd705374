//! Projection of edit parameters onto their constraints.
//!
//! The projector looks for the smallest change of the parameters that makes all
//! edit constraints hold: it minimizes `Σ (v - v₀)²` over every parameter
//! component `v` touched by a constraint, with `v₀` its current value, subject
//! to the geometric constraint terms.

use std::collections::HashMap;

use ndarray::Array1;
use tracing::{debug, warn};

use super::constraints::{
    parallelism_terms, point_on_line_terms, point_on_plane_term, point_terms, vector_terms,
    EditConstraint,
};
use super::parameter::{EditParameters, ParameterId, ParameterVariable};
use crate::constrained::{ConstrainedSolver, DefaultSolver, OptimizationProblem};
use crate::error::{ensure_len, AlOptError, Result};
use crate::term::{Term, TermVec3, Variable};

/// The least-change problem assembled for a set of edit constraints.
#[derive(Debug, Clone)]
pub struct ProjectionProblem {
    pub objective: Term,
    pub constraints: Vec<Term>,
    /// One entry per solver variable, grouped by parameter.
    pub variables: Vec<ParameterVariable>,
    /// Current values of `variables`, the starting point of the solve.
    pub start_point: Array1<f64>,
}

impl ProjectionProblem {
    /// The solver variables in order.
    pub fn variables(&self) -> Vec<Variable> {
        self.variables
            .iter()
            .map(|parameter_variable| parameter_variable.variable.clone())
            .collect()
    }

    pub fn into_optimization_problem(self) -> OptimizationProblem {
        let variables = self.variables();
        OptimizationProblem::new(self.objective, self.constraints, variables)
    }
}

/// Variables allocated per parameter, in first-use order.
#[derive(Default)]
struct ParameterVariables {
    variables: Vec<ParameterVariable>,
    vectors: HashMap<ParameterId, TermVec3>,
}

impl ParameterVariables {
    fn vector(&mut self, parameters: &EditParameters, id: ParameterId) -> Result<TermVec3> {
        if let Some(vector) = self.vectors.get(&id) {
            return Ok(vector.clone());
        }

        let dimension = parameters.get(id)?.dimension();
        if dimension != 3 {
            return Err(AlOptError::InvalidInput(format!(
                "parameter {id} has dimension {dimension}, expected a 3D point or vector"
            )));
        }
        let allocated: Vec<ParameterVariable> =
            (0..dimension).map(|index| ParameterVariable::new(id, index)).collect();
        let variables: Vec<Variable> = allocated.iter().map(|pv| pv.variable.clone()).collect();
        let vector = TermVec3::from_variables(&variables)?;

        self.variables.extend(allocated);
        self.vectors.insert(id, vector.clone());
        Ok(vector)
    }
}

/// Moves edit parameters as little as possible so that the edit constraints hold.
pub struct ConstraintsProjector<S = DefaultSolver> {
    solver: S,
    constraints: Vec<EditConstraint>,
}

impl<S: ConstrainedSolver> ConstraintsProjector<S> {
    pub fn new(solver: S, constraints: impl IntoIterator<Item = EditConstraint>) -> Self {
        Self {
            solver,
            constraints: constraints.into_iter().collect(),
        }
    }

    pub fn constraints(&self) -> &[EditConstraint] {
        &self.constraints
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Assemble the least-change problem from the current parameter values.
    pub fn build_problem(&self, parameters: &EditParameters) -> Result<ProjectionProblem> {
        let mut allocated = ParameterVariables::default();
        let mut constraint_terms = Vec::new();

        for constraint in &self.constraints {
            match constraint {
                EditConstraint::AxisOnLine {
                    line_point,
                    line_direction,
                    axis_point,
                    axis_direction,
                } => {
                    let axis_point = allocated.vector(parameters, *axis_point)?;
                    let axis_direction = allocated.vector(parameters, *axis_direction)?;
                    let line_point = point_terms(line_point);
                    let line_direction = vector_terms(line_direction);

                    constraint_terms.extend(parallelism_terms(&axis_direction, &line_direction));
                    constraint_terms.extend(point_on_line_terms(&axis_point, &line_point, &line_direction));
                }
                EditConstraint::PointOnPlane {
                    plane_point,
                    plane_normal,
                    point,
                } => {
                    let point = allocated.vector(parameters, *point)?;
                    constraint_terms.push(point_on_plane_term(
                        &point,
                        &point_terms(plane_point),
                        &vector_terms(plane_normal),
                    ));
                }
            }
        }

        let variables = allocated.variables;
        let start_point = current_values(parameters, &variables)?;
        let objective = Term::sum(
            variables
                .iter()
                .zip(start_point.iter())
                .map(|(pv, &current)| (&pv.variable - current).powi(2)),
        );

        Ok(ProjectionProblem {
            objective,
            constraints: constraint_terms,
            variables,
            start_point,
        })
    }

    /// Project the parameters onto the constraints, writing the result back.
    ///
    /// With no constraints nothing is read or written. Otherwise each parameter
    /// referenced by a constraint receives exactly one `set_values` call, after
    /// a successful solve. If a write still fails, the parameters written before
    /// it get their previous values back.
    pub fn project(&mut self, parameters: &mut EditParameters) -> Result<()> {
        if self.constraints.is_empty() {
            debug!("no edit constraints, nothing to project");
            return Ok(());
        }

        let problem = self.build_problem(parameters)?;
        debug!(
            constraints = self.constraints.len(),
            terms = problem.constraints.len(),
            variables = problem.variables.len(),
            "projecting edit parameters"
        );

        let solution = self.solver.solve(
            &problem.objective,
            &problem.constraints,
            &problem.variables(),
            &problem.start_point,
        )?;
        ensure_len("projection solution", problem.variables.len(), solution.len())?;

        apply_solution(parameters, &problem.variables, &solution)
    }
}

fn current_values(parameters: &EditParameters, variables: &[ParameterVariable]) -> Result<Array1<f64>> {
    let mut cache: HashMap<ParameterId, Vec<f64>> = HashMap::new();
    let mut values = Vec::with_capacity(variables.len());
    for pv in variables {
        if !cache.contains_key(&pv.parameter) {
            cache.insert(pv.parameter, parameters.get(pv.parameter)?.values());
        }
        let value = cache
            .get(&pv.parameter)
            .and_then(|parameter_values| parameter_values.get(pv.index))
            .copied()
            .ok_or_else(|| AlOptError::DimensionMismatch(format!("{}[{}] is out of range", pv.parameter, pv.index)))?;
        values.push(value);
    }
    Ok(Array1::from(values))
}

/// One parameter's new values alongside the values it had before.
struct Update {
    id: ParameterId,
    values: Vec<f64>,
    previous: Vec<f64>,
}

fn apply_solution(
    parameters: &mut EditParameters,
    variables: &[ParameterVariable],
    solution: &Array1<f64>,
) -> Result<()> {
    // grouped in first-use order so every parameter is written once
    let mut updates: Vec<Update> = Vec::new();
    let mut slots: HashMap<ParameterId, usize> = HashMap::new();
    for (pv, &value) in variables.iter().zip(solution.iter()) {
        let slot = match slots.get(&pv.parameter) {
            Some(&slot) => slot,
            None => {
                let previous = parameters.get(pv.parameter)?.values();
                updates.push(Update {
                    id: pv.parameter,
                    values: previous.clone(),
                    previous,
                });
                slots.insert(pv.parameter, updates.len() - 1);
                updates.len() - 1
            }
        };
        let component = updates[slot]
            .values
            .get_mut(pv.index)
            .ok_or_else(|| AlOptError::DimensionMismatch(format!("{}[{}] is out of range", pv.parameter, pv.index)))?;
        *component = value;
    }

    // nothing is written unless every parameter can take its values
    for update in &updates {
        let dimension = parameters.get(update.id)?.dimension();
        ensure_len(&format!("values for {}", update.id), dimension, update.values.len())?;
    }

    for (written, update) in updates.iter().enumerate() {
        if let Err(err) = parameters
            .get_mut(update.id)
            .and_then(|parameter| parameter.set_values(&update.values))
        {
            restore(parameters, &updates[..written]);
            return Err(err);
        }
    }
    Ok(())
}

/// Put back the previous values of parameters that were already written.
fn restore(parameters: &mut EditParameters, written: &[Update]) {
    for update in written.iter().rev() {
        if let Err(err) = parameters
            .get_mut(update.id)
            .and_then(|parameter| parameter.set_values(&update.previous))
        {
            warn!(parameter = %update.id, error = %err, "could not restore edit parameter");
        }
    }
}
