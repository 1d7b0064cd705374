//! Bridge between [`ObjectiveWithGradient`] closures and the `argmin` solvers.
//!
//! The objectives in this crate return value and gradient from one call, while
//! `argmin` asks for them separately. [`ObjectiveAdapter`] evaluates once per
//! point and serves the second request from a cache. It also remembers the
//! lowest point seen so a run that dies inside a line search still has a
//! usable answer.

use std::cell::RefCell;

use argmin::core::{
    CostFunction, Error, Executor, Gradient, IterState, Solver, State, TerminationReason as ArgminReason,
    TerminationStatus,
};
use ndarray::Array1;
use tracing::debug;

use super::convergence::{all_finite, norm, MinimizationReport, TerminationReason};
use super::ObjectiveWithGradient;
use crate::error::{AlOptError, Result};

/// Parameter and gradient type shared with `argmin`.
pub(crate) type Point = Array1<f64>;

/// Iteration state of every first-order `argmin` solver used here.
pub(crate) type ArgminState = IterState<Point, Point, (), (), (), f64>;

#[derive(Debug, Clone)]
struct Evaluation {
    point: Point,
    gradient: Point,
    value: f64,
}

/// Evaluation bookkeeping that outlives a single `argmin` run.
#[derive(Debug, Default)]
pub(crate) struct Progress {
    last: Option<Evaluation>,
    best: Option<Evaluation>,
    evaluations: usize,
}

impl Progress {
    fn record(&mut self, evaluation: Evaluation) {
        self.evaluations += 1;
        if self.best.as_ref().map_or(true, |best| evaluation.value < best.value) {
            self.best = Some(evaluation.clone());
        }
        self.last = Some(evaluation);
    }

    /// Number of calls made to the wrapped objective.
    pub(crate) fn evaluations(&self) -> usize {
        self.evaluations
    }

    /// The lowest point evaluated so far with its value.
    pub(crate) fn best(&self) -> Option<(Point, f64)> {
        self.best.as_ref().map(|best| (best.point.clone(), best.value))
    }
}

/// Exposes an [`ObjectiveWithGradient`] as an `argmin` problem.
#[derive(Clone, Copy)]
pub(crate) struct ObjectiveAdapter<'a, 'b> {
    objective: &'a ObjectiveWithGradient<'b>,
    progress: &'a RefCell<Progress>,
}

impl<'a, 'b> ObjectiveAdapter<'a, 'b> {
    pub(crate) fn new(objective: &'a ObjectiveWithGradient<'b>, progress: &'a RefCell<Progress>) -> Self {
        Self { objective, progress }
    }

    /// Gradient and value at `point`, evaluating the objective only on a cache miss.
    ///
    /// Non-finite values or gradients are reported as [`AlOptError::NumericalError`].
    pub(crate) fn evaluate(&self, point: &Point) -> Result<(Point, f64)> {
        if let Some(last) = &self.progress.borrow().last {
            if &last.point == point {
                return Ok((last.gradient.clone(), last.value));
            }
        }

        let (gradient, value) = (self.objective)(point)?;
        if !value.is_finite() || !all_finite(&gradient) {
            return Err(AlOptError::NumericalError(format!(
                "objective or gradient is non-finite at {point}"
            )));
        }

        self.progress.borrow_mut().record(Evaluation {
            point: point.clone(),
            gradient: gradient.clone(),
            value,
        });
        Ok((gradient, value))
    }
}

impl CostFunction for ObjectiveAdapter<'_, '_> {
    type Param = Point;
    type Output = f64;

    fn cost(&self, point: &Self::Param) -> std::result::Result<Self::Output, Error> {
        Ok(self.evaluate(point)?.1)
    }
}

impl Gradient for ObjectiveAdapter<'_, '_> {
    type Param = Point;
    type Gradient = Point;

    fn gradient(&self, point: &Self::Param) -> std::result::Result<Self::Gradient, Error> {
        Ok(self.evaluate(point)?.0)
    }
}

/// How an `argmin` run ended.
#[derive(Debug)]
pub(crate) enum SolverRun {
    /// The executor stopped on its own.
    Finished {
        point: Option<Point>,
        iterations: usize,
        status: TerminationStatus,
    },
    /// The solver raised an error of its own, usually from the line search.
    Failed { message: String },
}

/// Run `solver` from `initial` for at most `max_iterations` iterations.
///
/// Errors raised by the objective come back unchanged; errors raised by
/// `argmin` itself are reported as [`SolverRun::Failed`].
pub(crate) fn run_solver<'a, 'b, S>(
    adapter: ObjectiveAdapter<'a, 'b>,
    solver: S,
    initial: &Point,
    max_iterations: usize,
) -> Result<SolverRun>
where
    S: Solver<ObjectiveAdapter<'a, 'b>, ArgminState>,
{
    let executor = Executor::new(adapter, solver)
        .configure(|state| state.param(initial.clone()).max_iters(max_iterations as u64));

    match executor.run() {
        Ok(result) => {
            let state = result.state();
            Ok(SolverRun::Finished {
                point: state.get_best_param().cloned(),
                iterations: state.get_iter() as usize,
                status: state.get_termination_status().clone(),
            })
        }
        Err(err) => match err.downcast::<AlOptError>() {
            Ok(objective_error) => Err(objective_error),
            Err(err) => Ok(SolverRun::Failed {
                message: err.to_string(),
            }),
        },
    }
}

/// Converts an `argmin` configuration error.
pub(crate) fn configuration_error(err: Error) -> AlOptError {
    AlOptError::InvalidConfig(err.to_string())
}

impl SolverRun {
    /// Turn a single run into a report, evaluating the final point through `adapter`.
    pub(crate) fn into_report(
        self,
        adapter: ObjectiveAdapter<'_, '_>,
        progress: &RefCell<Progress>,
        gradient_norm_threshold: f64,
    ) -> Result<MinimizationReport> {
        let (point, iterations, termination) = match self {
            SolverRun::Finished {
                point,
                iterations,
                status,
            } => {
                let point = match point {
                    Some(point) => point,
                    None => best_point(progress)?,
                };
                (point, iterations, termination_of(&status)?)
            }
            SolverRun::Failed { message } => {
                debug!(%message, "argmin run stopped early");
                (best_point(progress)?, 0, TerminationReason::LineSearchStall)
            }
        };

        let (gradient, value) = adapter.evaluate(&point)?;
        let gradient_norm = norm(&gradient);
        let termination = match termination {
            TerminationReason::FunctionChange if gradient_norm <= gradient_norm_threshold => {
                TerminationReason::GradientNorm
            }
            other => other,
        };

        Ok(MinimizationReport {
            point,
            value,
            gradient_norm,
            iterations,
            evaluations: progress.borrow().evaluations(),
            termination,
        })
    }
}

/// The lowest point the objective was evaluated at.
pub(crate) fn best_point(progress: &RefCell<Progress>) -> Result<Point> {
    progress
        .borrow()
        .best()
        .map(|(point, _)| point)
        .ok_or_else(|| AlOptError::ConvergenceFailure("no point was ever evaluated".to_string()))
}

/// Map an `argmin` termination status onto [`TerminationReason`].
///
/// A solver-declared convergence is reported as [`TerminationReason::FunctionChange`]
/// until the caller has checked the gradient norm.
fn termination_of(status: &TerminationStatus) -> Result<TerminationReason> {
    match status {
        TerminationStatus::Terminated(ArgminReason::MaxItersReached) => Ok(TerminationReason::MaxIterations),
        TerminationStatus::Terminated(ArgminReason::SolverConverged)
        | TerminationStatus::Terminated(ArgminReason::TargetCostReached) => Ok(TerminationReason::FunctionChange),
        other => Err(AlOptError::ConvergenceFailure(format!("argmin stopped with {other:?}"))),
    }
}
