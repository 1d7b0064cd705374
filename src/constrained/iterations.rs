//! The augmented Lagrangian outer iteration as an explicit state machine.
//!
//! [`AugmentedLagrangianIterations::start`] compiles the problem once and
//! returns an [`AugmentedLagrangianRun`]. Every call to
//! [`AugmentedLagrangianRun::step`] minimizes the current Lagrangian with the
//! unconstrained optimizer and then either
//!
//! - accepts the new point (constraints norm below the current threshold),
//!   emitting an [`IterationResult`], updating the multipliers and tightening
//!   the thresholds, or
//! - rejects it, growing the penalty and resetting the thresholds from it.
//!
//! A run never stops on its own; callers decide when to stop, usually with a
//! [`ConvergenceTest`](super::convergence::ConvergenceTest).

use ndarray::Array1;
use tracing::debug;

use super::config::AugmentedLagrangianConfig;
use super::lagrangian::{AugmentedLagrangianCompiler, CompiledLagrangian, LagrangianCompiler};
use crate::error::{ensure_len, Result};
use crate::term::{Term, Variable};
use crate::unconstrained::convergence::norm;
use crate::unconstrained::{FirstOrderOptimizer, Lbfgs};

/// Output of an accepted outer iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationResult {
    /// The point found by the sub-solve.
    pub values: Array1<f64>,
    /// Euclidean norm of the constraint values at `values`.
    pub constraints_norm: f64,
    /// Norm of the Lagrangian gradient at `values`, under the multipliers used
    /// for the sub-solve.
    pub lagrangian_gradient_norm: f64,
}

/// How the penalty and the acceptance thresholds evolve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PenaltySchedule {
    pub start_penalty: f64,
    pub penalty_max: f64,
    pub penalty_growth: f64,
    pub constraints_norm_lower_bound: f64,
    pub lagrangian_gradient_norm_lower_bound: f64,
}

impl Default for PenaltySchedule {
    fn default() -> Self {
        Self::from_config(&AugmentedLagrangianConfig::default())
    }
}

impl PenaltySchedule {
    pub fn from_config(config: &AugmentedLagrangianConfig) -> Self {
        Self {
            start_penalty: config.start_penalty,
            penalty_max: config.penalty_max,
            penalty_growth: config.penalty_growth,
            constraints_norm_lower_bound: config.constraints_norm_lower_bound,
            lagrangian_gradient_norm_lower_bound: config.lagrangian_gradient_norm_lower_bound,
        }
    }

    /// Initial `(max_constraints_norm, max_lagrangian_gradient_norm)` for a penalty.
    pub fn thresholds(&self, penalty: f64) -> (f64, f64) {
        (
            (1.0 / penalty.powf(0.1)).max(self.constraints_norm_lower_bound),
            (1.0 / penalty).max(self.lagrangian_gradient_norm_lower_bound),
        )
    }

    /// The penalty after a rejected step. Never below `penalty`.
    pub fn grow(&self, penalty: f64) -> f64 {
        (penalty * self.penalty_growth).max(penalty).min(self.penalty_max)
    }
}

/// Factory of augmented Lagrangian runs.
#[derive(Debug, Clone, Default)]
pub struct AugmentedLagrangianIterations<O = Lbfgs, C = AugmentedLagrangianCompiler> {
    optimizer: O,
    compiler: C,
    schedule: PenaltySchedule,
}

impl<O, C> AugmentedLagrangianIterations<O, C>
where
    O: FirstOrderOptimizer,
    C: LagrangianCompiler,
{
    pub fn new(optimizer: O, compiler: C, schedule: PenaltySchedule) -> Self {
        Self {
            optimizer,
            compiler,
            schedule,
        }
    }

    pub fn schedule(&self) -> &PenaltySchedule {
        &self.schedule
    }

    pub fn optimizer(&self) -> &O {
        &self.optimizer
    }

    /// Compile the problem and set up a fresh run at `start_point`.
    ///
    /// Multipliers start at zero and the penalty at the schedule's start penalty.
    pub fn start(
        &self,
        objective: &Term,
        constraints: &[Term],
        variables: &[Variable],
        start_point: &Array1<f64>,
    ) -> Result<AugmentedLagrangianRun<'_, O, C::Output>> {
        ensure_len("start point", variables.len(), start_point.len())?;
        let lagrangian = self.compiler.compile(objective, constraints, variables)?;

        let penalty = self.schedule.start_penalty;
        let (max_constraints_norm, max_lagrangian_gradient_norm) = self.schedule.thresholds(penalty);

        Ok(AugmentedLagrangianRun {
            optimizer: &self.optimizer,
            schedule: self.schedule,
            multipliers: vec![0.0; lagrangian.constraints_count()],
            lagrangian,
            point: start_point.clone(),
            penalty,
            max_constraints_norm,
            max_lagrangian_gradient_norm,
            steps: 0,
        })
    }
}

/// State of one augmented Lagrangian solve.
pub struct AugmentedLagrangianRun<'a, O, L> {
    optimizer: &'a O,
    lagrangian: L,
    schedule: PenaltySchedule,
    point: Array1<f64>,
    multipliers: Vec<f64>,
    penalty: f64,
    max_constraints_norm: f64,
    max_lagrangian_gradient_norm: f64,
    steps: usize,
}

impl<O, L> AugmentedLagrangianRun<'_, O, L>
where
    O: FirstOrderOptimizer,
    L: CompiledLagrangian,
{
    /// Perform one outer iteration.
    ///
    /// Returns `Some` for an accepted step and `None` for a rejected one.
    /// Sub-solver failures are returned as errors and leave the state untouched.
    pub fn step(&mut self) -> Result<Option<IterationResult>> {
        let point = {
            let lagrangian = &self.lagrangian;
            let multipliers = &self.multipliers;
            let penalty = self.penalty;
            let objective = |x: &Array1<f64>| lagrangian.lagrangian_with_gradient(x, multipliers, penalty);
            self.optimizer
                .solve(&objective, &self.point, self.max_lagrangian_gradient_norm)?
        };
        let constraint_values = self.lagrangian.evaluate_constraints(&point)?;
        let constraints_norm = norm(&constraint_values);

        self.steps += 1;
        self.point = point;

        if constraints_norm < self.max_constraints_norm {
            let (gradient, _) =
                self.lagrangian
                    .lagrangian_with_gradient(&self.point, &self.multipliers, self.penalty)?;
            let lagrangian_gradient_norm = norm(&gradient);

            for (multiplier, value) in self.multipliers.iter_mut().zip(constraint_values.iter()) {
                *multiplier += value * self.penalty;
            }
            self.max_constraints_norm = (self.max_constraints_norm / self.penalty.powf(0.9))
                .max(self.schedule.constraints_norm_lower_bound);
            self.max_lagrangian_gradient_norm = (self.max_lagrangian_gradient_norm / self.penalty)
                .max(self.schedule.lagrangian_gradient_norm_lower_bound);

            debug!(
                step = self.steps,
                penalty = self.penalty,
                constraints_norm,
                lagrangian_gradient_norm,
                "accepted augmented Lagrangian step"
            );

            Ok(Some(IterationResult {
                values: self.point.clone(),
                constraints_norm,
                lagrangian_gradient_norm,
            }))
        } else {
            self.penalty = self.schedule.grow(self.penalty);
            let (max_constraints_norm, max_lagrangian_gradient_norm) =
                self.schedule.thresholds(self.penalty);
            self.max_constraints_norm = max_constraints_norm;
            self.max_lagrangian_gradient_norm = max_lagrangian_gradient_norm;

            debug!(
                step = self.steps,
                penalty = self.penalty,
                constraints_norm,
                "rejected augmented Lagrangian step"
            );

            Ok(None)
        }
    }

    /// Current penalty parameter `μ`.
    pub fn penalty(&self) -> f64 {
        self.penalty
    }

    /// Current Lagrange multiplier estimates, one per constraint.
    pub fn multipliers(&self) -> &[f64] {
        &self.multipliers
    }

    pub fn max_constraints_norm(&self) -> f64 {
        self.max_constraints_norm
    }

    pub fn max_lagrangian_gradient_norm(&self) -> f64 {
        self.max_lagrangian_gradient_norm
    }

    /// The latest point, whether or not its step was accepted.
    pub fn current_point(&self) -> &Array1<f64> {
        &self.point
    }

    /// Number of completed outer steps.
    pub fn steps(&self) -> usize {
        self.steps
    }
}
