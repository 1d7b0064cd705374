//! Constrained solvers and their composition.
//!
//! - [`AugmentedLagrangianSolver`] drives an [`AugmentedLagrangianRun`] until a
//!   [`ConvergenceTest`] is satisfied.
//! - [`ConstantPenaltySolver`] performs a single penalized minimization with a
//!   fixed weight, useful as a cheap first stage.
//! - [`MultistageConstrainedOptimizer`] chains solvers, each stage starting from
//!   the previous stage's result.
//!
//! [`AugmentedLagrangianRun`]: super::iterations::AugmentedLagrangianRun

use ndarray::Array1;
use tracing::{debug, warn};

use super::config::AugmentedLagrangianConfig;
use super::convergence::{ConstraintsNormWithGradientNormConvergenceTest, ConvergenceTest};
use super::iterations::{AugmentedLagrangianIterations, PenaltySchedule};
use super::lagrangian::{AugmentedLagrangianCompiler, LagrangianCompiler};
use crate::error::{ensure_len, AlOptError, Result};
use crate::term::{Term, Variable};
use crate::unconstrained::{FirstOrderOptimizer, Lbfgs};

/// Minimizes an objective subject to equality constraints `c_i(x) == 0`.
pub trait ConstrainedSolver {
    /// Solve from `start_point`, returning the values of `variables` in order.
    fn solve(
        &mut self,
        objective: &Term,
        constraints: &[Term],
        variables: &[Variable],
        start_point: &Array1<f64>,
    ) -> Result<Array1<f64>>;
}

impl<S: ConstrainedSolver + ?Sized> ConstrainedSolver for Box<S> {
    fn solve(
        &mut self,
        objective: &Term,
        constraints: &[Term],
        variables: &[Variable],
        start_point: &Array1<f64>,
    ) -> Result<Array1<f64>> {
        (**self).solve(objective, constraints, variables, start_point)
    }
}

/// The augmented Lagrangian method.
///
/// Without a step budget the solve runs until the convergence test accepts an
/// iteration, which may never happen for an infeasible problem. With a budget,
/// running out of outer steps yields [`AlOptError::DidNotConverge`].
#[derive(Debug, Clone)]
pub struct AugmentedLagrangianSolver<
    O = Lbfgs,
    C = AugmentedLagrangianCompiler,
    T = ConstraintsNormWithGradientNormConvergenceTest,
> {
    iterations: AugmentedLagrangianIterations<O, C>,
    convergence_test: T,
    max_steps: Option<usize>,
}

/// L-BFGS sub-solves, the default compiler and the norm convergence test.
pub type DefaultSolver = AugmentedLagrangianSolver;

impl AugmentedLagrangianSolver {
    /// Build the default stack from a configuration.
    pub fn from_config(config: &AugmentedLagrangianConfig) -> Result<Self> {
        config.validate()?;
        let iterations = AugmentedLagrangianIterations::new(
            Lbfgs::new(),
            AugmentedLagrangianCompiler,
            PenaltySchedule::from_config(config),
        );
        let convergence_test = ConstraintsNormWithGradientNormConvergenceTest::new(
            config.constraints_norm_max,
            config.lagrangian_gradient_norm_max,
        );
        Ok(Self::new(iterations, convergence_test).with_max_steps(config.max_steps))
    }
}

impl Default for AugmentedLagrangianSolver {
    fn default() -> Self {
        let config = AugmentedLagrangianConfig::default();
        Self::new(
            AugmentedLagrangianIterations::default(),
            ConstraintsNormWithGradientNormConvergenceTest::new(
                config.constraints_norm_max,
                config.lagrangian_gradient_norm_max,
            ),
        )
    }
}

impl<O, C, T> AugmentedLagrangianSolver<O, C, T>
where
    O: FirstOrderOptimizer,
    C: LagrangianCompiler,
    T: ConvergenceTest,
{
    pub fn new(iterations: AugmentedLagrangianIterations<O, C>, convergence_test: T) -> Self {
        Self {
            iterations,
            convergence_test,
            max_steps: None,
        }
    }

    /// Limit the number of outer steps, accepted or not.
    pub fn with_max_steps(mut self, max_steps: Option<usize>) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn max_steps(&self) -> Option<usize> {
        self.max_steps
    }

    pub fn iterations(&self) -> &AugmentedLagrangianIterations<O, C> {
        &self.iterations
    }

    pub fn convergence_test(&self) -> &T {
        &self.convergence_test
    }
}

impl<O, C, T> ConstrainedSolver for AugmentedLagrangianSolver<O, C, T>
where
    O: FirstOrderOptimizer,
    C: LagrangianCompiler,
    T: ConvergenceTest,
{
    fn solve(
        &mut self,
        objective: &Term,
        constraints: &[Term],
        variables: &[Variable],
        start_point: &Array1<f64>,
    ) -> Result<Array1<f64>> {
        self.convergence_test.reset();
        let mut run = self
            .iterations
            .start(objective, constraints, variables, start_point)?;

        loop {
            if let Some(max_steps) = self.max_steps {
                if run.steps() >= max_steps {
                    warn!(
                        steps = run.steps(),
                        penalty = run.penalty(),
                        "augmented Lagrangian step budget exhausted"
                    );
                    return Err(AlOptError::DidNotConverge { steps: run.steps() });
                }
            }

            if let Some(result) = run.step()? {
                self.convergence_test.update(&result);
                if self.convergence_test.has_converged() {
                    debug!(
                        steps = run.steps(),
                        penalty = run.penalty(),
                        constraints_norm = result.constraints_norm,
                        lagrangian_gradient_norm = result.lagrangian_gradient_norm,
                        "augmented Lagrangian converged"
                    );
                    return Ok(result.values);
                }
            }
        }
    }
}

/// Minimizes `objective + w Σ c_i^2` once, with a fixed weight `w`.
///
/// The constraints are only approximately satisfied; the result is meant as a
/// starting point for a more precise stage.
#[derive(Debug, Clone)]
pub struct ConstantPenaltySolver<O = Lbfgs> {
    penalty_weight: f64,
    gradient_norm_threshold: f64,
    optimizer: O,
}

impl<O: FirstOrderOptimizer> ConstantPenaltySolver<O> {
    pub fn new(penalty_weight: f64, gradient_norm_threshold: f64, optimizer: O) -> Result<Self> {
        if !(penalty_weight.is_finite() && penalty_weight > 0.0) {
            return Err(AlOptError::InvalidConfig(format!(
                "penalty weight must be positive and finite, got {penalty_weight}"
            )));
        }
        if !(gradient_norm_threshold.is_finite() && gradient_norm_threshold > 0.0) {
            return Err(AlOptError::InvalidConfig(format!(
                "gradient norm threshold must be positive and finite, got {gradient_norm_threshold}"
            )));
        }
        Ok(Self {
            penalty_weight,
            gradient_norm_threshold,
            optimizer,
        })
    }

    pub fn penalty_weight(&self) -> f64 {
        self.penalty_weight
    }

    pub fn gradient_norm_threshold(&self) -> f64 {
        self.gradient_norm_threshold
    }

    /// The penalized objective minimized by this solver.
    pub fn penalized_objective(&self, objective: &Term, constraints: &[Term]) -> Term {
        let penalty = Term::sum(constraints.iter().map(|constraint| constraint.powi(2)));
        objective + self.penalty_weight * penalty
    }
}

impl<O: FirstOrderOptimizer> ConstrainedSolver for ConstantPenaltySolver<O> {
    fn solve(
        &mut self,
        objective: &Term,
        constraints: &[Term],
        variables: &[Variable],
        start_point: &Array1<f64>,
    ) -> Result<Array1<f64>> {
        ensure_len("start point", variables.len(), start_point.len())?;
        let compiled = self
            .penalized_objective(objective, constraints)
            .compile(variables)?;
        let penalized = |x: &Array1<f64>| compiled.differentiate(x);
        let solution = self
            .optimizer
            .solve(&penalized, start_point, self.gradient_norm_threshold)?;
        debug!(
            penalty_weight = self.penalty_weight,
            "constant penalty solve finished"
        );
        Ok(solution)
    }
}

/// Runs solvers in order, feeding each stage the previous stage's result.
#[derive(Default)]
pub struct MultistageConstrainedOptimizer {
    stages: Vec<Box<dyn ConstrainedSolver>>,
}

impl MultistageConstrainedOptimizer {
    pub fn new(stages: Vec<Box<dyn ConstrainedSolver>>) -> Self {
        Self { stages }
    }

    /// Append a stage.
    pub fn with_stage(mut self, stage: impl ConstrainedSolver + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl ConstrainedSolver for MultistageConstrainedOptimizer {
    fn solve(
        &mut self,
        objective: &Term,
        constraints: &[Term],
        variables: &[Variable],
        start_point: &Array1<f64>,
    ) -> Result<Array1<f64>> {
        ensure_len("start point", variables.len(), start_point.len())?;
        let stage_count = self.stages.len();
        let mut solution = start_point.clone();
        for (index, stage) in self.stages.iter_mut().enumerate() {
            solution = stage.solve(objective, constraints, variables, &solution)?;
            debug!(stage = index + 1, stages = stage_count, "solver stage finished");
        }
        Ok(solution)
    }
}
