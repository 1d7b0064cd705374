//! Nonlinear conjugate gradient (Polak–Ribière) backed by `argmin`.

use std::cell::RefCell;

use argmin::solver::conjugategradient::{beta::PolakRibiere, NonlinearConjugateGradient};
use ndarray::Array1;
use tracing::debug;

use super::adapter::{best_point, configuration_error, run_solver, ObjectiveAdapter, Point, Progress, SolverRun};
use super::convergence::{norm, ConvergenceParams, MinimizationReport, TerminationReason};
use super::lbfgs::MoreThuente;
use super::{FirstOrderOptimizer, ObjectiveWithGradient};
use crate::error::Result;

type PolakRibiereCg = NonlinearConjugateGradient<Point, MoreThuente, PolakRibiere, f64>;

/// Configuration for the conjugate gradient solver.
#[derive(Debug, Clone)]
pub struct ConjugateGradientConfig {
    /// Restart with steepest descent every this many iterations.
    /// `None` restarts every `n` iterations, `n` being the problem dimension.
    pub restart_interval: Option<usize>,
    /// Termination parameters.
    pub convergence: ConvergenceParams,
}

impl Default for ConjugateGradientConfig {
    fn default() -> Self {
        Self {
            restart_interval: None,
            convergence: ConvergenceParams {
                max_iterations: 10_000,
                ..ConvergenceParams::default()
            },
        }
    }
}

/// Polak–Ribière conjugate gradient with a strong-Wolfe More-Thuente line search.
///
/// Each restart cycle is one `argmin` run. The gradient threshold and the
/// stall checks are applied between cycles, and a cycle whose line search
/// fails resumes from the lowest point it reached.
#[derive(Debug, Clone, Default)]
pub struct ConjugateGradient {
    config: ConjugateGradientConfig,
}

impl ConjugateGradient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ConjugateGradientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConjugateGradientConfig {
        &self.config
    }

    fn build(&self) -> Result<PolakRibiereCg> {
        let line_search = MoreThuente::new().with_c(1e-4, 0.1).map_err(configuration_error)?;
        Ok(NonlinearConjugateGradient::new(line_search, PolakRibiere::new()))
    }

    /// Minimize `objective` from `initial` and report how the run ended.
    pub fn minimize(
        &self,
        objective: &ObjectiveWithGradient<'_>,
        initial: &Array1<f64>,
        gradient_norm_threshold: f64,
    ) -> Result<MinimizationReport> {
        let params = &self.config.convergence;
        let restart_interval = self
            .config
            .restart_interval
            .unwrap_or(initial.len())
            .max(1);

        let progress = RefCell::new(Progress::default());
        let adapter = ObjectiveAdapter::new(objective, &progress);

        let mut point = initial.clone();
        let (gradient, mut value) = adapter.evaluate(&point)?;
        let mut gradient_norm = norm(&gradient);
        let mut iterations = 0;

        let termination = loop {
            if gradient_norm <= gradient_norm_threshold {
                break TerminationReason::GradientNorm;
            }
            if iterations >= params.max_iterations {
                break TerminationReason::MaxIterations;
            }

            let budget = restart_interval.min(params.max_iterations - iterations);
            let (next, performed, failed) = match run_solver(adapter, self.build()?, &point, budget)? {
                SolverRun::Finished {
                    point: Some(next),
                    iterations: performed,
                    ..
                } => (next, performed, false),
                SolverRun::Finished { point: None, .. } => (best_point(&progress)?, budget, true),
                SolverRun::Failed { message } => {
                    debug!(%message, "conjugate gradient cycle stopped early");
                    (best_point(&progress)?, budget, true)
                }
            };
            iterations += performed.max(1);

            let (next_gradient, next_value) = adapter.evaluate(&next)?;
            let stalled = params.function_stalled(value, next_value);
            point = next;
            value = next_value;
            gradient_norm = norm(&next_gradient);

            if gradient_norm <= gradient_norm_threshold {
                break TerminationReason::GradientNorm;
            }
            if stalled {
                break if failed {
                    TerminationReason::LineSearchStall
                } else {
                    TerminationReason::FunctionChange
                };
            }
        };

        let evaluations = progress.borrow().evaluations();
        Ok(MinimizationReport {
            point,
            value,
            gradient_norm,
            iterations,
            evaluations,
            termination,
        })
    }
}

impl FirstOrderOptimizer for ConjugateGradient {
    fn solve(
        &self,
        objective: &ObjectiveWithGradient<'_>,
        initial: &Array1<f64>,
        gradient_norm_threshold: f64,
    ) -> Result<Array1<f64>> {
        let report = self.minimize(objective, initial, gradient_norm_threshold)?;
        debug!(
            iterations = report.iterations,
            evaluations = report.evaluations,
            gradient_norm = report.gradient_norm,
            termination = %report.termination,
            "conjugate gradient finished"
        );
        report.into_result()
    }
}
