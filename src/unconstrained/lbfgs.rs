//! Limited-memory BFGS backed by `argmin`.

use std::cell::RefCell;

use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use ndarray::Array1;
use tracing::debug;

use super::adapter::{configuration_error, run_solver, ObjectiveAdapter, Point, Progress};
use super::convergence::{norm, ConvergenceParams, MinimizationReport, TerminationReason};
use super::{FirstOrderOptimizer, ObjectiveWithGradient};
use crate::error::Result;

/// Default number of correction pairs kept by L-BFGS.
pub const DEFAULT_LBFGS_MEMORY: usize = 7;

/// More-Thuente line search over the crate's vector types.
pub(crate) type MoreThuente = MoreThuenteLineSearch<Point, Point, f64>;

/// Configuration for the L-BFGS solver.
#[derive(Debug, Clone)]
pub struct LbfgsConfig {
    /// Number of recent (s, y) pairs to store.
    pub memory: usize,
    /// Termination parameters.
    pub convergence: ConvergenceParams,
}

impl Default for LbfgsConfig {
    fn default() -> Self {
        Self {
            memory: DEFAULT_LBFGS_MEMORY,
            convergence: ConvergenceParams::default(),
        }
    }
}

/// L-BFGS with a More-Thuente line search.
#[derive(Debug, Clone, Default)]
pub struct Lbfgs {
    config: LbfgsConfig,
}

impl Lbfgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LbfgsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LbfgsConfig {
        &self.config
    }

    fn build(&self, gradient_norm_threshold: f64) -> Result<LBFGS<MoreThuente, Point, Point, f64>> {
        LBFGS::new(MoreThuente::new(), self.config.memory)
            .with_tolerance_grad(gradient_norm_threshold)
            .and_then(|solver| solver.with_tolerance_cost(self.config.convergence.function_tolerance))
            .map_err(configuration_error)
    }

    /// Minimize `objective` from `initial` and report how the run ended.
    ///
    /// Objective errors and non-finite evaluations are returned as `Err`;
    /// running out of iterations is described by the report.
    pub fn minimize(
        &self,
        objective: &ObjectiveWithGradient<'_>,
        initial: &Array1<f64>,
        gradient_norm_threshold: f64,
    ) -> Result<MinimizationReport> {
        let progress = RefCell::new(Progress::default());
        let adapter = ObjectiveAdapter::new(objective, &progress);

        let (gradient, value) = adapter.evaluate(initial)?;
        let gradient_norm = norm(&gradient);
        if gradient_norm <= gradient_norm_threshold {
            return Ok(MinimizationReport {
                point: initial.clone(),
                value,
                gradient_norm,
                iterations: 0,
                evaluations: progress.borrow().evaluations(),
                termination: TerminationReason::GradientNorm,
            });
        }

        let solver = self.build(gradient_norm_threshold)?;
        run_solver(adapter, solver, initial, self.config.convergence.max_iterations)?.into_report(
            adapter,
            &progress,
            gradient_norm_threshold,
        )
    }
}

impl FirstOrderOptimizer for Lbfgs {
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
            "L-BFGS finished"
        );
        report.into_result()
    }
}
