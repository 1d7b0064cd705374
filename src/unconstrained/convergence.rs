//! Termination criteria and reports for the unconstrained optimizers.

use std::fmt;

use ndarray::Array1;

use crate::error::{AlOptError, Result};

/// Parameters controlling when an unconstrained optimizer stops.
///
/// The gradient-norm threshold is not part of these parameters; it is passed
/// per call because the constrained solvers tighten it as they progress.
#[derive(Debug, Clone)]
pub struct ConvergenceParams {
    /// Maximum number of iterations before giving up.
    pub max_iterations: usize,

    /// Stop once the objective changes by no more than this between
    /// iterations. Zero waits for an exact repeat.
    pub function_tolerance: f64,
}

impl Default for ConvergenceParams {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            function_tolerance: 0.0,
        }
    }
}

impl ConvergenceParams {
    /// Whether the last function decrease was negligible.
    pub fn function_stalled(&self, previous: f64, current: f64) -> bool {
        (previous - current).abs() <= self.function_tolerance
    }
}

/// Why an unconstrained optimizer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// Gradient norm fell below the requested threshold.
    GradientNorm,
    /// Change in objective value fell below numerical tolerance.
    FunctionChange,
    /// The line search gave up; the lowest point found is returned.
    LineSearchStall,
    /// Reached the maximum number of iterations.
    MaxIterations,
}

impl TerminationReason {
    /// Whether the optimizer stopped at an acceptable point.
    ///
    /// Stalls at machine precision count as convergence.
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::GradientNorm | Self::FunctionChange | Self::LineSearchStall)
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GradientNorm => write!(f, "gradient norm below threshold"),
            Self::FunctionChange => write!(f, "function change below tolerance"),
            Self::LineSearchStall => write!(f, "line search stalled"),
            Self::MaxIterations => write!(f, "maximum iterations reached"),
        }
    }
}

/// Outcome of an unconstrained minimization.
#[derive(Debug, Clone)]
pub struct MinimizationReport {
    /// Final point.
    pub point: Array1<f64>,
    /// Objective value at the final point.
    pub value: f64,
    /// Gradient norm at the final point.
    pub gradient_norm: f64,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Number of objective evaluations.
    pub evaluations: usize,
    /// Reason for termination.
    pub termination: TerminationReason,
}

impl MinimizationReport {
    /// The final point, or an error if the optimizer did not converge.
    pub fn into_result(self) -> Result<Array1<f64>> {
        match self.termination {
            reason if reason.is_converged() => Ok(self.point),
            reason => Err(AlOptError::ConvergenceFailure(format!(
                "{} after {} iterations (gradient norm {:e})",
                reason, self.iterations, self.gradient_norm
            ))),
        }
    }
}

/// Euclidean norm.
pub fn norm(v: &Array1<f64>) -> f64 {
    v.dot(v).sqrt()
}

/// Whether every entry is finite.
pub fn all_finite(v: &Array1<f64>) -> bool {
    v.iter().all(|x| x.is_finite())
}
