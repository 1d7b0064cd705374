//! First-order unconstrained optimizers.
//!
//! The constrained solvers reduce every outer iteration to an unconstrained
//! minimization. Any optimizer implementing [`FirstOrderOptimizer`] can be
//! plugged in; [`Lbfgs`] is the default and [`ConjugateGradient`] is a cheaper
//! alternative for problems where the L-BFGS history does not pay off. Both
//! run the `argmin` solvers through a small adapter.

mod adapter;
pub mod conjugate_gradient;
pub mod convergence;
pub mod lbfgs;

pub use conjugate_gradient::{ConjugateGradient, ConjugateGradientConfig};
pub use convergence::{ConvergenceParams, MinimizationReport, TerminationReason};
pub use lbfgs::{Lbfgs, LbfgsConfig, DEFAULT_LBFGS_MEMORY};

use ndarray::Array1;

use crate::error::Result;

/// An objective returning `(gradient, value)` at a point.
pub type ObjectiveWithGradient<'a> = dyn Fn(&Array1<f64>) -> Result<(Array1<f64>, f64)> + 'a;

/// Strategy for minimizing a smooth function from its value and gradient.
pub trait FirstOrderOptimizer {
    /// Minimize `objective` from `initial` until the gradient norm drops to
    /// `gradient_norm_threshold` (or progress stalls at machine precision).
    ///
    /// Running out of iterations or producing non-finite values is an error.
    fn solve(
        &self,
        objective: &ObjectiveWithGradient<'_>,
        initial: &Array1<f64>,
        gradient_norm_threshold: f64,
    ) -> Result<Array1<f64>>;
}

impl<T: FirstOrderOptimizer + ?Sized> FirstOrderOptimizer for Box<T> {
    fn solve(
        &self,
        objective: &ObjectiveWithGradient<'_>,
        initial: &Array1<f64>,
        gradient_norm_threshold: f64,
    ) -> Result<Array1<f64>> {
        (**self).solve(objective, initial, gradient_norm_threshold)
    }
}
