//! Convergence tests for the outer augmented Lagrangian iterations.

use super::iterations::IterationResult;

/// Decides when a stream of iteration results has converged.
pub trait ConvergenceTest {
    /// Forget everything seen so far.
    fn reset(&mut self);

    /// Take the next accepted iteration into account.
    fn update(&mut self, result: &IterationResult);

    fn has_converged(&self) -> bool;
}

/// Converged once both the constraints norm and the Lagrangian gradient norm
/// of the latest result are within their maxima.
#[derive(Debug, Clone)]
pub struct ConstraintsNormWithGradientNormConvergenceTest {
    constraints_norm_max: f64,
    lagrangian_gradient_norm_max: f64,
    converged: bool,
}

impl ConstraintsNormWithGradientNormConvergenceTest {
    pub fn new(constraints_norm_max: f64, lagrangian_gradient_norm_max: f64) -> Self {
        Self {
            constraints_norm_max,
            lagrangian_gradient_norm_max,
            converged: false,
        }
    }

    pub fn constraints_norm_max(&self) -> f64 {
        self.constraints_norm_max
    }

    pub fn lagrangian_gradient_norm_max(&self) -> f64 {
        self.lagrangian_gradient_norm_max
    }
}

impl ConvergenceTest for ConstraintsNormWithGradientNormConvergenceTest {
    fn reset(&mut self) {
        self.converged = false;
    }

    fn update(&mut self, result: &IterationResult) {
        self.converged = result.constraints_norm <= self.constraints_norm_max
            && result.lagrangian_gradient_norm <= self.lagrangian_gradient_norm_max;
    }

    fn has_converged(&self) -> bool {
        self.converged
    }
}

impl<T: ConvergenceTest + ?Sized> ConvergenceTest for Box<T> {
    fn reset(&mut self) {
        (**self).reset();
    }

    fn update(&mut self, result: &IterationResult) {
        (**self).update(result);
    }

    fn has_converged(&self) -> bool {
        (**self).has_converged()
    }
}
