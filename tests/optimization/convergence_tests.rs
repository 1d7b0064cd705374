//! Tests for the convergence test of the outer iterations.

use alopt_rs::constrained::{
    ConstraintsNormWithGradientNormConvergenceTest, ConvergenceTest, IterationResult,
};
use ndarray::array;

fn result(constraints_norm: f64, lagrangian_gradient_norm: f64) -> IterationResult {
    IterationResult {
        values: array![1.0, 2.0],
        constraints_norm,
        lagrangian_gradient_norm,
    }
}

#[test]
fn test_requires_both_norms() {
    let mut test = ConstraintsNormWithGradientNormConvergenceTest::new(1e-6, 1e-3);
    assert_eq!(test.constraints_norm_max(), 1e-6);
    assert_eq!(test.lagrangian_gradient_norm_max(), 1e-3);

    let cases = [
        (1e-7, 1e-4, true),
        (1e-6, 1e-3, true),
        (2e-6, 1e-4, false),
        (1e-7, 2e-3, false),
        (f64::NAN, 1e-4, false),
    ];
    for (constraints_norm, gradient_norm, converged) in cases {
        test.reset();
        test.update(&result(constraints_norm, gradient_norm));
        assert_eq!(
            test.has_converged(),
            converged,
            "constraints norm {constraints_norm}, gradient norm {gradient_norm}"
        );
    }
}

#[test]
fn test_reset_clears_the_flag() {
    let mut test = ConstraintsNormWithGradientNormConvergenceTest::new(1e-8, 1e-4);
    test.update(&result(0.0, 0.0));
    assert!(test.has_converged());

    test.reset();
    assert!(!test.has_converged());

    // a boxed test behaves the same
    let mut boxed: Box<dyn ConvergenceTest> = Box::new(test);
    boxed.update(&result(1e-9, 1e-5));
    assert!(boxed.has_converged());
    boxed.reset();
    assert!(!boxed.has_converged());
}
