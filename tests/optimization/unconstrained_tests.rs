//! Integration tests for the unconstrained optimizers.

use alopt_rs::unconstrained::{
    ConjugateGradient, ConjugateGradientConfig, ConvergenceParams, FirstOrderOptimizer, Lbfgs,
    LbfgsConfig, TerminationReason,
};
use alopt_rs::{AlOptError, Result, Variable};
use approx::assert_relative_eq;
use ndarray::{array, Array1};

use crate::test_helpers::{random_point, seeded_rng};

fn rosenbrock(x: &Array1<f64>) -> Result<(Array1<f64>, f64)> {
    let a = 1.0 - x[0];
    let b = x[1] - x[0] * x[0];
    let value = a * a + 100.0 * b * b;
    let gradient = array![-2.0 * a - 400.0 * x[0] * b, 200.0 * b];
    Ok((gradient, value))
}

#[test]
fn test_lbfgs_rosenbrock() {
    let solution = Lbfgs::new()
        .solve(&rosenbrock, &array![-1.2, 1.0], 1e-8)
        .unwrap();
    assert_relative_eq!(solution[0], 1.0, epsilon = 1e-6);
    assert_relative_eq!(solution[1], 1.0, epsilon = 1e-6);
}

#[test]
fn test_conjugate_gradient_rosenbrock() {
    // the narrow valley needs many short steps
    let cg = ConjugateGradient::with_config(ConjugateGradientConfig {
        convergence: ConvergenceParams {
            max_iterations: 100_000,
            ..ConvergenceParams::default()
        },
        ..ConjugateGradientConfig::default()
    });
    let solution = cg.solve(&rosenbrock, &array![-1.2, 1.0], 1e-5).unwrap();
    assert_relative_eq!(solution[0], 1.0, epsilon = 1e-3);
    assert_relative_eq!(solution[1], 1.0, epsilon = 1e-3);
}

#[test]
fn test_optimizers_on_compiled_term() {
    // a coupled quadratic with its minimum at (1, -2, 0.5)
    let x = Variable::named("x");
    let y = Variable::named("y");
    let z = Variable::named("z");
    let term = (&x - 1.0).powi(2)
        + 2.0 * (&y + 2.0).powi(2)
        + (&z - 0.5).powi(2)
        + 0.5 * (&x - 1.0) * (&y + 2.0);
    let compiled = term.compile(&[x, y, z]).unwrap();
    let objective = |point: &Array1<f64>| compiled.differentiate(point);

    let mut rng = seeded_rng(5);
    let optimizers: Vec<Box<dyn FirstOrderOptimizer>> =
        vec![Box::new(Lbfgs::new()), Box::new(ConjugateGradient::new())];
    for optimizer in &optimizers {
        let start = random_point(&mut rng, 3, -5.0, 5.0);
        let solution = optimizer.solve(&objective, &start, 1e-10).unwrap();
        let (gradient, _) = compiled.differentiate(&solution).unwrap();
        assert!(gradient.iter().all(|g| g.abs() < 1e-8));
        assert_relative_eq!(solution[0], 1.0, epsilon = 1e-8);
        assert_relative_eq!(solution[1], -2.0, epsilon = 1e-8);
        assert_relative_eq!(solution[2], 0.5, epsilon = 1e-8);
    }
}

#[test]
fn test_iteration_cap_is_an_error() {
    let config = LbfgsConfig {
        convergence: ConvergenceParams {
            max_iterations: 2,
            ..ConvergenceParams::default()
        },
        ..LbfgsConfig::default()
    };
    let lbfgs = Lbfgs::with_config(config);

    let report = lbfgs.minimize(&rosenbrock, &array![-1.2, 1.0], 1e-12).unwrap();
    assert_eq!(report.termination, TerminationReason::MaxIterations);
    assert!(matches!(
        lbfgs.solve(&rosenbrock, &array![-1.2, 1.0], 1e-12),
        Err(AlOptError::ConvergenceFailure(_))
    ));

    let cg = ConjugateGradient::with_config(ConjugateGradientConfig {
        convergence: ConvergenceParams {
            max_iterations: 2,
            ..ConvergenceParams::default()
        },
        ..ConjugateGradientConfig::default()
    });
    assert!(cg.solve(&rosenbrock, &array![-1.2, 1.0], 1e-12).is_err());
}

#[test]
fn test_non_finite_objective_is_an_error() {
    let log_barrier = |x: &Array1<f64>| -> Result<(Array1<f64>, f64)> {
        Ok((array![-1.0 / x[0]], -x[0].ln()))
    };
    let result = Lbfgs::new().solve(&log_barrier, &array![-1.0], 1e-8);
    assert!(matches!(result, Err(AlOptError::NumericalError(_))));
}
