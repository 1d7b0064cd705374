//! Tests for term evaluation and compiled gradients.

use alopt_rs::term::functions::{atan2, cos, sin};
use alopt_rs::{AlOptError, Term, Variable};
use approx::assert_relative_eq;
use ndarray::array;

use crate::test_helpers::{bindings, finite_difference_gradient, random_point, seeded_rng};

fn mixed_term() -> (Term, Vec<Variable>) {
    let x = Variable::named("x");
    let y = Variable::named("y");
    let z = Variable::named("z");

    let radius = (x.term().powi(2) + 1.0).ln();
    let term = sin(&x) * y.term().exp()
        + radius
        + atan2(&y, &x)
        + (z.term().powi(2) + 1.0).sqrt() * &x
        + (x.term().powi(2) + 1.0).pow(&y)
        - cos(&z) / (y.term().powi(2) + 2.0);
    (term, vec![x, y, z])
}

#[test]
fn test_compiled_matches_direct_evaluation() {
    let (term, variables) = mixed_term();
    let compiled = term.compile(&variables).unwrap();
    assert_eq!(compiled.dimension(), 3);

    let mut rng = seeded_rng(7);
    for _ in 0..50 {
        let point = random_point(&mut rng, 3, -2.0, 2.0);
        let direct = term.evaluate_with(&bindings(&variables, &point)).unwrap();
        let value = compiled.evaluate(&point).unwrap();
        assert_relative_eq!(value, direct, epsilon = 1e-12, max_relative = 1e-12);

        let (_, differentiated_value) = compiled.differentiate(&point).unwrap();
        assert_eq!(differentiated_value, value);
    }
}

#[test]
fn test_gradient_matches_finite_differences() {
    let (term, variables) = mixed_term();
    let compiled = term.compile(&variables).unwrap();

    let mut rng = seeded_rng(11);
    for _ in 0..25 {
        let point = random_point(&mut rng, 3, -1.5, 1.5);
        let (gradient, _) = compiled.differentiate(&point).unwrap();
        let numeric = finite_difference_gradient(&term, &variables, &point);
        for i in 0..3 {
            assert_relative_eq!(gradient[i], numeric[i], epsilon = 1e-5, max_relative = 1e-5);
        }
    }
}

#[test]
fn test_shared_subterms() {
    let x = Variable::named("x");
    let y = Variable::named("y");
    let shared = &x * &y;
    let term = &shared + &shared * &shared;

    let compiled = term.compile(&[x, y]).unwrap();
    let (gradient, value) = compiled.differentiate(&array![2.0, 3.0]).unwrap();
    assert_eq!(value, 6.0 + 36.0);
    // d/dx = y + 2xy^2, d/dy = x + 2x^2y
    assert_eq!(gradient, array![3.0 + 36.0, 2.0 + 24.0]);
}

#[test]
fn test_parametric_variables_are_not_differentiated() {
    let x = Variable::named("x");
    let p = Variable::named("p");
    let term = &p * x.term().powi(2) + &p;

    let compiled = term.compile_parametric(&[x], &[p]).unwrap();
    assert_eq!(compiled.parameter_count(), 1);

    let (gradient, value) = compiled
        .differentiate_parametric(&array![2.0], &[3.0])
        .unwrap();
    assert_eq!(value, 15.0);
    assert_eq!(gradient, array![12.0]);

    // the same compilation serves other parameter values
    assert_eq!(compiled.evaluate_parametric(&array![2.0], &[-1.0]).unwrap(), -5.0);
}

#[test]
fn test_variable_list_errors() {
    let x = Variable::named("x");
    let y = Variable::named("y");
    let term = &x + &y;

    assert!(matches!(
        term.compile(&[x.clone()]),
        Err(AlOptError::UnboundVariable(_))
    ));
    assert!(matches!(
        term.compile(&[x.clone(), y.clone(), x.clone()]),
        Err(AlOptError::DuplicateVariable(_))
    ));

    let compiled = term.compile(&[x, y]).unwrap();
    assert!(matches!(
        compiled.evaluate(&array![1.0]),
        Err(AlOptError::DimensionMismatch(_))
    ));
}

#[test]
fn test_terms_are_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Term>();
    assert_send_sync::<Variable>();

    let (term, variables) = mixed_term();
    let point = array![0.5, -0.25, 1.0];
    let expected = term.evaluate_with(&bindings(&variables, &point)).unwrap();

    let handle = {
        let term = term.clone();
        let variables = variables.clone();
        let point = point.clone();
        std::thread::spawn(move || term.compile(&variables).unwrap().evaluate(&point).unwrap())
    };
    let value = handle.join().unwrap();
    assert_relative_eq!(value, expected, epsilon = 1e-12);
}
