//! Tests for substitution with constant folding.

use std::collections::HashMap;

use alopt_rs::term::functions::{cos, max};
use alopt_rs::term::{substitute, substitute_values, TermNode};
use alopt_rs::{AlOptError, Term, Variable};
use approx::assert_relative_eq;

use crate::test_helpers::{bindings, random_point, seeded_rng};

fn sample_term() -> (Term, Vec<Variable>) {
    let x = Variable::named("x");
    let y = Variable::named("y");
    let z = Variable::named("z");
    let shared = &x * &y + 1.0;
    let term = shared.powi(2) + cos(&shared) * z.term().exp()
        - (x.term().powi(2) + 2.0).ln()
        + max([x.term(), z.term()])
        + (y.term().powi(2) + 1.0).pow(&z);
    (term, vec![x, y, z])
}

#[test]
fn test_empty_substitution_is_identity() {
    let (term, variables) = sample_term();
    let substituted = substitute(&term, &HashMap::new());
    assert!(substituted.ptr_eq(&term));

    let mut rng = seeded_rng(21);
    for _ in 0..20 {
        let point = random_point(&mut rng, 3, -1.0, 1.0);
        let values = bindings(&variables, &point);
        assert_eq!(
            substituted.evaluate_with(&values).unwrap(),
            term.evaluate_with(&values).unwrap()
        );
    }
}

#[test]
fn test_full_substitution_folds_to_a_constant() {
    let (term, variables) = sample_term();

    let mut rng = seeded_rng(42);
    for _ in 0..20 {
        let point = random_point(&mut rng, 3, -1.0, 1.0);
        let folded = substitute_values(&term, &variables, point.as_slice().unwrap()).unwrap();
        assert!(matches!(folded.node(), TermNode::Constant(_) | TermNode::Zero));

        let expected = term.evaluate_with(&bindings(&variables, &point)).unwrap();
        let value = folded.as_constant().unwrap();
        assert_relative_eq!(value, expected, epsilon = 1e-9, max_relative = 1e-9);
    }
}

#[test]
fn test_partial_substitution() {
    let x = Variable::named("x");
    let y = Variable::named("y");
    let untouched = y.term().exp() * 3.0;
    let term = &x * 2.0 + &untouched;

    let substituted = term.substitute(&HashMap::from([(x.clone(), 4.0)]));
    assert_eq!(substituted.variables(), vec![y.clone()]);

    // the branch without x is shared, not rebuilt
    match substituted.node() {
        TermNode::Sum(terms) => assert!(terms.iter().any(|t| t.ptr_eq(&untouched))),
        other => panic!("Expected a sum, got {:?}", other),
    }

    let values = HashMap::from([(y.clone(), 0.5)]);
    assert_relative_eq!(
        substituted.evaluate_with(&values).unwrap(),
        8.0 + 3.0 * 0.5f64.exp(),
        epsilon = 1e-12
    );
}

#[test]
fn test_substituting_to_zero() {
    let x = Variable::named("x");
    let y = Variable::named("y");
    let term = &x * &y;
    let folded = substitute_values(&term, &[x.clone(), y.clone()], &[0.0, 5.0]).unwrap();
    assert!(matches!(folded.node(), TermNode::Zero));

    assert!(matches!(
        substitute_values(&term, &[x, y], &[1.0]),
        Err(AlOptError::DimensionMismatch(_))
    ));
}
