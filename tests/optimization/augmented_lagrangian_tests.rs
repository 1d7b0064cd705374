//! Integration tests for the augmented Lagrangian method.

use alopt_rs::constrained::{
    AugmentedLagrangianCompiler, AugmentedLagrangianConfig, AugmentedLagrangianIterations,
    AugmentedLagrangianSolver, CompiledLagrangian, ConstrainedSolver,
    ConstraintsNormWithGradientNormConvergenceTest, ConvergenceTest, LagrangianCompiler,
    OptimizationProblem, PenaltySchedule,
};
use alopt_rs::unconstrained::{ConjugateGradient, FirstOrderOptimizer, Lbfgs, ObjectiveWithGradient};
use alopt_rs::{AlOptError, Result, Term, Variable};
use approx::assert_relative_eq;
use ndarray::{array, Array1};

use crate::test_helpers::{bindings, midpoint_problem, random_point, seeded_rng};

#[test]
fn test_midpoint_solution() {
    let (objective, constraints, variables) = midpoint_problem();
    let mut solver = AugmentedLagrangianSolver::default();
    let solution = solver
        .solve(&objective, &constraints, &variables, &array![0.0, 0.0])
        .unwrap();
    assert_relative_eq!(solution[0], 3.5, epsilon = 1e-4);
    assert_relative_eq!(solution[1], 3.5, epsilon = 1e-4);
}

#[test]
fn test_midpoint_solution_with_conjugate_gradient() {
    let (objective, constraints, variables) = midpoint_problem();
    let config = AugmentedLagrangianConfig::default();
    let mut solver = AugmentedLagrangianSolver::new(
        AugmentedLagrangianIterations::new(
            ConjugateGradient::new(),
            AugmentedLagrangianCompiler,
            PenaltySchedule::from_config(&config),
        ),
        ConstraintsNormWithGradientNormConvergenceTest::new(
            config.constraints_norm_max,
            config.lagrangian_gradient_norm_max,
        ),
    );
    let solution = solver
        .solve(&objective, &constraints, &variables, &array![10.0, -10.0])
        .unwrap();
    assert_relative_eq!(solution[0], 3.5, epsilon = 1e-4);
    assert_relative_eq!(solution[1], 3.5, epsilon = 1e-4);
}

#[test]
fn test_nonlinear_constraint() {
    // closest point to (2, 1) on the unit circle
    let x = Variable::named("x");
    let y = Variable::named("y");
    let objective = (&x - 2.0).powi(2) + (&y - 1.0).powi(2);
    let constraints = vec![x.term().powi(2) + y.term().powi(2) - 1.0];

    let problem = OptimizationProblem::new(objective, constraints, vec![x, y]);
    problem.validate().unwrap();

    let mut solver = AugmentedLagrangianSolver::from_config(&AugmentedLagrangianConfig::default()).unwrap();
    let solution = problem.solve_with(&mut solver, &array![1.0, 1.0]).unwrap();

    let expected = 1.0 / 5f64.sqrt();
    assert_relative_eq!(solution[0], 2.0 * expected, epsilon = 1e-4);
    assert_relative_eq!(solution[1], expected, epsilon = 1e-4);
}

#[test]
fn test_multipliers_approach_the_lagrange_multiplier() {
    let (objective, constraints, variables) = midpoint_problem();
    let iterations = AugmentedLagrangianIterations::<Lbfgs>::default();
    let mut run = iterations
        .start(&objective, &constraints, &variables, &array![0.0, 0.0])
        .unwrap();
    let mut test = ConstraintsNormWithGradientNormConvergenceTest::new(1e-8, 1e-4);

    while !test.has_converged() {
        assert!(run.steps() < 200, "no convergence after {} steps", run.steps());
        if let Some(result) = run.step().unwrap() {
            test.update(&result);
        }
    }

    // 2 (x - 2) + λ = 0 at x = 3.5
    assert_relative_eq!(run.multipliers()[0], -3.0, epsilon = 1e-3);
    assert_relative_eq!(run.current_point()[0], 3.5, epsilon = 1e-4);
}

#[test]
fn test_penalty_is_non_decreasing_and_capped() {
    // an unsatisfiable constraint rejects every step
    let x = Variable::named("x");
    let objective = x.term().powi(2);
    let constraints = vec![Term::constant(1.0)];

    let schedule = PenaltySchedule {
        penalty_max: 1000.0,
        ..PenaltySchedule::default()
    };
    let iterations = AugmentedLagrangianIterations::new(Lbfgs::new(), AugmentedLagrangianCompiler, schedule);
    let mut run = iterations
        .start(&objective, &constraints, &[x], &array![1.0])
        .unwrap();

    let mut previous = run.penalty();
    assert_eq!(previous, 10.0);
    for _ in 0..15 {
        assert!(run.step().unwrap().is_none());
        let penalty = run.penalty();
        assert!(penalty >= previous);
        assert!(penalty <= 1000.0);
        assert_eq!(run.multipliers(), &[0.0]);
        previous = penalty;
    }
    assert_eq!(run.penalty(), 1000.0);
    assert_relative_eq!(run.max_constraints_norm(), 1000f64.powf(-0.1), epsilon = 1e-15);
    assert_relative_eq!(run.max_lagrangian_gradient_norm(), 1e-3, epsilon = 1e-15);
}

#[test]
fn test_lagrangian_without_multipliers() {
    let x = Variable::named("x");
    let y = Variable::named("y");
    let objective = (&x * &y).exp() + y.term().powi(2);
    let constraints = vec![&x + 2.0 * &y - 1.0, x.term().powi(3) - &y];
    let variables = vec![x, y];

    let compiled = AugmentedLagrangianCompiler
        .compile(&objective, &constraints, &variables)
        .unwrap();

    let mut rng = seeded_rng(17);
    for mu in [0.5, 10.0, 1e4] {
        let point = random_point(&mut rng, 2, -1.0, 1.0);
        let values = bindings(&variables, &point);
        let squares: f64 = constraints
            .iter()
            .map(|c| c.evaluate_with(&values).unwrap().powi(2))
            .sum();
        let expected = objective.evaluate_with(&values).unwrap() + mu * squares;

        let (_, value) = compiled
            .lagrangian_with_gradient(&point, &[0.0, 0.0], mu)
            .unwrap();
        assert_relative_eq!(value, expected, epsilon = 1e-9, max_relative = 1e-12);
    }
}

#[test]
fn test_step_budget_exhaustion() {
    let x = Variable::named("x");
    let constraints = vec![x.term(), &x - 1.0];
    let config = AugmentedLagrangianConfig::default()
        .with_penalty_max(1e4)
        .with_max_steps(Some(12));
    let mut solver = AugmentedLagrangianSolver::from_config(&config).unwrap();

    match solver.solve(&Term::zero(), &constraints, &[x], &array![0.0]) {
        Err(AlOptError::DidNotConverge { steps }) => assert_eq!(steps, 12),
        other => panic!("Expected DidNotConverge, got {:?}", other),
    }
}

#[test]
fn test_config_from_json() {
    let config = AugmentedLagrangianConfig::from_json(
        r#"{ "start_penalty": 1.0, "penalty_growth": 4.0, "max_steps": 500 }"#,
    )
    .unwrap();
    assert_eq!(config.max_steps, Some(500));

    let (objective, constraints, variables) = midpoint_problem();
    let mut solver = AugmentedLagrangianSolver::from_config(&config).unwrap();
    assert_eq!(solver.max_steps(), Some(500));
    let solution = solver
        .solve(&objective, &constraints, &variables, &array![0.0, 0.0])
        .unwrap();
    assert_relative_eq!(solution[0], 3.5, epsilon = 1e-4);
}

struct FailingOptimizer;

impl FirstOrderOptimizer for FailingOptimizer {
    fn solve(
        &self,
        _objective: &ObjectiveWithGradient<'_>,
        _initial: &Array1<f64>,
        _gradient_norm_threshold: f64,
    ) -> Result<Array1<f64>> {
        Err(AlOptError::ConvergenceFailure("gave up".to_string()))
    }
}

#[test]
fn test_sub_solver_failure_propagates() {
    let (objective, constraints, variables) = midpoint_problem();
    let mut solver = AugmentedLagrangianSolver::new(
        AugmentedLagrangianIterations::new(FailingOptimizer, AugmentedLagrangianCompiler, PenaltySchedule::default()),
        ConstraintsNormWithGradientNormConvergenceTest::new(1e-8, 1e-4),
    );
    assert!(matches!(
        solver.solve(&objective, &constraints, &variables, &array![0.0, 0.0]),
        Err(AlOptError::ConvergenceFailure(_))
    ));
}

#[test]
fn test_input_errors() {
    let (objective, constraints, variables) = midpoint_problem();
    let mut solver = AugmentedLagrangianSolver::default();

    assert!(matches!(
        solver.solve(&objective, &constraints, &variables, &array![0.0]),
        Err(AlOptError::DimensionMismatch(_))
    ));
    assert!(matches!(
        solver.solve(&objective, &constraints, &variables[..1], &array![0.0]),
        Err(AlOptError::UnboundVariable(_))
    ));
}
