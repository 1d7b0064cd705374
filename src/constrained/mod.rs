//! Equality-constrained optimization with the augmented Lagrangian method.
//!
//! The solver is assembled from replaceable pieces:
//!
//! - [`lagrangian`]: compiles `f + Σ λ_i c_i + μ Σ c_i^2` once per solve
//! - [`iterations`]: the outer loop as a steppable state machine
//! - [`convergence`]: decides when an accepted iteration is good enough
//! - [`solver`]: ties the above together and composes solvers into stages
//! - [`config`]: serializable solver settings
//!
//! # Example
//!
//! ```
//! use alopt_rs::constrained::{AugmentedLagrangianSolver, ConstrainedSolver};
//! use alopt_rs::term::Variable;
//! use ndarray::array;
//!
//! let x = Variable::named("x");
//! let y = Variable::named("y");
//! let objective = (&x - 2.0).powi(2) + (&y - 5.0).powi(2);
//! let constraints = vec![&x - &y];
//!
//! let mut solver = AugmentedLagrangianSolver::default();
//! let solution = solver
//!     .solve(&objective, &constraints, &[x, y], &array![0.0, 0.0])
//!     .unwrap();
//! assert!((solution[0] - 3.5).abs() < 1e-4);
//! ```

pub mod config;
pub mod convergence;
pub mod iterations;
pub mod lagrangian;
pub mod problem;
pub mod solver;

pub use config::AugmentedLagrangianConfig;
pub use convergence::{ConstraintsNormWithGradientNormConvergenceTest, ConvergenceTest};
pub use iterations::{
    AugmentedLagrangianIterations, AugmentedLagrangianRun, IterationResult, PenaltySchedule,
};
pub use lagrangian::{
    AugmentedLagrangianCompiler, CompiledAugmentedLagrangian, CompiledLagrangian,
    LagrangianCompiler,
};
pub use problem::OptimizationProblem;
pub use solver::{
    AugmentedLagrangianSolver, ConstantPenaltySolver, ConstrainedSolver, DefaultSolver,
    MultistageConstrainedOptimizer,
};
