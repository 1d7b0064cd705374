//! # alopt-rs
//!
//! `alopt-rs` solves equality-constrained minimization problems written as
//! symbolic terms, using the augmented Lagrangian method.
//!
//! The library provides:
//! - A small differentiable term algebra with compilation to a tape,
//!   reverse-mode gradients, symbolic substitution and a textual front-end
//! - First-order unconstrained optimizers (L-BFGS and nonlinear conjugate gradient
//!   from `argmin`)
//! - The augmented Lagrangian outer loop as a steppable state machine, with
//!   pluggable compilers, convergence tests and multistage solver composition
//! - A constraints projector that snaps 3D edit parameters onto geometric
//!   constraints with the least possible change (feature `projection`)
//!
//! ## Basic Usage
//!
//! ```
//! use alopt_rs::{AugmentedLagrangianSolver, ConstrainedSolver, Expression, Variable};
//! use ndarray::array;
//!
//! let x = Variable::named("x");
//! let y = Variable::named("y");
//! let variables = [x, y];
//!
//! let objective = Expression::parse_term("(x - 2)^2 + (y - 5)^2", &variables[..]).unwrap();
//! let constraint = Expression::parse_term("x - y", &variables[..]).unwrap();
//!
//! let mut solver = AugmentedLagrangianSolver::default();
//! let solution = solver
//!     .solve(&objective, &[constraint], &variables, &array![0.0, 0.0])
//!     .unwrap();
//! assert!((solution[0] - 3.5).abs() < 1e-4);
//! assert!((solution[1] - 3.5).abs() < 1e-4);
//! ```

// Public modules
pub mod error;

// Term algebra
pub mod term;

// Optimizers
pub mod constrained;
pub mod unconstrained;

// Conditional modules
#[cfg(feature = "projection")]
pub mod projection;

// Re-exports for convenience
pub use error::{AlOptError, Result};

pub use term::{CompiledTerm, Expression, Term, TermVec3, Variable};

pub use constrained::{
    AugmentedLagrangianConfig, AugmentedLagrangianSolver, ConstrainedSolver,
    MultistageConstrainedOptimizer, OptimizationProblem,
};

pub use unconstrained::{ConjugateGradient, FirstOrderOptimizer, Lbfgs};

#[cfg(feature = "projection")]
pub use projection::{ConstraintsProjector, EditConstraint, EditParameters};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
