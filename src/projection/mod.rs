//! Least-change projection of edit parameters onto geometric constraints.
//!
//! Edit parameters (points and directions owned by the caller) are registered
//! in [`EditParameters`]. [`EditConstraint`]s refer to them by [`ParameterId`].
//! [`ConstraintsProjector::project`] moves the referenced parameters as little
//! as possible so that every constraint holds.
//!
//! # Example
//!
//! ```
//! use alopt_rs::constrained::DefaultSolver;
//! use alopt_rs::projection::{
//!     ConstraintsProjector, EditConstraint, EditParameter, EditParameters, PointParameter,
//! };
//! use nalgebra::{Point3, Vector3};
//!
//! let mut parameters = EditParameters::new();
//! let point = parameters.insert(PointParameter::new(1.0, 2.0, 3.0));
//!
//! let mut projector = ConstraintsProjector::new(
//!     DefaultSolver::default(),
//!     [EditConstraint::PointOnPlane {
//!         plane_point: Point3::origin(),
//!         plane_normal: Vector3::z(),
//!         point,
//!     }],
//! );
//! projector.project(&mut parameters).unwrap();
//!
//! let values = parameters.get(point).unwrap().values();
//! assert!(values[2].abs() < 1e-4);
//! ```

pub mod constraints;
pub mod parameter;
pub mod projector;

pub use constraints::{parallelism_terms, point_on_line_terms, point_on_plane_term, EditConstraint};
pub use parameter::{
    EditParameter, EditParameters, ParameterId, ParameterVariable, PointParameter, VectorParameter,
};
pub use projector::{ConstraintsProjector, ProjectionProblem};
