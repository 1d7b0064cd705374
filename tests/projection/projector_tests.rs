//! Tests for the least-change projection of edit parameters.

use std::cell::Cell;
use std::rc::Rc;

use alopt_rs::constrained::{AugmentedLagrangianConfig, AugmentedLagrangianSolver, DefaultSolver};
use alopt_rs::projection::{
    ConstraintsProjector, EditConstraint, EditParameter, EditParameters, PointParameter,
    VectorParameter,
};
use alopt_rs::{AlOptError, Result};
use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};
use ndarray::array;

use crate::test_helpers::array_approx_eq;

/// Counts how often its values are written.
struct SpyParameter {
    values: Vec<f64>,
    writes: Rc<Cell<usize>>,
}

impl EditParameter for SpyParameter {
    fn dimension(&self) -> usize {
        self.values.len()
    }

    fn values(&self) -> Vec<f64> {
        self.values.clone()
    }

    fn set_values(&mut self, values: &[f64]) -> Result<()> {
        if values.len() != self.values.len() {
            return Err(AlOptError::DimensionMismatch("spy".to_string()));
        }
        self.writes.set(self.writes.get() + 1);
        self.values = values.to_vec();
        Ok(())
    }
}

fn spy(x: f64, y: f64, z: f64) -> (SpyParameter, Rc<Cell<usize>>) {
    let writes = Rc::new(Cell::new(0));
    (
        SpyParameter {
            values: vec![x, y, z],
            writes: Rc::clone(&writes),
        },
        writes,
    )
}

fn values(parameters: &EditParameters, id: alopt_rs::projection::ParameterId) -> ndarray::Array1<f64> {
    ndarray::Array1::from(parameters.get(id).unwrap().values())
}

#[test]
fn test_no_constraints_leaves_parameters_untouched() {
    let mut parameters = EditParameters::new();
    let (parameter, writes) = spy(1.0, 2.0, 3.0);
    let id = parameters.insert(parameter);

    let mut projector = ConstraintsProjector::new(DefaultSolver::default(), Vec::new());
    projector.project(&mut parameters).unwrap();

    assert_eq!(writes.get(), 0);
    assert_eq!(values(&parameters, id), array![1.0, 2.0, 3.0]);
}

#[test]
fn test_shared_parameter_is_written_once() {
    let mut parameters = EditParameters::new();
    let (point, point_writes) = spy(1.0, 1.0, 1.0);
    let (untouched, untouched_writes) = spy(5.0, 5.0, 5.0);
    let point = parameters.insert(point);
    parameters.insert(untouched);

    // the same point constrained to two planes: the line x = 0, z = 0
    let mut projector = ConstraintsProjector::new(
        DefaultSolver::default(),
        [
            EditConstraint::PointOnPlane {
                plane_point: Point3::origin(),
                plane_normal: Vector3::x(),
                point,
            },
            EditConstraint::PointOnPlane {
                plane_point: Point3::origin(),
                plane_normal: Vector3::z(),
                point,
            },
        ],
    );

    let problem = projector.build_problem(&parameters).unwrap();
    assert_eq!(problem.variables.len(), 3);
    assert_eq!(problem.constraints.len(), 2);

    projector.project(&mut parameters).unwrap();
    assert_eq!(point_writes.get(), 1);
    assert_eq!(untouched_writes.get(), 0);
    assert!(array_approx_eq(&values(&parameters, point), &array![0.0, 1.0, 0.0], 1e-4));
}

/// Readable but refuses every write.
struct LockedParameter([f64; 3]);

impl EditParameter for LockedParameter {
    fn dimension(&self) -> usize {
        3
    }

    fn values(&self) -> Vec<f64> {
        self.0.to_vec()
    }

    fn set_values(&mut self, _values: &[f64]) -> Result<()> {
        Err(AlOptError::InvalidInput("locked".to_string()))
    }
}

/// Claims three components but reports four values.
struct InconsistentParameter;

impl EditParameter for InconsistentParameter {
    fn dimension(&self) -> usize {
        3
    }

    fn values(&self) -> Vec<f64> {
        vec![2.0, 2.0, 2.0, 2.0]
    }

    fn set_values(&mut self, _values: &[f64]) -> Result<()> {
        Ok(())
    }
}

fn two_plane_projector(
    first: alopt_rs::projection::ParameterId,
    second: alopt_rs::projection::ParameterId,
) -> ConstraintsProjector {
    ConstraintsProjector::new(
        DefaultSolver::default(),
        [
            EditConstraint::PointOnPlane {
                plane_point: Point3::origin(),
                plane_normal: Vector3::x(),
                point: first,
            },
            EditConstraint::PointOnPlane {
                plane_point: Point3::origin(),
                plane_normal: Vector3::z(),
                point: second,
            },
        ],
    )
}

#[test]
fn test_failed_write_restores_earlier_parameters() {
    let mut parameters = EditParameters::new();
    let (point, writes) = spy(1.0, 1.0, 1.0);
    let point = parameters.insert(point);
    let locked = parameters.insert(LockedParameter([2.0, 2.0, 2.0]));

    let result = two_plane_projector(point, locked).project(&mut parameters);

    assert!(matches!(result, Err(AlOptError::InvalidInput(_))));
    // written once, then put back
    assert_eq!(writes.get(), 2);
    assert_eq!(values(&parameters, point), array![1.0, 1.0, 1.0]);
    assert_eq!(values(&parameters, locked), array![2.0, 2.0, 2.0]);
}

#[test]
fn test_inconsistent_parameter_blocks_every_write() {
    let mut parameters = EditParameters::new();
    let (point, writes) = spy(1.0, 1.0, 1.0);
    let point = parameters.insert(point);
    let inconsistent = parameters.insert(InconsistentParameter);

    let result = two_plane_projector(point, inconsistent).project(&mut parameters);

    assert!(matches!(result, Err(AlOptError::DimensionMismatch(_))));
    assert_eq!(writes.get(), 0);
    assert_eq!(values(&parameters, point), array![1.0, 1.0, 1.0]);
}

#[test]
fn test_axis_on_line() {
    let mut parameters = EditParameters::new();
    let axis_point = parameters.insert(PointParameter::new(0.3, 1.2, -0.5));
    let axis_direction = parameters.insert(VectorParameter::new(0.2, 0.1, 1.0));

    let line_point = Point3::new(1.0, 1.0, 0.0);
    let line_direction = Vector3::new(0.0, 0.0, 1.0);
    let mut projector = ConstraintsProjector::new(
        AugmentedLagrangianSolver::from_config(&AugmentedLagrangianConfig::precise()).unwrap(),
        [EditConstraint::AxisOnLine {
            line_point,
            line_direction,
            axis_point,
            axis_direction,
        }],
    );
    projector.project(&mut parameters).unwrap();

    let point = values(&parameters, axis_point);
    let direction = values(&parameters, axis_direction);

    // the point moved onto the line, keeping its height
    assert_relative_eq!(point[0], 1.0, epsilon = 1e-4);
    assert_relative_eq!(point[1], 1.0, epsilon = 1e-4);
    assert_relative_eq!(point[2], -0.5, epsilon = 1e-4);

    // the direction became parallel to the line
    let direction = Vector3::new(direction[0], direction[1], direction[2]);
    assert!(direction.cross(&line_direction).norm() < 1e-4);
    assert_relative_eq!(direction.z, 1.0, epsilon = 1e-4);
}

#[test]
fn test_point_on_tilted_plane() {
    let mut parameters = EditParameters::new();
    let point = parameters.insert(PointParameter::new(2.0, 0.0, 0.0));

    let normal = Vector3::new(1.0, 1.0, 0.0);
    let plane_point = Point3::new(0.0, 0.0, 0.0);
    let mut projector = ConstraintsProjector::new(
        DefaultSolver::default(),
        [EditConstraint::PointOnPlane {
            plane_point,
            plane_normal: normal,
            point,
        }],
    );
    projector.project(&mut parameters).unwrap();

    // orthogonal projection of (2, 0, 0) onto x + y = 0
    let projected = values(&parameters, point);
    assert!(array_approx_eq(&projected, &array![1.0, -1.0, 0.0], 1e-4));
    let offset = Point3::new(projected[0], projected[1], projected[2]) - plane_point;
    assert!(offset.dot(&normal).abs() < 1e-6);
}

#[test]
fn test_constraints_round_trip_through_json() {
    let mut parameters = EditParameters::new();
    let point = parameters.insert(PointParameter::new(0.0, 0.0, 4.0));
    let constraints = vec![EditConstraint::PointOnPlane {
        plane_point: Point3::new(0.0, 0.0, 1.0),
        plane_normal: Vector3::z(),
        point,
    }];

    let json = serde_json::to_string(&constraints).unwrap();
    let restored: Vec<EditConstraint> = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, constraints);

    let mut projector = ConstraintsProjector::new(DefaultSolver::default(), restored);
    assert_eq!(projector.constraints().len(), 1);
    projector.project(&mut parameters).unwrap();
    assert_relative_eq!(values(&parameters, point)[2], 1.0, epsilon = 1e-4);
}
