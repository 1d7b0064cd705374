//! Geometric edit constraints and the terms that express them.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::parameter::ParameterId;
use crate::term::{Term, TermVec3};

/// A constraint between edit parameters and fixed scene geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditConstraint {
    /// The axis given by `axis_point` and `axis_direction` lies on the line.
    AxisOnLine {
        line_point: Point3<f64>,
        line_direction: Vector3<f64>,
        axis_point: ParameterId,
        axis_direction: ParameterId,
    },

    /// `point` lies on the plane through `plane_point` with normal `plane_normal`.
    PointOnPlane {
        plane_point: Point3<f64>,
        plane_normal: Vector3<f64>,
        point: ParameterId,
    },
}

impl EditConstraint {
    /// The parameters the constraint refers to, in order of appearance.
    pub fn parameters(&self) -> Vec<ParameterId> {
        match self {
            EditConstraint::AxisOnLine {
                axis_point,
                axis_direction,
                ..
            } => vec![*axis_point, *axis_direction],
            EditConstraint::PointOnPlane { point, .. } => vec![*point],
        }
    }

    /// Number of scalar terms the constraint contributes.
    pub fn terms_count(&self) -> usize {
        match self {
            EditConstraint::AxisOnLine { .. } => 6,
            EditConstraint::PointOnPlane { .. } => 1,
        }
    }
}

pub(crate) fn point_terms(point: &Point3<f64>) -> TermVec3 {
    TermVec3::constant(point.x, point.y, point.z)
}

pub(crate) fn vector_terms(vector: &Vector3<f64>) -> TermVec3 {
    TermVec3::constant(vector.x, vector.y, vector.z)
}

/// `u × v = 0`, one term per component of the cross product.
pub fn parallelism_terms(u: &TermVec3, v: &TermVec3) -> [Term; 3] {
    u.cross(v).components()
}

/// `point` lies on the line through `line_point` along `line_direction`.
pub fn point_on_line_terms(point: &TermVec3, line_point: &TermVec3, line_direction: &TermVec3) -> [Term; 3] {
    parallelism_terms(&(point - line_point), line_direction)
}

/// `(point - plane_point) · plane_normal = 0`.
pub fn point_on_plane_term(point: &TermVec3, plane_point: &TermVec3, plane_normal: &TermVec3) -> Term {
    (point - plane_point).dot(plane_normal)
}
