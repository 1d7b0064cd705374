//! Edit parameters: the externally owned values a projection adjusts.
//!
//! Parameters live in an [`EditParameters`] registry and are referred to by
//! [`ParameterId`] handles, so constraints can name the same parameter more than
//! once without sharing references to it.

use std::fmt;

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{ensure_len, AlOptError, Result};
use crate::term::Variable;

/// A vector of values that can be read before and written after a projection.
pub trait EditParameter {
    /// Number of scalar components.
    fn dimension(&self) -> usize;

    /// The current values, `dimension()` of them.
    fn values(&self) -> Vec<f64>;

    /// Replace the values. Fails if `values.len() != dimension()`.
    fn set_values(&mut self, values: &[f64]) -> Result<()>;
}

/// A point in 3D space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointParameter {
    point: Point3<f64>,
}

impl PointParameter {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            point: Point3::new(x, y, z),
        }
    }

    pub fn point(&self) -> Point3<f64> {
        self.point
    }
}

impl From<Point3<f64>> for PointParameter {
    fn from(point: Point3<f64>) -> Self {
        Self { point }
    }
}

impl EditParameter for PointParameter {
    fn dimension(&self) -> usize {
        3
    }

    fn values(&self) -> Vec<f64> {
        self.point.coords.iter().copied().collect()
    }

    fn set_values(&mut self, values: &[f64]) -> Result<()> {
        ensure_len("point parameter values", 3, values.len())?;
        self.point = Point3::new(values[0], values[1], values[2]);
        Ok(())
    }
}

/// A direction (or any free vector) in 3D space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VectorParameter {
    vector: Vector3<f64>,
}

impl VectorParameter {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            vector: Vector3::new(x, y, z),
        }
    }

    pub fn vector(&self) -> Vector3<f64> {
        self.vector
    }
}

impl From<Vector3<f64>> for VectorParameter {
    fn from(vector: Vector3<f64>) -> Self {
        Self { vector }
    }
}

impl EditParameter for VectorParameter {
    fn dimension(&self) -> usize {
        3
    }

    fn values(&self) -> Vec<f64> {
        self.vector.iter().copied().collect()
    }

    fn set_values(&mut self, values: &[f64]) -> Result<()> {
        ensure_len("vector parameter values", 3, values.len())?;
        self.vector = Vector3::new(values[0], values[1], values[2]);
        Ok(())
    }
}

/// Handle of a parameter inside an [`EditParameters`] registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParameterId(usize);

impl ParameterId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Owns the edit parameters of a scene.
///
/// # Examples
///
/// ```
/// use alopt_rs::projection::{EditParameter, EditParameters, PointParameter};
///
/// let mut parameters = EditParameters::new();
/// let id = parameters.insert(PointParameter::new(1.0, 2.0, 3.0));
/// assert_eq!(parameters.get(id).unwrap().values(), vec![1.0, 2.0, 3.0]);
/// ```
#[derive(Default)]
pub struct EditParameters {
    parameters: Vec<Box<dyn EditParameter>>,
}

impl EditParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter and return its handle.
    pub fn insert(&mut self, parameter: impl EditParameter + 'static) -> ParameterId {
        self.parameters.push(Box::new(parameter));
        ParameterId(self.parameters.len() - 1)
    }

    pub fn get(&self, id: ParameterId) -> Result<&dyn EditParameter> {
        self.parameters
            .get(id.0)
            .map(|parameter| parameter.as_ref())
            .ok_or_else(|| AlOptError::ParameterNotFound(id.to_string()))
    }

    pub fn get_mut(&mut self, id: ParameterId) -> Result<&mut (dyn EditParameter + 'static)> {
        match self.parameters.get_mut(id.0) {
            Some(parameter) => Ok(parameter.as_mut()),
            None => Err(AlOptError::ParameterNotFound(id.to_string())),
        }
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ParameterId> {
        (0..self.parameters.len()).map(ParameterId)
    }
}

impl fmt::Debug for EditParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.parameters.iter().map(|parameter| parameter.values()))
            .finish()
    }
}

/// A solver variable standing for one component of an edit parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterVariable {
    pub variable: Variable,
    pub parameter: ParameterId,
    pub index: usize,
}

impl ParameterVariable {
    /// A fresh variable named after the parameter component, e.g. `p2[0]`.
    pub fn new(parameter: ParameterId, index: usize) -> Self {
        Self {
            variable: Variable::named(&format!("{parameter}[{index}]")),
            parameter,
            index,
        }
    }
}
