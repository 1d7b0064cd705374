//! Three-component vectors of terms.

use std::ops::{Add, Mul, Sub};

use super::{Term, Variable};
use crate::error::{ensure_len, Result};

/// A 3D vector whose components are terms.
#[derive(Debug, Clone)]
pub struct TermVec3 {
    pub x: Term,
    pub y: Term,
    pub z: Term,
}

impl TermVec3 {
    pub fn new(x: impl Into<Term>, y: impl Into<Term>, z: impl Into<Term>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            z: z.into(),
        }
    }

    /// Build a vector from exactly three variables.
    pub fn from_variables(variables: &[Variable]) -> Result<Self> {
        ensure_len("vector variables", 3, variables.len())?;
        Ok(Self::new(&variables[0], &variables[1], &variables[2]))
    }

    /// A vector of constants.
    pub fn constant(x: f64, y: f64, z: f64) -> Self {
        Self::new(x, y, z)
    }

    pub fn dot(&self, other: &TermVec3) -> Term {
        &self.x * &other.x + &self.y * &other.y + &self.z * &other.z
    }

    pub fn cross(&self, other: &TermVec3) -> TermVec3 {
        TermVec3 {
            x: &self.y * &other.z - &self.z * &other.y,
            y: &self.z * &other.x - &self.x * &other.z,
            z: &self.x * &other.y - &self.y * &other.x,
        }
    }

    pub fn norm_squared(&self) -> Term {
        self.dot(self)
    }

    /// The components as `[x, y, z]`.
    pub fn components(&self) -> [Term; 3] {
        [self.x.clone(), self.y.clone(), self.z.clone()]
    }
}

impl Add for &TermVec3 {
    type Output = TermVec3;
    fn add(self, rhs: &TermVec3) -> TermVec3 {
        TermVec3 {
            x: &self.x + &rhs.x,
            y: &self.y + &rhs.y,
            z: &self.z + &rhs.z,
        }
    }
}

impl Add for TermVec3 {
    type Output = TermVec3;
    fn add(self, rhs: TermVec3) -> TermVec3 {
        &self + &rhs
    }
}

impl Sub for &TermVec3 {
    type Output = TermVec3;
    fn sub(self, rhs: &TermVec3) -> TermVec3 {
        TermVec3 {
            x: &self.x - &rhs.x,
            y: &self.y - &rhs.y,
            z: &self.z - &rhs.z,
        }
    }
}

impl Sub for TermVec3 {
    type Output = TermVec3;
    fn sub(self, rhs: TermVec3) -> TermVec3 {
        &self - &rhs
    }
}

impl Mul<&Term> for &TermVec3 {
    type Output = TermVec3;
    fn mul(self, scale: &Term) -> TermVec3 {
        TermVec3 {
            x: &self.x * scale,
            y: &self.y * scale,
            z: &self.z * scale,
        }
    }
}
