//! Configuration options for the augmented Lagrangian solver.
//!
//! This module defines the penalty schedule, the convergence thresholds and the
//! optional outer step budget. Configurations serialize to JSON so they can be
//! stored next to the models they were tuned for.

use serde::{Deserialize, Serialize};

use crate::error::{AlOptError, Result};

/// Configuration options for the augmented Lagrangian solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentedLagrangianConfig {
    /// Penalty parameter at the first outer iteration. Default: 10
    pub start_penalty: f64,

    /// Upper bound on the penalty parameter. Default: 1e10
    pub penalty_max: f64,

    /// Factor by which the penalty grows after a rejected step. Default: 2
    pub penalty_growth: f64,

    /// Floor for the constraints-norm acceptance threshold. Default: 1e-8
    pub constraints_norm_lower_bound: f64,

    /// Floor for the sub-solver gradient-norm threshold. Default: 1e-7
    pub lagrangian_gradient_norm_lower_bound: f64,

    /// The solve converges once the constraints norm is at most this. Default: 1e-8
    pub constraints_norm_max: f64,

    /// The solve converges once the Lagrangian gradient norm is at most this. Default: 1e-4
    pub lagrangian_gradient_norm_max: f64,

    /// Maximum number of outer steps; `None` runs until convergence. Default: None
    pub max_steps: Option<usize>,
}

impl Default for AugmentedLagrangianConfig {
    fn default() -> Self {
        Self {
            start_penalty: 10.0,
            penalty_max: 1e10,
            penalty_growth: 2.0,
            constraints_norm_lower_bound: 1e-8,
            lagrangian_gradient_norm_lower_bound: 1e-7,
            constraints_norm_max: 1e-8,
            lagrangian_gradient_norm_max: 1e-4,
            max_steps: None,
        }
    }
}

impl AugmentedLagrangianConfig {
    /// Settings for high-accuracy solves such as snapping, where the penalty
    /// stays moderate and the gradient is driven further down.
    pub fn precise() -> Self {
        Self {
            penalty_max: 1e3,
            lagrangian_gradient_norm_lower_bound: 4e-7,
            lagrangian_gradient_norm_max: 2e-6,
            max_steps: Some(1000),
            ..Self::default()
        }
    }

    pub fn with_start_penalty(mut self, start_penalty: f64) -> Self {
        self.start_penalty = start_penalty;
        self
    }

    pub fn with_penalty_max(mut self, penalty_max: f64) -> Self {
        self.penalty_max = penalty_max;
        self
    }

    pub fn with_penalty_growth(mut self, penalty_growth: f64) -> Self {
        self.penalty_growth = penalty_growth;
        self
    }

    pub fn with_lower_bounds(mut self, constraints_norm: f64, lagrangian_gradient_norm: f64) -> Self {
        self.constraints_norm_lower_bound = constraints_norm;
        self.lagrangian_gradient_norm_lower_bound = lagrangian_gradient_norm;
        self
    }

    pub fn with_convergence_thresholds(
        mut self,
        constraints_norm_max: f64,
        lagrangian_gradient_norm_max: f64,
    ) -> Self {
        self.constraints_norm_max = constraints_norm_max;
        self.lagrangian_gradient_norm_max = lagrangian_gradient_norm_max;
        self
    }

    pub fn with_max_steps(mut self, max_steps: Option<usize>) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("start_penalty", self.start_penalty),
            ("penalty_max", self.penalty_max),
            ("penalty_growth", self.penalty_growth),
            ("constraints_norm_lower_bound", self.constraints_norm_lower_bound),
            (
                "lagrangian_gradient_norm_lower_bound",
                self.lagrangian_gradient_norm_lower_bound,
            ),
            ("constraints_norm_max", self.constraints_norm_max),
            ("lagrangian_gradient_norm_max", self.lagrangian_gradient_norm_max),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(AlOptError::InvalidConfig(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }
        if self.penalty_growth <= 1.0 {
            return Err(AlOptError::InvalidConfig(format!(
                "penalty_growth must exceed 1, got {}",
                self.penalty_growth
            )));
        }
        if self.penalty_max < self.start_penalty {
            return Err(AlOptError::InvalidConfig(format!(
                "penalty_max ({}) is below start_penalty ({})",
                self.penalty_max, self.start_penalty
            )));
        }
        if self.max_steps == Some(0) {
            return Err(AlOptError::InvalidConfig(
                "max_steps must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from a JSON string and validate. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}
