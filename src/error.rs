use thiserror::Error;

use crate::term::expression::ExpressionError;

/// Error types for the alopt-rs library.
#[derive(Error, Debug)]
pub enum AlOptError {
    /// Error indicating a mismatch in vector dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// A term references a variable that was not bound at compile time.
    #[error("Unbound variable: {0}")]
    UnboundVariable(String),

    /// The same variable appears more than once in a variable list.
    #[error("Duplicate variable: {0}")]
    DuplicateVariable(String),

    /// Error indicating the unconstrained sub-solver failed to converge.
    #[error("Algorithm failed to converge: {0}")]
    ConvergenceFailure(String),

    /// The outer iteration budget ran out before the convergence test passed.
    #[error("Did not converge within {steps} outer iterations")]
    DidNotConverge {
        /// Number of outer steps that were performed.
        steps: usize,
    },

    /// A non-finite value showed up during evaluation.
    #[error("Numerical error: {0}")]
    NumericalError(String),

    /// Invalid solver configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid input data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Edit parameter not found.
    #[error("Parameter not found: {0}")]
    ParameterNotFound(String),

    /// Expression parsing or lowering error.
    #[error("Expression error: {0}")]
    Expression(#[from] ExpressionError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for alopt-rs operations.
pub type Result<T> = std::result::Result<T, AlOptError>;

/// Fails with [`AlOptError::DimensionMismatch`] unless `actual == expected`.
pub(crate) fn ensure_len(what: &str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(AlOptError::DimensionMismatch(format!(
            "{what}: expected {expected}, got {actual}"
        )))
    }
}
