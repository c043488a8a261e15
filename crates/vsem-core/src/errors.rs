use thiserror::Error;

/// Error type for invalid model inputs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VsemError {
    #[error("Invalid parameter {name}={value}: {reason}")]
    InvalidParameter {
        name: String,
        value: f64,
        reason: String,
    },
    #[error("Shape mismatch for {what}. Expected {expected}, got {found}")]
    ShapeMismatch {
        what: String,
        expected: usize,
        found: usize,
    },
    #[error("Invalid forcing: {0}")]
    InvalidForcing(String),
    #[error("Model state became non-finite on day {day}")]
    NonFiniteState { day: usize },
}

impl VsemError {
    pub(crate) fn invalid_parameter(name: &str, value: f64, reason: &str) -> Self {
        VsemError::InvalidParameter {
            name: name.to_string(),
            value,
            reason: reason.to_string(),
        }
    }
}

/// Convenience type for `Result<T, VsemError>`.
pub type VsemResult<T> = Result<T, VsemError>;
