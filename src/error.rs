use thiserror::Error;

/// Obstacle filter error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Singular matrix (determinant {determinant:e})")]
    SingularMatrix { determinant: f64 },

    #[error("Invalid lane: {reason}")]
    InvalidLane { reason: String },

    #[error("Invalid timestep: {0} (must be finite and positive)")]
    InvalidTimestep(f64),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
}

/// Result type for filter operations
pub type Result<T> = std::result::Result<T, FilterError>;
