use thiserror::Error;

/// Errors surfaced to callers of the estimator.
///
/// Only input validation crosses the public boundary. Backend failures are
/// absorbed by the invoker and reported as "no estimate".
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EstimatorError {
    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },
}

/// Failures raised while serializing, scoring or reading back a prediction.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Example serialization failed: {reason}")]
    Serialization { reason: String },

    #[error("Example deserialization failed: {reason}")]
    Deserialization { reason: String },

    #[error("Input tensor allocation failed: {reason}")]
    Allocation { reason: String },

    #[error("Graph execution failed: {reason}")]
    Invocation { reason: String },

    #[error("Output node {node} missing from graph results")]
    MissingOutput { node: String },

    #[error("Output shape mismatch: expected {expected} value(s), got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Model produced a non-finite score: {value}")]
    NonFiniteScore { value: f32 },

    #[error("Backend panicked: {message}")]
    Panicked { message: String },

    #[error("Model unavailable at {path}")]
    ModelUnavailable { path: String },
}

impl BackendError {
    /// Stable label for logs and metrics.
    ///
    /// Every variant collapses to an absent estimate, the label keeps an
    /// unavailable backend apart from a schema mismatch.
    pub fn kind(&self) -> &'static str {
        match self {
            BackendError::Serialization { .. } => "serialization",
            BackendError::Deserialization { .. } => "deserialization",
            BackendError::Allocation { .. } => "allocation",
            BackendError::Invocation { .. } => "invocation",
            BackendError::MissingOutput { .. } => "missing_output",
            BackendError::ShapeMismatch { .. } => "shape_mismatch",
            BackendError::NonFiniteScore { .. } => "non_finite_score",
            BackendError::Panicked { .. } => "panicked",
            BackendError::ModelUnavailable { .. } => "model_unavailable",
        }
    }
}
