//! Engine error types.

use thiserror::Error;

/// Errors raised when constructing animations and aggregators.
///
/// Remote query failures are not represented here: they are absorbed per
/// layer (see [`crate::remote::QueryError`]) and never reach callers.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MotionError {
    /// A required argument was missing or unusable (empty path, no map).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The aggregator was created outside of a Tokio runtime.
    #[error("No Tokio runtime available: {0}")]
    RuntimeUnavailable(String),
}

impl MotionError {
    /// Shorthand for [`MotionError::InvalidArgument`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        MotionError::InvalidArgument(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_display() {
        let err = MotionError::invalid("path is required");
        assert!(err.to_string().contains("Invalid argument"));
        assert!(err.to_string().contains("path is required"));
    }

    #[test]
    fn test_runtime_unavailable_display() {
        let err = MotionError::RuntimeUnavailable("no reactor".to_string());
        assert_eq!(err.to_string(), "No Tokio runtime available: no reactor");
    }
}
