//! Error types for the resolver.
//!
//! All errors are strongly typed using thiserror so callers can tell
//! "legitimately no matches" apart from "the store call failed".

use thiserror::Error;

use crate::inspection::InspectionId;
use crate::restaurant::RestaurantId;
use crate::storage::StorageError;

/// Validation errors raised for malformed payloads or configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },

    #[error("Field '{field}' exceeds maximum length of {max_length}")]
    FieldTooLong {
        field: String,
        max_length: usize,
    },

    #[error("Invalid field '{field}': {reason}")]
    InvalidField {
        field: String,
        reason: String,
    },

    #[error("Coordinate '{field}' value {value} is out of range")]
    CoordinateOutOfRange {
        field: String,
        value: f64,
    },

    #[error("Similarity threshold {value} is out of range [0.0, 1.0]")]
    ThresholdOutOfRange {
        value: f64,
    },

    #[error("Block count must be at least 1 (got {value})")]
    InvalidBlockCount {
        value: usize,
    },
}

/// Execution errors that occur while running an operation.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Restaurant not found: {id}")]
    RestaurantNotFound {
        id: RestaurantId,
    },

    #[error("Inspection not found: {id}")]
    InspectionNotFound {
        id: InspectionId,
    },

    #[error("Storage error: {message}")]
    Storage {
        message: String,
    },

    #[error("Linkage worker pool disconnected: {context}")]
    Disconnected {
        context: String,
    },

    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        reason: String,
    },
}

impl From<StorageError> for ExecutionError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::RestaurantNotFound(id) => Self::RestaurantNotFound { id },
            StorageError::InspectionNotFound(id) => Self::InspectionNotFound { id },
            other => Self::Storage {
                message: other.to_string(),
            },
        }
    }
}

/// Transport errors for client-server communication.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to serialize payload: {message}")]
    SerializationFailed {
        message: String,
    },

    #[error("Failed to deserialize payload: {message}")]
    DeserializationFailed {
        message: String,
    },
}

/// Top-level error type for the resolver.
#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl From<StorageError> for ResolverError {
    fn from(err: StorageError) -> Self {
        Self::Execution(err.into())
    }
}

impl ResolverError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a not-found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Execution(
                ExecutionError::RestaurantNotFound { .. } | ExecutionError::InspectionNotFound { .. }
            )
        )
    }

    /// Returns true if the underlying store rejected the call.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Execution(ExecutionError::Storage { .. }))
    }

    /// Returns true if this error is retryable.
    ///
    /// Nothing in the resolver retries on its own; this is a hint for callers.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) | Self::Transport(_) | Self::Internal { .. } => false,
            Self::Execution(e) => matches!(e, ExecutionError::Storage { .. }),
        }
    }
}

/// Result type alias for resolver operations.
pub type ResolverResult<T> = Result<T, ResolverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_missing_field() {
        let err = ValidationError::MissingField {
            field: "inspection_id".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("inspection_id"));
        assert!(msg.contains("missing"));
    }

    #[test]
    fn test_validation_error_threshold() {
        let err = ValidationError::ThresholdOutOfRange { value: 1.5 };
        assert!(format!("{err}").contains("1.5"));
    }

    #[test]
    fn test_storage_not_found_maps_to_execution_not_found() {
        let err: ResolverError = StorageError::RestaurantNotFound(RestaurantId::new(7)).into();
        assert!(err.is_not_found());
        assert!(!err.is_storage());
        assert!(format!("{err}").contains('7'));
    }

    #[test]
    fn test_storage_backend_error_is_storage_and_retryable() {
        let err: ResolverError = StorageError::BackendError("disk I/O".to_string()).into();
        assert!(err.is_storage());
        assert!(err.is_retryable());
        assert!(format!("{err}").contains("disk I/O"));
    }

    #[test]
    fn test_resolver_error_from_validation() {
        let err: ResolverError = ValidationError::InvalidBlockCount { value: 0 }.into();
        assert!(err.is_validation());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_resolver_error_internal() {
        let err = ResolverError::internal("unexpected state");
        assert!(!err.is_retryable());
        assert!(format!("{err}").contains("unexpected state"));
    }

    #[test]
    fn test_disconnected_pool_is_not_retryable() {
        let err: ResolverError = ExecutionError::Disconnected {
            context: "linkage".to_string(),
        }
        .into();
        assert!(!err.is_retryable());
        assert!(format!("{err}").contains("linkage"));
    }
}
