//! Engine-specific error types

use shared::{ProviderFailure, SharedError};
use thiserror::Error;

/// Closed failure taxonomy for every engine operation.
///
/// Only `Provider` failures are retryable; the rest surface to the
/// caller immediately.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Validation failed: {message}")]
    Validation { message: String, details: Vec<String> },

    #[error("Provider request failed: {failure}")]
    Provider { failure: ProviderFailure, message: String },

    #[error("Conflicting operation: {message}")]
    Conflict { message: String },

    #[error("Capacity exceeded: {message}")]
    Capacity { message: String },

    #[error("Persistence operation failed: {operation} on {entity}: {message}")]
    Persistence {
        operation: String,
        entity: String,
        message: String,
    },
}

impl EngineError {
    pub fn validation(message: impl Into<String>) -> Self {
        EngineError::Validation {
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn validation_with_details(message: impl Into<String>, details: Vec<String>) -> Self {
        EngineError::Validation {
            message: message.into(),
            details,
        }
    }

    pub fn provider(failure: ProviderFailure, message: impl Into<String>) -> Self {
        EngineError::Provider {
            failure,
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        EngineError::Conflict { message: message.into() }
    }

    pub fn capacity(message: impl Into<String>) -> Self {
        EngineError::Capacity { message: message.into() }
    }

    pub fn persistence(
        operation: impl Into<String>,
        entity: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        EngineError::Persistence {
            operation: operation.into(),
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Stable short code for logs and API payloads
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Validation { .. } => "validation_error",
            EngineError::Provider { .. } => "provider_error",
            EngineError::Conflict { .. } => "concurrency_conflict",
            EngineError::Capacity { .. } => "capacity_error",
            EngineError::Persistence { .. } => "persistence_error",
        }
    }
}

// Shared vocabulary failures are caller-input problems
impl From<SharedError> for EngineError {
    fn from(error: SharedError) -> Self {
        EngineError::validation(error.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
