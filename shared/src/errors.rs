//! Shared error types for the content generation system

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    #[error("Unknown label: {input}")]
    UnknownLabel { input: String },

    #[error("Invalid configuration: {field} = {value}")]
    InvalidConfig { field: String, value: String },
}

pub type SharedResult<T> = Result<T, SharedError>;

/// Ways a generation provider call can fail.
///
/// Only these failures are retryable; everything else in the engine
/// surfaces immediately.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFailure {
    #[error("Provider timed out")]
    Timeout,

    #[error("Provider rate limited the request")]
    RateLimited,

    #[error("Provider returned malformed output")]
    MalformedOutput,

    #[error("Provider unavailable")]
    Unavailable,

    #[error("Provider authentication failed")]
    AuthenticationFailed,
}
