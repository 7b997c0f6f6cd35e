//! # Error Types
//!
//! Typed error handling for the harvest-cart core.
//! Gateway and session operations return `Result<T, PaymentError>`;
//! snapshot backends return `Result<T, PersistenceError>`.

use thiserror::Error;

/// Core error type for payment gateway and session operations
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Payment provider reported a failure
    #[error("Provider error [{provider}]: {message}")]
    ProviderError { provider: String, message: String },

    /// Network/HTTP error communicating with the provider
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Provider response was missing a required field
    #[error("Incomplete provider response: missing {field}")]
    MissingField { field: &'static str },

    /// No gateway registered for the requested provider
    #[error("Unknown payment provider: {provider}")]
    UnknownProvider { provider: String },

    /// Checkout session not found or already discarded
    #[error("Session not found or expired: {session_id}")]
    SessionNotFound { session_id: String },

    /// Operation not permitted in the session's current state
    #[error("Session is {status}, cannot {operation}")]
    InvalidState {
        status: String,
        operation: &'static str,
    },

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PaymentError {
    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentError::NetworkError(_)
                | PaymentError::ProviderError { .. }
                | PaymentError::MissingField { .. }
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            PaymentError::Configuration(_) => 500,
            PaymentError::InvalidRequest(_) => 400,
            PaymentError::ProviderError { .. } => 502,
            PaymentError::NetworkError(_) => 503,
            PaymentError::MissingField { .. } => 502,
            PaymentError::UnknownProvider { .. } => 400,
            PaymentError::SessionNotFound { .. } => 404,
            PaymentError::InvalidState { .. } => 409,
            PaymentError::Internal(_) => 500,
            PaymentError::Serialization(_) => 500,
        }
    }
}

/// Result type alias for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;

/// Errors raised by snapshot backends.
///
/// These never escape the `PersistenceAdapter`; it logs them and degrades.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}
