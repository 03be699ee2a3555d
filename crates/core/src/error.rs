//! Error types shared by the storage and provider seams.

use thiserror::Error;

/// Failure reported by a repository implementation.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The record does not exist.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// The write lost a race with a concurrent writer.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Underlying database failure.
    #[error("Database error: {0}")]
    Database(String),
}

/// Failure reported by an external data provider (FX rates, pricing feed).
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The request could not be sent or timed out.
    #[error("Request failed: {0}")]
    Request(String),

    /// The provider answered with a non-success status.
    #[error("Provider returned status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body or provider error message.
        message: String,
    },

    /// The response could not be understood.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<StoreError> for tally_shared::AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => Self::NotFound(msg),
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::Database(msg) => Self::Database(msg),
        }
    }
}

impl From<ProviderError> for tally_shared::AppError {
    fn from(err: ProviderError) -> Self {
        Self::ExternalService(err.to_string())
    }
}
