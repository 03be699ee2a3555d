//! Adapter construction errors.

use thiserror::Error;

/// Failure while constructing an adapter.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The underlying HTTP client could not be created.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

impl From<BuildError> for tally_shared::AppError {
    fn from(err: BuildError) -> Self {
        Self::Config(err.to_string())
    }
}
