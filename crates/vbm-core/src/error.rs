//! Error types for vbmix

use thiserror::Error;

/// vbmix error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Precondition violation (bounds exceeded, mismatched buffer shapes)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Parameter table or scratch buffer could not be allocated
    #[error("Allocation error: {0}")]
    Allocation(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),
}

impl From<std::collections::TryReserveError> for Error {
    fn from(e: std::collections::TryReserveError) -> Self {
        Error::Allocation(e.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
