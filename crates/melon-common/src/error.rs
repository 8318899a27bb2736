//! Error types for the melon farm.
//!
//! Engine rules never fail; these cover the I/O seams around them.

use thiserror::Error;

/// Top-level error type for farm operations that touch the outside world.
#[derive(Debug, Error)]
pub enum FarmError {
    /// Persistence errors
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Schema version mismatch
    #[error("Schema version mismatch: expected at most {expected}, got {actual}")]
    VersionMismatch {
        /// Newest version this build understands
        expected: u32,
        /// Version found in the record
        actual: u32,
    },
}

/// Result type alias for farm operations.
pub type FarmResult<T> = Result<T, FarmError>;
