//! Wire-level error types.

use thiserror::Error;

/// Errors produced while framing or parsing protocol lines.
#[derive(Debug, Error)]
pub enum WireError {
    /// Underlying I/O failure from the framed transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A line exceeded the framing limit without a terminator.
    #[error("line too long: {actual} bytes (limit {limit})")]
    LineTooLong {
        /// Observed length in bytes.
        actual: usize,
        /// Configured maximum.
        limit: usize,
    },

    /// The line had no command token.
    #[error("empty message")]
    EmptyMessage,
}

/// Result alias for wire operations.
pub type Result<T> = std::result::Result<T, WireError>;
