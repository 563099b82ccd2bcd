//! Error types for normr

use thiserror::Error;

/// Result type alias using normr's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in normr operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// Buffer length does not match the configured shape
    #[error("Shape mismatch for '{arg}': expected {expected} elements, got {got}")]
    ShapeMismatch {
        /// The buffer name
        arg: &'static str,
        /// Expected number of elements
        expected: usize,
        /// Actual number of elements
        got: usize,
    },

    /// Scratch-buffer allocation failed at state construction
    #[error("Allocation failure: failed to reserve {size} bytes")]
    AllocationFailure {
        /// Requested size in bytes
        size: usize,
    },

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an invalid-argument error
    pub fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }

    /// Create a shape-mismatch error
    pub fn shape_mismatch(arg: &'static str, expected: usize, got: usize) -> Self {
        Self::ShapeMismatch { arg, expected, got }
    }
}
