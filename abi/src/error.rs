//! Error types for reading ABI values

use thiserror::Error;

/// Result type for ABI conversions
pub type Result<T> = std::result::Result<T, AbiError>;

/// Errors raised while interpreting raw values received across the boundary
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AbiError {
    /// A pointer that must be valid was null
    #[error("Null pointer for {0}")]
    NullPointer(&'static str),

    /// A C string was not valid UTF-8
    #[error("String `{0}` is not valid UTF-8")]
    InvalidUtf8(&'static str),

    /// A C string contained an interior NUL byte
    #[error("String `{0}` contains an interior NUL byte")]
    InteriorNul(String),

    /// A byte slice had the wrong length for a fixed-size value
    #[error("Expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Required length
        expected: usize,
        /// Length that was supplied
        actual: usize,
    },

    /// A hex string could not be decoded
    #[error("Invalid hex: {0}")]
    InvalidHex(String),
}
