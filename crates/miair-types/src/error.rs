//! Error types for value parsing in miair-types.

use thiserror::Error;

/// Errors that can occur when interpreting raw property values or
/// characteristic payloads.
///
/// This error type is transport-agnostic and does not include
/// communication errors (those belong in miair-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The value does not have the shape the caller expected.
    #[error("expected {expected}, got {actual}")]
    UnexpectedKind {
        /// What the caller wanted (e.g. "integer").
        expected: &'static str,
        /// Display form of the value that was found.
        actual: String,
    },

    /// A numeric value is outside the accepted range.
    #[error("value {value} out of range {min}..={max}")]
    OutOfRange {
        /// The offending value.
        value: i64,
        /// Lower bound (inclusive).
        min: i64,
        /// Upper bound (inclusive).
        max: i64,
    },
}

impl ParseError {
    /// Create an [`ParseError::UnexpectedKind`] error.
    pub fn unexpected(expected: &'static str, actual: impl ToString) -> Self {
        Self::UnexpectedKind {
            expected,
            actual: actual.to_string(),
        }
    }
}

/// Result type alias using miair-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
