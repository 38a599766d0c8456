//! # Error Types — Shared Validation Errors
//!
//! Input validation errors shared across the workspace. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! Validation errors are always local, non-retryable client errors —
//! the API layer maps them to 400-class responses. They never carry
//! secrets or raw payload bytes.

use thiserror::Error;

/// A domain input failed validation at construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was empty.
    #[error("{field} must be non-empty")]
    Empty {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A field exceeded its maximum length.
    #[error("{field} must not exceed {max} characters, got {len}")]
    TooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Maximum permitted length.
        max: usize,
        /// Actual length received.
        len: usize,
    },

    /// A field did not match its required format.
    #[error("{field} is malformed: {reason}")]
    Malformed {
        /// Name of the offending field.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },
}
