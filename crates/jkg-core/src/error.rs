//! # Error Types
//!
//! Shared error types for the knowledge graph crates. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//! No `Box<dyn Error>`, no `.unwrap()` outside tests.

use thiserror::Error;

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Numeric edge properties must be strings or integers.
    #[error("float values are not permitted in canonical representations; use string or integer: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Validation errors for identifiers and timestamps.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// An identifier that must be non-empty was empty or whitespace-only.
    #[error("{kind} identifier must be non-empty")]
    EmptyIdentifier {
        /// Which identifier namespace was being validated.
        kind: &'static str,
    },

    /// Timestamp string is not valid UTC RFC 3339.
    #[error("invalid timestamp: {value:?} ({reason})")]
    InvalidTimestamp {
        /// The string that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}
