//! Enforcement error types.
//!
//! Only request validation, configuration loading and I/O surface as
//! errors. Compiler and evaluator failures never do: they become
//! `Indeterminate` obligation results inside an otherwise complete
//! [`crate::EnforcementResult`].

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by the enforcement layer.
#[derive(Debug, Error)]
pub enum EnforcementError {
    /// The request cannot be evaluated as given.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration values are out of range.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Configuration YAML was malformed.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// A file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The file that failed to load.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
