//! Graph-specific error types.
//!
//! Store and query operations are error-transparent: validation failures
//! bubble up to the caller unchanged. Absence on reads is modelled as
//! `Option`, never as an error.

use std::path::PathBuf;

use jkg_core::CanonicalizationError;
use thiserror::Error;

/// Errors returned by graph writes and seed loading.
#[derive(Debug, Error)]
pub enum GraphError {
    /// An entity was written without its identifier.
    #[error("{kind} identifier is required")]
    MissingIdentifier {
        /// Entity kind (`jurisdiction`, `regulator`, `obligation`).
        kind: &'static str,
    },

    /// An edge was written with an empty endpoint id.
    #[error("edge {side} endpoint id is required")]
    MissingEndpoint {
        /// Which endpoint was empty (`from` or `to`).
        side: &'static str,
    },

    /// Entity content could not be canonicalized for hashing.
    #[error("entity cannot be content-addressed: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Seed bundle YAML was malformed.
    #[error("failed to parse seed YAML: {0}")]
    SeedYaml(#[from] serde_yaml::Error),

    /// Seed bundle JSON was malformed.
    #[error("failed to parse seed JSON: {0}")]
    SeedJson(#[from] serde_json::Error),

    /// Seed file could not be read.
    #[error("failed to read seed file {path}: {source}")]
    Io {
        /// The file that failed to load.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Convenience alias for graph results.
pub type GraphResult<T> = Result<T, GraphError>;
