//! # jkg-core: Foundational Types for the Jurisdiction Knowledge Graph
//!
//! Every other crate in the workspace depends on `jkg-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for graph keys.** `JurisdictionCode`, `RegulatorId`,
//!    `ObligationId`, `EdgeId`. You cannot pass a regulator where an
//!    obligation is expected.
//!
//! 2. **`CanonicalBytes` newtype.** All digest computation flows through
//!    `CanonicalBytes::new()`. No raw `serde_json::to_vec()` for digests.
//!    The graph state hash is only reproducible across processes because of
//!    this.
//!
//! 3. **UTC-only timestamps.** `Timestamp` is UTC with seconds precision, so
//!    effective-from / sunset comparisons and canonical bytes agree.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `jkg-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex, ContentDigest, DigestAlgorithm, Sha256Accumulator};
pub use error::{CanonicalizationError, ValidationError};
pub use identity::{EdgeId, JurisdictionCode, ObligationId, RegulatorId};
pub use temporal::Timestamp;
