//! # Canonical Serialization: JCS Byte Production
//!
//! `CanonicalBytes` is the sole construction path for bytes that feed a
//! digest anywhere in the knowledge graph: per-entity content hashes, edge
//! identifiers, and the graph state hash.
//!
//! ## Invariant
//!
//! The inner field is private. The only way to obtain `CanonicalBytes` is
//! through [`CanonicalBytes::new()`] or [`CanonicalBytes::from_value()`],
//! which reject floats and then serialize with `serde_jcs` (RFC 8785):
//! sorted object keys, compact separators, deterministic byte sequence.
//! Two graphs holding the same content therefore always hash to the same
//! bytes, whatever order their maps were filled in.
//!
//! Floats are rejected because JCS number formatting of non-integers is a
//! cross-implementation hazard. Risk levels, versions and counts in the
//! graph are all integers or enums.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization with float rejection.
///
/// # Invariants
///
/// - Object keys are sorted; separators are compact.
/// - No float numbers appear anywhere in the value tree.
/// - Timestamps arrive pre-normalized by [`crate::Timestamp`]
///   (`YYYY-MM-DDTHH:MM:SSZ`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::FloatRejected` if the value contains a
    /// float, or `CanonicalizationError::SerializationFailed` if serde fails.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        Self::from_value(value)
    }

    /// Construct canonical bytes from an already-built JSON value.
    ///
    /// Used when the caller needs to drop fields (e.g. bookkeeping stamps)
    /// from the value tree before hashing.
    pub fn from_value(value: Value) -> Result<Self, CanonicalizationError> {
        let checked = reject_floats(value)?;
        let s = serde_jcs::to_string(&checked)?;
        Ok(Self(s.into_bytes()))
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Walk the value tree and fail on the first non-integer number.
fn reject_floats(value: Value) -> Result<Value, CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(value),
        Value::Number(ref n) => {
            if !n.is_i64() && !n.is_u64() {
                if let Some(f) = n.as_f64() {
                    return Err(CanonicalizationError::FloatRejected(f));
                }
            }
            Ok(value)
        }
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (k, v) in map {
                out.insert(k, reject_floats(v)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(arr) => {
            let out: Result<Vec<_>, _> = arr.into_iter().map(reject_floats).collect();
            Ok(Value::Array(out?))
        }
    }
}
