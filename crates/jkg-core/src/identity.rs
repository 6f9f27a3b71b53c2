//! # Graph Identifier Newtypes
//!
//! Newtype wrappers for every key in the knowledge graph. They prevent
//! accidental identifier confusion: a `RegulatorId` cannot be passed where
//! an `ObligationId` is expected.
//!
//! Construction is permissive (`From<&str>`, `From<String>`): seed data and
//! adapter feeds may carry blank identifiers, and the graph store is the
//! layer that rejects them on write. Use [`JurisdictionCode::validated`]
//! (and friends) when a non-empty value is required up front.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

macro_rules! string_identifier {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a string without validation.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Wrap a string, rejecting empty or whitespace-only input.
            pub fn validated(value: impl Into<String>) -> Result<Self, ValidationError> {
                let s = value.into();
                if s.trim().is_empty() {
                    return Err(ValidationError::EmptyIdentifier { kind: $kind });
                }
                Ok(Self(s))
            }

            /// Access the identifier string.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// True if the identifier is empty or whitespace-only.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }

            /// The namespace name used in error messages and logs.
            pub const fn kind() -> &'static str {
                $kind
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_identifier!(
    /// A jurisdiction code: an ISO 3166-1 alpha-2 code, a supranational code
    /// (`"EU"`, `"GLOBAL"`), or a hyphen-qualified sub-entity (`"US-CA"`).
    JurisdictionCode,
    "jurisdiction"
);

string_identifier!(
    /// A regulatory authority identifier, conventionally prefixed with its
    /// home jurisdiction (`"EU-ESMA"`, `"US-FinCEN"`).
    RegulatorId,
    "regulator"
);

string_identifier!(
    /// A caller-assigned obligation identifier (`"MICA-CASP-AUTH"`).
    ObligationId,
    "obligation"
);

string_identifier!(
    /// A deterministic edge identifier derived from the edge's type and
    /// endpoints. Produced by the graph store, never by callers.
    EdgeId,
    "edge"
);
