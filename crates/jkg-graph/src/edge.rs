//! # Typed Edges
//!
//! Relationships between graph nodes. An edge connects two [`NodeRef`]s
//! with an [`EdgeType`] and optional free-form properties; conflict edges
//! carry `reason` and `severity` there.
//!
//! Edge identity is content-derived: the first 16 hex characters of the
//! SHA-256 over the canonical tuple
//! `[edge_type, from_type, from_id, to_type, to_id]`. Re-adding the same
//! relationship therefore overwrites rather than duplicates.

use std::collections::BTreeMap;
use std::fmt;

use jkg_core::{
    sha256_hex, CanonicalBytes, CanonicalizationError, EdgeId, JurisdictionCode, ObligationId,
    RegulatorId, Timestamp,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Number of hex characters kept from the identity digest.
const EDGE_ID_HEX_LEN: usize = 16;

/// Property key for a conflict edge's reason.
pub const PROP_REASON: &str = "reason";
/// Property key for a conflict edge's severity.
pub const PROP_SEVERITY: &str = "severity";

/// Kind of node an edge endpoint refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// A [`crate::Jurisdiction`].
    Jurisdiction,
    /// A [`crate::Regulator`].
    Regulator,
    /// An [`crate::Obligation`].
    Obligation,
}

impl NodeType {
    /// Wire name of the node type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jurisdiction => "jurisdiction",
            Self::Regulator => "regulator",
            Self::Obligation => "obligation",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address of a graph node: its kind plus its identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    /// Node kind.
    pub node_type: NodeType,
    /// Node identifier within its kind.
    pub id: String,
}

impl NodeRef {
    /// Reference a jurisdiction.
    pub fn jurisdiction(code: &JurisdictionCode) -> Self {
        Self {
            node_type: NodeType::Jurisdiction,
            id: code.as_str().to_string(),
        }
    }

    /// Reference a regulator.
    pub fn regulator(id: &RegulatorId) -> Self {
        Self {
            node_type: NodeType::Regulator,
            id: id.as_str().to_string(),
        }
    }

    /// Reference an obligation.
    pub fn obligation(id: &ObligationId) -> Self {
        Self {
            node_type: NodeType::Obligation,
            id: id.as_str().to_string(),
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node_type, self.id)
    }
}

/// Closed set of relationship types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeType {
    /// Obligation → jurisdiction it applies in.
    AppliesIn,
    /// Regulator → obligation it enforces.
    Regulates,
    /// New obligation → obligation it replaces.
    Supersedes,
    /// Obligation ↔ obligation in tension.
    ConflictsWith,
    /// Obligation → prerequisite obligation.
    Requires,
    /// Jurisdiction → union or treaty body.
    MemberOf,
    /// Jurisdiction ↔ jurisdiction recognizing each other's regime.
    MutualRecognition,
}

impl EdgeType {
    /// Wire name of the edge type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AppliesIn => "APPLIES_IN",
            Self::Regulates => "REGULATES",
            Self::Supersedes => "SUPERSEDES",
            Self::ConflictsWith => "CONFLICTS_WITH",
            Self::Requires => "REQUIRES",
            Self::MemberOf => "MEMBER_OF",
            Self::MutualRecognition => "MUTUAL_RECOGNITION",
        }
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed relationship between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Content-derived identifier; assigned by the store on write.
    #[serde(default)]
    pub edge_id: EdgeId,
    /// Relationship type.
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    /// Source node id.
    pub from_id: String,
    /// Source node kind.
    pub from_type: NodeType,
    /// Target node id.
    pub to_id: String,
    /// Target node kind.
    pub to_type: NodeType,
    /// Free-form properties. Integers, strings, booleans only.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Value>,
    /// Store-assigned write time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
}

impl Edge {
    /// An edge without properties. The id is filled in by the store.
    pub fn new(edge_type: EdgeType, from: NodeRef, to: NodeRef) -> Self {
        Self {
            edge_id: EdgeId::default(),
            edge_type,
            from_id: from.id,
            from_type: from.node_type,
            to_id: to.id,
            to_type: to.node_type,
            properties: BTreeMap::new(),
            created_at: None,
        }
    }

    /// A conflicts-with edge between two obligations.
    pub fn conflict(
        a: &ObligationId,
        b: &ObligationId,
        reason: impl Into<String>,
        severity: impl Into<String>,
    ) -> Self {
        Self::new(
            EdgeType::ConflictsWith,
            NodeRef::obligation(a),
            NodeRef::obligation(b),
        )
        .with_property(PROP_REASON, Value::String(reason.into()))
        .with_property(PROP_SEVERITY, Value::String(severity.into()))
    }

    /// Add or replace a property.
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Source endpoint.
    pub fn from_node(&self) -> NodeRef {
        NodeRef {
            node_type: self.from_type,
            id: self.from_id.clone(),
        }
    }

    /// Target endpoint.
    pub fn to_node(&self) -> NodeRef {
        NodeRef {
            node_type: self.to_type,
            id: self.to_id.clone(),
        }
    }

    /// True for conflicts-with edges.
    pub fn is_conflict(&self) -> bool {
        self.edge_type == EdgeType::ConflictsWith
    }

    /// A string property, if present and a string.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    /// Derive the content-based identifier from type and endpoints.
    pub fn derive_id(&self) -> Result<EdgeId, CanonicalizationError> {
        let tuple = [
            self.edge_type.as_str(),
            self.from_type.as_str(),
            self.from_id.as_str(),
            self.to_type.as_str(),
            self.to_id.as_str(),
        ];
        let hex = sha256_hex(&CanonicalBytes::new(&tuple)?);
        Ok(EdgeId::new(&hex[..EDGE_ID_HEX_LEN]))
    }
}
