//! # Seed Bundles
//!
//! A `GraphSeed` is the whole content of a graph as four lists, loadable
//! from YAML or JSON. Loading goes through the ordinary store writes, so
//! every identifier check, digest and derived edge applies.
//!
//! ```yaml
//! jurisdictions:
//!   - code: EU
//!     name: European Union
//! obligations:
//!   - obligation_id: MICA-CASP-AUTH
//!     jurisdiction_code: EU
//!     regulator_id: EU-ESMA
//!     framework: MiCA
//!     type: REGISTRATION
//!     risk_level: CRITICAL
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::edge::Edge;
use crate::error::{GraphError, GraphResult};
use crate::model::{Jurisdiction, Obligation, Regulator};
use crate::store::GraphStore;

/// Serialized graph content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSeed {
    /// Jurisdictions to register.
    #[serde(default)]
    pub jurisdictions: Vec<Jurisdiction>,
    /// Regulators to register.
    #[serde(default)]
    pub regulators: Vec<Regulator>,
    /// Obligations to register; their standard edges are derived.
    #[serde(default)]
    pub obligations: Vec<Obligation>,
    /// Additional edges (conflicts, supersessions, memberships).
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl GraphSeed {
    /// Parse a YAML bundle.
    pub fn from_yaml_str(s: &str) -> GraphResult<Self> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Parse a JSON bundle.
    pub fn from_json_str(s: &str) -> GraphResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Read a bundle from disk. `.json` files are parsed as JSON, anything
    /// else as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> GraphResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| GraphError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// Total number of entities in the bundle.
    pub fn len(&self) -> usize {
        self.jurisdictions.len() + self.regulators.len() + self.obligations.len() + self.edges.len()
    }

    /// True if the bundle holds nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl GraphStore {
    /// A store holding the built-in jurisdictions, regulators, obligations
    /// and conflicts.
    pub fn with_defaults() -> GraphResult<Self> {
        Self::from_seed(crate::defaults::seed())
    }

    /// A store holding exactly `seed`.
    pub fn from_seed(seed: GraphSeed) -> GraphResult<Self> {
        let store = Self::new();
        store.load_seed(seed)?;
        Ok(store)
    }

    /// Write every entity of `seed` into this store: jurisdictions, then
    /// regulators, then obligations, then edges. Stops at the first
    /// rejected entity; earlier writes stay.
    pub fn load_seed(&self, seed: GraphSeed) -> GraphResult<()> {
        let total = seed.len();
        for j in seed.jurisdictions {
            self.add_jurisdiction(j)?;
        }
        for r in seed.regulators {
            self.add_regulator(r)?;
        }
        for o in seed.obligations {
            self.add_obligation(o)?;
        }
        for e in seed.edges {
            self.add_edge(e)?;
        }
        tracing::info!(entities = total, "graph seed loaded");
        Ok(())
    }
}
