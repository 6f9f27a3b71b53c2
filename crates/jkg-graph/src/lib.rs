//! # jkg-graph: Jurisdiction Knowledge Graph
//!
//! The entity store and the applicability query layer.
//!
//! - [`GraphStore`]: jurisdictions, regulators, obligations and typed
//!   edges behind a single reader/writer lock, with write-time content
//!   digests and a deterministic [`GraphStore::hash`].
//! - [`ApplicabilityQuery`]: resolves which obligations apply to an entity
//!   in a set of jurisdictions, honoring transitive jurisdiction
//!   inheritance and validity windows, and reports declared conflicts.
//! - [`GraphSeed`]: YAML/JSON bundles; [`GraphStore::with_defaults`] loads
//!   the built-in EU / US / UK data.
//!
//! Data flows one way: store, then query, then the enforcement layer. The
//! query layer never writes.

pub mod defaults;
pub mod edge;
pub mod error;
pub mod model;
pub mod query;
pub mod seed;
pub mod store;
pub mod subject;

pub use edge::{Edge, EdgeType, NodeRef, NodeType};
pub use error::{GraphError, GraphResult};
pub use model::{
    Jurisdiction, JurisdictionScope, LegalSystem, Obligation, ObligationKind, Regulator, RiskLevel,
};
pub use query::{ApplicabilityQuery, ApplicabilityRequest, ApplicabilityResult, ConflictInfo};
pub use seed::GraphSeed;
pub use store::{DanglingParent, GraphMetrics, GraphStore, ValidationReport};
pub use subject::SubjectCriteria;
