//! # Graph Store
//!
//! In-memory, concurrency-safe store for the four entity kinds of the
//! knowledge graph, with aggregate metrics and a deterministic state hash.
//!
//! ## Locking
//!
//! One `parking_lot::RwLock` guards all four maps and the metrics snapshot,
//! so a write and its metrics update are observed together. Readers run
//! concurrently; the lock is never held across calls back into the store.
//!
//! ## Content Addressing
//!
//! Every entity is digested at write time: serialize, drop the store's
//! bookkeeping stamp (`last_updated` / `created_at`), canonicalize (JCS),
//! SHA-256. A write whose content cannot be canonicalized is rejected
//! before the store is touched. [`GraphStore::hash`] then only combines
//! stored digests and cannot fail.
//!
//! ## Inheritance
//!
//! A jurisdiction inherits the obligations of every ancestor along its
//! parent chain. Parents need not be registered (load order is free);
//! cycles are cut at the first repeated code.

use std::collections::{BTreeMap, BTreeSet};

use jkg_core::{
    sha256_hex, CanonicalBytes, CanonicalizationError, ContentDigest, EdgeId, JurisdictionCode,
    ObligationId, RegulatorId, Sha256Accumulator, Timestamp,
};
use parking_lot::{RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::edge::{Edge, EdgeType, NodeRef, NodeType};
use crate::error::{GraphError, GraphResult};
use crate::model::{Jurisdiction, Obligation, Regulator};

/// Domain-separation prefix of the graph state hash.
const GRAPH_HASH_DOMAIN: &[u8] = b"jkg.graph.v1\0";

// -- Metrics ------------------------------------------------------------------

/// Point-in-time counts over the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphMetrics {
    /// Number of jurisdictions.
    pub total_jurisdictions: usize,
    /// Number of regulators.
    pub total_regulators: usize,
    /// Number of obligations.
    pub total_obligations: usize,
    /// Number of edges, derived ones included.
    pub total_edges: usize,
    /// Number of conflicts-with edges currently stored.
    pub conflict_count: usize,
    /// Time of the most recent write.
    pub last_updated: Option<Timestamp>,
}

// -- Validation report --------------------------------------------------------

/// A jurisdiction whose parent code is not registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DanglingParent {
    /// The child jurisdiction.
    pub code: JurisdictionCode,
    /// The unregistered parent code.
    pub parent_code: JurisdictionCode,
}

/// Structural problems found by [`GraphStore::validate`].
///
/// None of these are rejected at write time; seed bundles and adapter
/// feeds may arrive in any order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Parents that are not registered jurisdictions.
    pub dangling_parents: Vec<DanglingParent>,
    /// Jurisdictions that are their own ancestor.
    pub parent_cycles: Vec<JurisdictionCode>,
    /// Obligations whose home jurisdiction is not registered.
    pub unknown_jurisdictions: Vec<ObligationId>,
    /// Obligations whose regulator is not registered.
    pub unknown_regulators: Vec<ObligationId>,
    /// Edges with at least one unregistered endpoint.
    pub dangling_edges: Vec<EdgeId>,
}

impl ValidationReport {
    /// True if no problems were found.
    pub fn is_clean(&self) -> bool {
        self.dangling_parents.is_empty()
            && self.parent_cycles.is_empty()
            && self.unknown_jurisdictions.is_empty()
            && self.unknown_regulators.is_empty()
            && self.dangling_edges.is_empty()
    }
}

// -- Internal state -----------------------------------------------------------

/// An entity together with its content digest.
#[derive(Debug, Clone)]
pub(crate) struct Stored<T> {
    pub(crate) value: T,
    digest: String,
}

/// Everything behind the store's lock.
#[derive(Debug, Default)]
pub(crate) struct GraphState {
    jurisdictions: BTreeMap<JurisdictionCode, Stored<Jurisdiction>>,
    regulators: BTreeMap<RegulatorId, Stored<Regulator>>,
    obligations: BTreeMap<ObligationId, Stored<Obligation>>,
    edges: BTreeMap<EdgeId, Stored<Edge>>,
    metrics: GraphMetrics,
}

impl GraphState {
    pub(crate) fn jurisdiction(&self, code: &JurisdictionCode) -> Option<&Jurisdiction> {
        self.jurisdictions.get(code).map(|s| &s.value)
    }

    pub(crate) fn obligation(&self, id: &ObligationId) -> Option<&Obligation> {
        self.obligations.get(id).map(|s| &s.value)
    }

    /// Obligations in identifier order.
    pub(crate) fn obligations(&self) -> impl Iterator<Item = &Obligation> {
        self.obligations.values().map(|s| &s.value)
    }

    /// Edges in identifier order.
    pub(crate) fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values().map(|s| &s.value)
    }

    /// Parent chain of `code`, nearest first, excluding `code` itself.
    pub(crate) fn ancestors(&self, code: &JurisdictionCode) -> Vec<JurisdictionCode> {
        let mut chain = Vec::new();
        let mut visited = BTreeSet::from([code.clone()]);
        let mut next = self.parent_of(code);
        while let Some(parent) = next {
            if !visited.insert(parent.clone()) {
                break;
            }
            next = self.parent_of(&parent);
            chain.push(parent);
        }
        chain
    }

    /// `code` followed by its ancestors.
    pub(crate) fn lineage(&self, code: &JurisdictionCode) -> Vec<JurisdictionCode> {
        let mut lineage = vec![code.clone()];
        lineage.extend(self.ancestors(code));
        lineage
    }

    fn parent_of(&self, code: &JurisdictionCode) -> Option<JurisdictionCode> {
        self.jurisdiction(code).and_then(|j| j.parent_code.clone())
    }

    fn in_parent_cycle(&self, code: &JurisdictionCode) -> bool {
        let mut visited = BTreeSet::new();
        let mut next = self.parent_of(code);
        while let Some(parent) = next {
            if &parent == code {
                return true;
            }
            if !visited.insert(parent.clone()) {
                return false;
            }
            next = self.parent_of(&parent);
        }
        false
    }

    /// Non-expired obligations of `code` and of each of its ancestors.
    fn obligations_for_jurisdiction(
        &self,
        code: &JurisdictionCode,
        now: Timestamp,
    ) -> Vec<Obligation> {
        let mut out = Vec::new();
        for level in self.lineage(code) {
            out.extend(
                self.obligations()
                    .filter(|o| o.jurisdiction_code == level && !o.is_expired_at(now))
                    .cloned(),
            );
        }
        out
    }

    fn node_exists(&self, node: &NodeRef) -> bool {
        match node.node_type {
            NodeType::Jurisdiction => self
                .jurisdictions
                .contains_key(&JurisdictionCode::new(node.id.as_str())),
            NodeType::Regulator => self.regulators.contains_key(&RegulatorId::new(node.id.as_str())),
            NodeType::Obligation => self
                .obligations
                .contains_key(&ObligationId::new(node.id.as_str())),
        }
    }

    fn insert_edge(&mut self, mut stored: Stored<Edge>, now: Timestamp) {
        stored.value.created_at = Some(now);
        self.edges.insert(stored.value.edge_id.clone(), stored);
    }

    /// Insert a derived edge unless its key is already held. An existing
    /// edge keeps its properties and only has its stamp refreshed.
    fn insert_derived_edge(&mut self, stored: Stored<Edge>, now: Timestamp) {
        match self.edges.get_mut(&stored.value.edge_id) {
            Some(existing) => existing.value.created_at = Some(now),
            None => self.insert_edge(stored, now),
        }
    }

    fn refresh_metrics(&mut self, now: Timestamp) {
        self.metrics = GraphMetrics {
            total_jurisdictions: self.jurisdictions.len(),
            total_regulators: self.regulators.len(),
            total_obligations: self.obligations.len(),
            total_edges: self.edges.len(),
            conflict_count: self.edges.values().filter(|e| e.value.is_conflict()).count(),
            last_updated: Some(now),
        };
    }

    /// Combine the per-entity digests, each kind in key order.
    pub(crate) fn hash(&self) -> ContentDigest {
        let mut acc = Sha256Accumulator::new();
        acc.update(GRAPH_HASH_DOMAIN);
        absorb(&mut acc, b"jurisdictions", self.jurisdictions.values().map(|s| &s.digest));
        absorb(&mut acc, b"regulators", self.regulators.values().map(|s| &s.digest));
        absorb(&mut acc, b"obligations", self.obligations.values().map(|s| &s.digest));
        absorb(&mut acc, b"edges", self.edges.values().map(|s| &s.digest));
        acc.finalize()
    }
}

fn absorb<'a>(acc: &mut Sha256Accumulator, label: &[u8], digests: impl Iterator<Item = &'a String>) {
    acc.update(label);
    acc.update(b"\n");
    for digest in digests {
        acc.update(digest.as_bytes());
        acc.update(b"\n");
    }
    acc.update(b"\0");
}

/// Digest of an entity's canonical form without its bookkeeping stamp.
fn content_digest<T: Serialize>(
    entity: &T,
    stamp_field: &str,
) -> Result<String, CanonicalizationError> {
    let mut value = serde_json::to_value(entity)?;
    if let Value::Object(map) = &mut value {
        map.remove(stamp_field);
    }
    Ok(sha256_hex(&CanonicalBytes::from_value(value)?))
}

/// Assign the derived id and digest to an edge.
fn prepare_edge(mut edge: Edge) -> GraphResult<Stored<Edge>> {
    edge.edge_id = edge.derive_id()?;
    edge.created_at = None;
    let digest = content_digest(&edge, "created_at")?;
    Ok(Stored {
        value: edge,
        digest,
    })
}

/// The two edges implied by an obligation's jurisdiction and regulator.
fn derived_edges(obligation: &Obligation) -> [Edge; 2] {
    let node = NodeRef::obligation(&obligation.obligation_id);
    [
        Edge::new(
            EdgeType::AppliesIn,
            node.clone(),
            NodeRef::jurisdiction(&obligation.jurisdiction_code),
        ),
        Edge::new(
            EdgeType::Regulates,
            NodeRef::regulator(&obligation.regulator_id),
            node,
        ),
    ]
}

// -- GraphStore ---------------------------------------------------------------

/// The jurisdiction knowledge graph.
///
/// Share it behind an `Arc`; every method takes `&self`.
#[derive(Debug, Default)]
pub struct GraphStore {
    state: RwLock<GraphState>,
}

impl GraphStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access for the query layer. One guard per operation, so a
    /// query sees a single consistent state.
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, GraphState> {
        self.state.read()
    }

    /// Insert or overwrite a jurisdiction.
    ///
    /// # Errors
    ///
    /// [`GraphError::MissingIdentifier`] for a blank code.
    pub fn add_jurisdiction(&self, mut jurisdiction: Jurisdiction) -> GraphResult<()> {
        if jurisdiction.code.is_blank() {
            return Err(GraphError::MissingIdentifier {
                kind: JurisdictionCode::kind(),
            });
        }
        if jurisdiction.parent_code.as_ref().is_some_and(|p| p.is_blank()) {
            jurisdiction.parent_code = None;
        }
        jurisdiction.last_updated = None;
        let digest = content_digest(&jurisdiction, "last_updated")?;

        let now = Timestamp::now();
        jurisdiction.last_updated = Some(now);
        let code = jurisdiction.code.clone();

        let mut state = self.state.write();
        state.jurisdictions.insert(
            code.clone(),
            Stored {
                value: jurisdiction,
                digest,
            },
        );
        state.refresh_metrics(now);
        tracing::debug!(jurisdiction = %code, "jurisdiction stored");
        Ok(())
    }

    /// Insert or overwrite a regulator.
    ///
    /// # Errors
    ///
    /// [`GraphError::MissingIdentifier`] for a blank id.
    pub fn add_regulator(&self, mut regulator: Regulator) -> GraphResult<()> {
        if regulator.id.is_blank() {
            return Err(GraphError::MissingIdentifier {
                kind: RegulatorId::kind(),
            });
        }
        regulator.last_updated = None;
        let digest = content_digest(&regulator, "last_updated")?;

        let now = Timestamp::now();
        regulator.last_updated = Some(now);
        let id = regulator.id.clone();

        let mut state = self.state.write();
        state.regulators.insert(
            id.clone(),
            Stored {
                value: regulator,
                digest,
            },
        );
        state.refresh_metrics(now);
        tracing::debug!(regulator = %id, "regulator stored");
        Ok(())
    }

    /// Insert or overwrite an obligation and derive its `APPLIES_IN` and
    /// `REGULATES` edges.
    ///
    /// When an overwrite moves the obligation to another jurisdiction or
    /// regulator, the previously derived edges are removed.
    ///
    /// # Errors
    ///
    /// [`GraphError::MissingIdentifier`] for a blank id.
    pub fn add_obligation(&self, mut obligation: Obligation) -> GraphResult<()> {
        if obligation.obligation_id.is_blank() {
            return Err(GraphError::MissingIdentifier {
                kind: ObligationId::kind(),
            });
        }
        obligation.last_updated = None;
        let digest = content_digest(&obligation, "last_updated")?;
        let [applies_in, regulates] = derived_edges(&obligation);
        let applies_in = prepare_edge(applies_in)?;
        let regulates = prepare_edge(regulates)?;

        let now = Timestamp::now();
        obligation.last_updated = Some(now);
        let id = obligation.obligation_id.clone();

        let mut state = self.state.write();
        if let Some(previous) = state.obligation(&id) {
            tracing::debug!(
                obligation = %id,
                old_version = previous.version,
                new_version = obligation.version,
                "overwriting obligation"
            );
            let mut stale = Vec::new();
            for edge in derived_edges(previous) {
                let edge_id = edge.derive_id()?;
                if edge_id != applies_in.value.edge_id && edge_id != regulates.value.edge_id {
                    stale.push(edge_id);
                }
            }
            // Curated edges on a derived key carry properties and stay.
            for edge_id in stale {
                if state
                    .edges
                    .get(&edge_id)
                    .is_some_and(|e| e.value.properties.is_empty())
                {
                    state.edges.remove(&edge_id);
                }
            }
        }
        state.obligations.insert(
            id.clone(),
            Stored {
                value: obligation,
                digest,
            },
        );
        state.insert_derived_edge(applies_in, now);
        state.insert_derived_edge(regulates, now);
        state.refresh_metrics(now);
        tracing::debug!(obligation = %id, "obligation stored");
        Ok(())
    }

    /// Insert or overwrite an edge. The identifier is always derived from
    /// the edge's type and endpoints; a caller-supplied one is replaced.
    ///
    /// # Errors
    ///
    /// - [`GraphError::MissingEndpoint`] if either endpoint id is blank.
    /// - [`GraphError::Canonicalization`] if a property holds a float.
    pub fn add_edge(&self, edge: Edge) -> GraphResult<EdgeId> {
        if edge.from_id.trim().is_empty() {
            return Err(GraphError::MissingEndpoint { side: "from" });
        }
        if edge.to_id.trim().is_empty() {
            return Err(GraphError::MissingEndpoint { side: "to" });
        }
        let stored = prepare_edge(edge)?;
        let edge_id = stored.value.edge_id.clone();
        let edge_type = stored.value.edge_type;

        let now = Timestamp::now();
        let mut state = self.state.write();
        state.insert_edge(stored, now);
        state.refresh_metrics(now);
        tracing::debug!(edge = %edge_id, edge_type = %edge_type, "edge stored");
        Ok(edge_id)
    }

    /// Look up a jurisdiction.
    pub fn get_jurisdiction(&self, code: &JurisdictionCode) -> Option<Jurisdiction> {
        self.state.read().jurisdiction(code).cloned()
    }

    /// Look up a regulator.
    pub fn get_regulator(&self, id: &RegulatorId) -> Option<Regulator> {
        self.state.read().regulators.get(id).map(|s| s.value.clone())
    }

    /// Look up an obligation.
    pub fn get_obligation(&self, id: &ObligationId) -> Option<Obligation> {
        self.state.read().obligation(id).cloned()
    }

    /// Look up an edge.
    pub fn get_edge(&self, id: &EdgeId) -> Option<Edge> {
        self.state.read().edges.get(id).map(|s| s.value.clone())
    }

    /// All jurisdictions, by code.
    pub fn list_jurisdictions(&self) -> Vec<Jurisdiction> {
        let state = self.state.read();
        state.jurisdictions.values().map(|s| s.value.clone()).collect()
    }

    /// All regulators, by id.
    pub fn list_regulators(&self) -> Vec<Regulator> {
        let state = self.state.read();
        state.regulators.values().map(|s| s.value.clone()).collect()
    }

    /// All obligations, by id.
    pub fn list_obligations(&self) -> Vec<Obligation> {
        self.state.read().obligations().cloned().collect()
    }

    /// Edges leaving `node`, by edge id.
    pub fn edges_from(&self, node: &NodeRef) -> Vec<Edge> {
        let state = self.state.read();
        state
            .edges()
            .filter(|e| e.from_type == node.node_type && e.from_id == node.id)
            .cloned()
            .collect()
    }

    /// Edges arriving at `node`, by edge id.
    pub fn edges_to(&self, node: &NodeRef) -> Vec<Edge> {
        let state = self.state.read();
        state
            .edges()
            .filter(|e| e.to_type == node.node_type && e.to_id == node.id)
            .cloned()
            .collect()
    }

    /// Parent chain of `code`, nearest first.
    pub fn ancestors(&self, code: &JurisdictionCode) -> Vec<JurisdictionCode> {
        self.state.read().ancestors(code)
    }

    /// Non-expired obligations registered under `code` or any of its
    /// ancestors. Own obligations come first, then each ancestor's, each
    /// group in id order.
    pub fn get_obligations_for_jurisdiction(&self, code: &JurisdictionCode) -> Vec<Obligation> {
        self.state
            .read()
            .obligations_for_jurisdiction(code, Timestamp::now())
    }

    /// Union of [`GraphStore::get_obligations_for_jurisdiction`] over
    /// `codes`, de-duplicated by id, keeping only obligations whose subject
    /// criteria match `entity_type`.
    pub fn find_applicable_obligations(
        &self,
        codes: &[JurisdictionCode],
        entity_type: &str,
    ) -> Vec<Obligation> {
        let state = self.state.read();
        let now = Timestamp::now();
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for code in codes {
            for obligation in state.obligations_for_jurisdiction(code, now) {
                if seen.contains(&obligation.obligation_id) {
                    continue;
                }
                let subject = obligation.subject();
                if !subject.is_recognized() {
                    tracing::debug!(
                        obligation = %obligation.obligation_id,
                        criteria = %obligation.subject_criteria,
                        "unrecognized subject criteria, applying to all entity types"
                    );
                }
                if subject.matches(entity_type) {
                    seen.insert(obligation.obligation_id.clone());
                    out.push(obligation);
                }
            }
        }
        out
    }

    /// All conflicts-with edges, by edge id.
    pub fn get_conflicts(&self) -> Vec<Edge> {
        let state = self.state.read();
        state.edges().filter(|e| e.is_conflict()).cloned().collect()
    }

    /// Deterministic digest of the full store content.
    ///
    /// Independent of insertion order and of write times.
    pub fn hash(&self) -> ContentDigest {
        self.state.read().hash()
    }

    /// Snapshot of the aggregate counts.
    pub fn metrics(&self) -> GraphMetrics {
        self.state.read().metrics.clone()
    }

    /// Report structural problems: unregistered parents and parent cycles,
    /// obligations pointing at unregistered jurisdictions or regulators,
    /// and edges with unregistered endpoints.
    pub fn validate(&self) -> ValidationReport {
        let state = self.state.read();
        let mut report = ValidationReport::default();

        for j in state.jurisdictions.values().map(|s| &s.value) {
            if let Some(parent) = &j.parent_code {
                if !state.jurisdictions.contains_key(parent) {
                    report.dangling_parents.push(DanglingParent {
                        code: j.code.clone(),
                        parent_code: parent.clone(),
                    });
                }
            }
            if state.in_parent_cycle(&j.code) {
                report.parent_cycles.push(j.code.clone());
            }
        }

        for o in state.obligations() {
            if !state.jurisdictions.contains_key(&o.jurisdiction_code) {
                report.unknown_jurisdictions.push(o.obligation_id.clone());
            }
            if !state.regulators.contains_key(&o.regulator_id) {
                report.unknown_regulators.push(o.obligation_id.clone());
            }
        }

        for e in state.edges() {
            if !state.node_exists(&e.from_node()) || !state.node_exists(&e.to_node()) {
                report.dangling_edges.push(e.edge_id.clone());
            }
        }

        if !report.is_clean() {
            tracing::debug!(
                dangling_parents = report.dangling_parents.len(),
                parent_cycles = report.parent_cycles.len(),
                unknown_jurisdictions = report.unknown_jurisdictions.len(),
                unknown_regulators = report.unknown_regulators.len(),
                dangling_edges = report.dangling_edges.len(),
                "graph validation found problems"
            );
        }
        report
    }
}
