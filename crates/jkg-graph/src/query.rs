//! # Applicability Query
//!
//! Read-only resolution over a [`GraphStore`]: which obligations apply to
//! an entity operating in a set of jurisdictions, which of them are in
//! declared conflict, and how they break down by risk and framework.
//!
//! ## Resolution
//!
//! For each requested jurisdiction, in request order, an obligation is kept
//! when
//!
//! 1. its home jurisdiction is the requested code or one of its ancestors,
//! 2. its framework matches the filter (case-insensitive), if any,
//! 3. it is effective at `as_of_date`, if given,
//! 4. it is not past its sunset now, unless `include_expired`,
//! 5. its subject criteria match `entity_type`, if `match_subject`.
//!
//! Results are de-duplicated by id (the first requested code that resolved
//! an obligation is recorded in `resolved_via`) and ordered by risk level
//! descending, then id.
//!
//! The whole resolution runs under one read guard, so obligations,
//! conflicts and `graph_version` describe the same store state.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use jkg_core::{JurisdictionCode, ObligationId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::edge::{NodeType, PROP_REASON, PROP_SEVERITY};
use crate::model::{Obligation, RiskLevel};
use crate::store::GraphStore;

/// Severity reported for conflict edges that do not declare one.
pub const UNKNOWN_SEVERITY: &str = "unknown";

/// Input to [`ApplicabilityQuery::find_applicable`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicabilityRequest {
    /// Entity being assessed.
    pub entity_id: String,
    /// Entity type (`"CASP"`, `"BANK"`).
    pub entity_type: String,
    /// Jurisdictions the entity operates in.
    pub jurisdictions: Vec<JurisdictionCode>,
    /// Framework filter; empty means all frameworks.
    #[serde(default)]
    pub frameworks: Vec<String>,
    /// Point in time the obligations must be effective at.
    #[serde(default)]
    pub as_of_date: Option<Timestamp>,
    /// Keep obligations already past their sunset.
    #[serde(default)]
    pub include_expired: bool,
    /// Also filter by subject criteria against `entity_type`.
    #[serde(default)]
    pub match_subject: bool,
}

impl ApplicabilityRequest {
    /// A request without framework, date or subject filtering.
    pub fn new(
        entity_id: impl Into<String>,
        entity_type: impl Into<String>,
        jurisdictions: impl IntoIterator<Item = JurisdictionCode>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            entity_type: entity_type.into(),
            jurisdictions: jurisdictions.into_iter().collect(),
            ..Self::default()
        }
    }
}

/// A declared conflict between two resolved obligations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictInfo {
    /// Source of the conflicts-with edge.
    pub obligation_a: Obligation,
    /// Target of the conflicts-with edge.
    pub obligation_b: Obligation,
    /// Declared reason; empty if the edge has none.
    pub conflict_reason: String,
    /// Declared severity; `"unknown"` if the edge has none.
    pub severity: String,
    /// Suggested resolution.
    pub recommendation: String,
}

/// Output of [`ApplicabilityQuery::find_applicable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicabilityResult {
    /// Entity the request was for.
    pub entity_id: String,
    /// Resolved obligations, risk descending then id.
    pub obligations: Vec<Obligation>,
    /// Conflicts among the resolved obligations, by edge id.
    pub conflicts: Vec<ConflictInfo>,
    /// For each resolved obligation, the requested code that resolved it.
    pub resolved_via: BTreeMap<ObligationId, JurisdictionCode>,
    /// Obligation count per risk level.
    pub risk_summary: BTreeMap<RiskLevel, usize>,
    /// Obligation count per framework.
    pub framework_coverage: BTreeMap<String, usize>,
    /// Store hash at resolution time (hex).
    pub graph_version: String,
    /// When the resolution ran.
    pub query_timestamp: Timestamp,
}

/// Query layer over a shared store.
#[derive(Debug, Clone)]
pub struct ApplicabilityQuery {
    graph: Arc<GraphStore>,
}

impl ApplicabilityQuery {
    /// Wrap a store.
    pub fn new(graph: Arc<GraphStore>) -> Self {
        Self { graph }
    }

    /// The underlying store.
    pub fn graph(&self) -> &Arc<GraphStore> {
        &self.graph
    }

    /// Resolve the obligations applicable to `request`.
    pub fn find_applicable(&self, request: &ApplicabilityRequest) -> ApplicabilityResult {
        let state = self.graph.read();
        let now = Timestamp::now();
        let frameworks: Vec<String> = request
            .frameworks
            .iter()
            .map(|f| f.to_lowercase())
            .collect();

        let mut seen = BTreeSet::new();
        let mut obligations = Vec::new();
        let mut resolved_via = BTreeMap::new();

        for code in &request.jurisdictions {
            let lineage = state.lineage(code);
            for o in state.obligations() {
                if seen.contains(&o.obligation_id) || !lineage.contains(&o.jurisdiction_code) {
                    continue;
                }
                if !frameworks.is_empty() && !frameworks.contains(&o.framework.to_lowercase()) {
                    continue;
                }
                if let Some(as_of) = request.as_of_date {
                    if !o.is_effective_at(as_of) {
                        continue;
                    }
                }
                if !request.include_expired && o.is_expired_at(now) {
                    continue;
                }
                if request.match_subject && !o.applies_to(&request.entity_type) {
                    continue;
                }
                seen.insert(o.obligation_id.clone());
                resolved_via.insert(o.obligation_id.clone(), code.clone());
                obligations.push(o.clone());
            }
        }

        obligations.sort_by(|a, b| {
            b.risk_level
                .cmp(&a.risk_level)
                .then_with(|| a.obligation_id.cmp(&b.obligation_id))
        });

        let mut conflicts = Vec::new();
        for edge in state.edges().filter(|e| {
            e.is_conflict()
                && e.from_type == NodeType::Obligation
                && e.to_type == NodeType::Obligation
        }) {
            let a_id = ObligationId::new(edge.from_id.as_str());
            let b_id = ObligationId::new(edge.to_id.as_str());
            if !seen.contains(&a_id) || !seen.contains(&b_id) {
                continue;
            }
            let (Some(a), Some(b)) = (state.obligation(&a_id), state.obligation(&b_id)) else {
                continue;
            };
            let severity = edge
                .property_str(PROP_SEVERITY)
                .unwrap_or(UNKNOWN_SEVERITY)
                .to_string();
            conflicts.push(ConflictInfo {
                obligation_a: a.clone(),
                obligation_b: b.clone(),
                conflict_reason: edge.property_str(PROP_REASON).unwrap_or_default().to_string(),
                recommendation: recommendation(a, b, &severity),
                severity,
            });
        }

        let mut risk_summary = BTreeMap::new();
        let mut framework_coverage = BTreeMap::new();
        for o in &obligations {
            *risk_summary.entry(o.risk_level).or_insert(0) += 1;
            *framework_coverage.entry(o.framework.clone()).or_insert(0) += 1;
        }

        let graph_version = state.hash().to_hex();
        drop(state);

        tracing::debug!(
            entity = %request.entity_id,
            jurisdictions = ?request.jurisdictions,
            obligations = obligations.len(),
            conflicts = conflicts.len(),
            "applicability resolved"
        );

        ApplicabilityResult {
            entity_id: request.entity_id.clone(),
            obligations,
            conflicts,
            resolved_via,
            risk_summary,
            framework_coverage,
            graph_version,
            query_timestamp: now,
        }
    }

    /// Non-expired obligation count per framework across the whole store.
    pub fn framework_summary(&self) -> BTreeMap<String, usize> {
        let state = self.graph.read();
        let now = Timestamp::now();
        let mut summary = BTreeMap::new();
        for o in state.obligations().filter(|o| !o.is_expired_at(now)) {
            *summary.entry(o.framework.clone()).or_insert(0) += 1;
        }
        summary
    }

    /// Obligations becoming effective strictly between now and `days`
    /// from now, soonest first.
    pub fn upcoming_deadlines(&self, days: i64) -> Vec<Obligation> {
        let now = Timestamp::now();
        let Some(horizon) = now.checked_add_days(days) else {
            return Vec::new();
        };
        let state = self.graph.read();
        let mut upcoming: Vec<Obligation> = state
            .obligations()
            .filter(|o| o.effective_from.is_some_and(|at| at > now && at < horizon))
            .cloned()
            .collect();
        upcoming.sort_by(|a, b| {
            a.effective_from
                .cmp(&b.effective_from)
                .then_with(|| a.obligation_id.cmp(&b.obligation_id))
        });
        upcoming
    }

    /// Case-insensitive substring search over title, description and
    /// framework, by id.
    pub fn search_obligations(&self, text: &str) -> Vec<Obligation> {
        let needle = text.to_lowercase();
        let state = self.graph.read();
        state
            .obligations()
            .filter(|o| {
                o.title.to_lowercase().contains(&needle)
                    || o.description.to_lowercase().contains(&needle)
                    || o.framework.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }
}

fn recommendation(a: &Obligation, b: &Obligation, severity: &str) -> String {
    if severity == "critical" {
        return format!(
            "URGENT: Consult legal counsel for {} vs {} conflict",
            a.framework, b.framework
        );
    }
    match a.risk_level.cmp(&b.risk_level) {
        Ordering::Greater => format!(
            "Prioritize {} compliance ({}) over {}",
            a.title, a.framework, b.framework
        ),
        Ordering::Less => format!(
            "Prioritize {} compliance ({}) over {}",
            b.title, b.framework, a.framework
        ),
        Ordering::Equal => "Review both obligations and apply stricter requirement".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::{Edge, EdgeType, NodeRef};
    use crate::model::Jurisdiction;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn codes(list: &[&str]) -> Vec<JurisdictionCode> {
        list.iter().map(|c| JurisdictionCode::from(*c)).collect()
    }

    fn ids(result: &ApplicabilityResult) -> Vec<String> {
        result
            .obligations
            .iter()
            .map(|o| o.obligation_id.to_string())
            .collect()
    }

    fn store() -> Arc<GraphStore> {
        let store = GraphStore::new();
        store.add_jurisdiction(Jurisdiction::new("EU", "European Union")).unwrap();
        store
            .add_jurisdiction(Jurisdiction::new("BG", "Bulgaria").with_parent("EU"))
            .unwrap();
        store.add_jurisdiction(Jurisdiction::new("US", "United States")).unwrap();
        store
            .add_obligation(
                Obligation::new("EU-LOW", "EU", "EU-ESMA", "MiCA", RiskLevel::Low)
                    .with_title("Whitepaper"),
            )
            .unwrap();
        store
            .add_obligation(
                Obligation::new("EU-CRIT", "EU", "EU-ESMA", "MiCA", RiskLevel::Critical)
                    .with_title("Authorization"),
            )
            .unwrap();
        store
            .add_obligation(
                Obligation::new("BG-MED", "BG", "BG-FSC", "Local", RiskLevel::Medium)
                    .with_description("Local registration duty"),
            )
            .unwrap();
        store
            .add_obligation(
                Obligation::new("US-CRIT", "US", "US-FinCEN", "BSA", RiskLevel::Critical)
                    .with_title("SAR filing"),
            )
            .unwrap();
        Arc::new(store)
    }

    #[test]
    fn orders_by_risk_then_id() {
        let q = ApplicabilityQuery::new(store());
        let result = q.find_applicable(&ApplicabilityRequest::new("e", "CASP", codes(&["US", "EU"])));
        assert_eq!(ids(&result), vec!["EU-CRIT", "US-CRIT", "EU-LOW"]);
    }

    #[test]
    fn child_inherits_and_records_resolution_code() {
        let q = ApplicabilityQuery::new(store());
        let result = q.find_applicable(&ApplicabilityRequest::new("e", "CASP", codes(&["BG", "EU"])));
        assert_eq!(ids(&result), vec!["EU-CRIT", "BG-MED", "EU-LOW"]);
        assert_eq!(result.resolved_via[&ObligationId::from("EU-CRIT")].as_str(), "BG");
        assert_eq!(result.resolved_via[&ObligationId::from("BG-MED")].as_str(), "BG");
    }

    #[test]
    fn parent_does_not_inherit_from_child() {
        let q = ApplicabilityQuery::new(store());
        let result = q.find_applicable(&ApplicabilityRequest::new("e", "CASP", codes(&["EU"])));
        assert!(!ids(&result).contains(&"BG-MED".to_string()));
    }

    #[test]
    fn framework_filter_is_case_insensitive() {
        let q = ApplicabilityQuery::new(store());
        let mut request = ApplicabilityRequest::new("e", "CASP", codes(&["EU", "US"]));
        request.frameworks = vec!["mica".into()];
        let result = q.find_applicable(&request);
        assert_eq!(ids(&result), vec!["EU-CRIT", "EU-LOW"]);
        assert_eq!(result.framework_coverage.get("MiCA"), Some(&2));
        assert_eq!(result.risk_summary.get(&RiskLevel::Critical), Some(&1));
        assert_eq!(result.risk_summary.get(&RiskLevel::Low), Some(&1));
    }

    #[test]
    fn unknown_jurisdiction_resolves_nothing() {
        let q = ApplicabilityQuery::new(store());
        let result = q.find_applicable(&ApplicabilityRequest::new("e", "CASP", codes(&["ZZ"])));
        assert!(result.obligations.is_empty());
        assert!(result.conflicts.is_empty());
        assert_eq!(result.graph_version, q.graph().hash().to_hex());
    }

    #[test]
    fn subject_matching_is_opt_in() {
        let graph = store();
        graph
            .add_obligation(
                Obligation::new("BANK-ONLY", "US", "US-FinCEN", "BSA", RiskLevel::High)
                    .with_subject_criteria(r#"type == "BANK""#),
            )
            .unwrap();
        let q = ApplicabilityQuery::new(graph);
        let mut request = ApplicabilityRequest::new("e", "CASP", codes(&["US"]));
        assert_eq!(q.find_applicable(&request).obligations.len(), 2);
        request.match_subject = true;
        assert_eq!(ids(&q.find_applicable(&request)), vec!["US-CRIT"]);
    }

    #[test]
    fn recommendation_rules() {
        let high = Obligation::new("A", "EU", "R", "GDPR", RiskLevel::High).with_title("Privacy");
        let low = Obligation::new("B", "US", "R", "BSA", RiskLevel::Low).with_title("Report");
        assert_eq!(
            recommendation(&high, &low, "critical"),
            "URGENT: Consult legal counsel for GDPR vs BSA conflict"
        );
        assert_eq!(
            recommendation(&high, &low, "medium"),
            "Prioritize Privacy compliance (GDPR) over BSA"
        );
        assert_eq!(
            recommendation(&low, &high, "medium"),
            "Prioritize Privacy compliance (GDPR) over BSA"
        );
        assert_eq!(
            recommendation(&high, &high, "low"),
            "Review both obligations and apply stricter requirement"
        );
    }

    #[test]
    fn conflict_defaults_when_edge_has_no_properties() {
        let graph = store();
        graph
            .add_edge(Edge::new(
                crate::edge::EdgeType::ConflictsWith,
                crate::edge::NodeRef::obligation(&"EU-CRIT".into()),
                crate::edge::NodeRef::obligation(&"US-CRIT".into()),
            ))
            .unwrap();
        let q = ApplicabilityQuery::new(graph);
        let result = q.find_applicable(&ApplicabilityRequest::new("e", "CASP", codes(&["EU", "US"])));
        assert_eq!(result.conflicts.len(), 1);
        let c = &result.conflicts[0];
        assert_eq!(c.severity, UNKNOWN_SEVERITY);
        assert_eq!(c.conflict_reason, "");
        assert_eq!(c.recommendation, "Review both obligations and apply stricter requirement");
    }

    #[test]
    fn conflicts_between_other_node_types_are_ignored() {
        let graph = store();
        graph
            .add_edge(
                Edge::new(
                    EdgeType::ConflictsWith,
                    NodeRef::jurisdiction(&"EU-CRIT".into()),
                    NodeRef::jurisdiction(&"US-CRIT".into()),
                )
                .with_property(PROP_SEVERITY, serde_json::json!("critical")),
            )
            .unwrap();
        let q = ApplicabilityQuery::new(graph);
        let result = q.find_applicable(&ApplicabilityRequest::new("e", "CASP", codes(&["EU", "US"])));
        assert_eq!(result.obligations.len(), 3);
        assert!(result.conflicts.is_empty());
    }

    #[test]
    fn framework_summary_skips_expired() {
        let graph = store();
        graph
            .add_obligation(
                Obligation::new("OLD", "EU", "EU-ESMA", "MiCA", RiskLevel::Low)
                    .with_sunset_at(ts("2000-01-01T00:00:00Z")),
            )
            .unwrap();
        let summary = ApplicabilityQuery::new(graph).framework_summary();
        assert_eq!(summary.get("MiCA"), Some(&2));
        assert_eq!(summary.get("BSA"), Some(&1));
        assert_eq!(summary.get("Local"), Some(&1));
    }

    #[test]
    fn upcoming_deadlines_window_is_exclusive() {
        let graph = store();
        let now = Timestamp::now();
        graph
            .add_obligation(
                Obligation::new("SOON", "EU", "R", "F", RiskLevel::Low)
                    .with_effective_from(now.checked_add_days(5).unwrap()),
            )
            .unwrap();
        graph
            .add_obligation(
                Obligation::new("SOONER", "EU", "R", "F", RiskLevel::Low)
                    .with_effective_from(now.checked_add_days(2).unwrap()),
            )
            .unwrap();
        graph
            .add_obligation(
                Obligation::new("LATER", "EU", "R", "F", RiskLevel::Low)
                    .with_effective_from(now.checked_add_days(60).unwrap()),
            )
            .unwrap();
        graph
            .add_obligation(
                Obligation::new("PAST", "EU", "R", "F", RiskLevel::Low)
                    .with_effective_from(now.checked_add_days(-1).unwrap()),
            )
            .unwrap();
        let q = ApplicabilityQuery::new(graph);
        let upcoming: Vec<_> = q
            .upcoming_deadlines(30)
            .into_iter()
            .map(|o| o.obligation_id.to_string())
            .collect();
        assert_eq!(upcoming, vec!["SOONER", "SOON"]);
    }

    #[test]
    fn search_covers_title_description_framework() {
        let q = ApplicabilityQuery::new(store());
        let by_title: Vec<_> = q.search_obligations("sar").into_iter().map(|o| o.obligation_id).collect();
        assert_eq!(by_title, vec![ObligationId::from("US-CRIT")]);
        assert_eq!(q.search_obligations("REGISTRATION DUTY").len(), 1);
        assert_eq!(q.search_obligations("mica").len(), 2);
        assert!(q.search_obligations("nothing like this").is_empty());
    }
}
