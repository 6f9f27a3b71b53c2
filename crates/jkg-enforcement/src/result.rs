//! # Requests and Results
//!
//! [`EnforcementRequest`] is what a caller asks; [`EnforcementResult`] is
//! the auditable answer. The result carries the graph hash it was computed
//! against, so an audit trail can tie every decision to the exact graph
//! content.

use std::collections::BTreeMap;
use std::time::Duration;

use jkg_core::{JurisdictionCode, ObligationId, Timestamp};
use jkg_graph::{ConflictInfo, RiskLevel};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::policy::PolicyResult;

/// Input to [`crate::EnforcementEngine::check`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnforcementRequest {
    /// Caller-supplied id; a random one is assigned when absent or blank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Entity being checked.
    pub entity_id: String,
    /// Entity type (`"CASP"`, `"BANK"`).
    pub entity_type: String,
    /// Jurisdictions the entity operates in.
    pub jurisdictions: Vec<JurisdictionCode>,
    /// Framework filter; empty means all.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frameworks: Vec<String>,
    /// Facts about the entity, handed to the evaluator.
    #[serde(default)]
    pub context: Map<String, Value>,
    /// Point in time obligations must be effective at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of_date: Option<Timestamp>,
}

impl EnforcementRequest {
    /// A request with an empty context and no filters.
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

    /// Set the request id.
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Add a context fact.
    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    /// Restrict to the given frameworks.
    pub fn with_frameworks<I, S>(mut self, frameworks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.frameworks = frameworks.into_iter().map(Into::into).collect();
        self
    }
}

/// Outcome for one obligation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObligationResult {
    /// The obligation.
    pub obligation_id: ObligationId,
    /// Its framework.
    pub framework: String,
    /// Its title.
    pub title: String,
    /// Its home jurisdiction.
    pub jurisdiction_code: JurisdictionCode,
    /// The requested jurisdiction through which it applied.
    pub resolved_via: JurisdictionCode,
    /// Evaluation outcome.
    pub result: PolicyResult,
    /// Compiled expression, when compilation succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    /// Risk level of the obligation.
    pub risk_level: RiskLevel,
    /// Why the result is `Indeterminate`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Per-jurisdiction tallies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JurisdictionResult {
    /// The requested jurisdiction.
    pub jurisdiction_code: JurisdictionCode,
    /// Obligations resolved through it.
    pub total_obligations: usize,
    /// `Permit` results.
    pub compliant: usize,
    /// `Deny` results.
    pub non_compliant: usize,
    /// `NotApplicable` results.
    pub not_applicable: usize,
    /// `Indeterminate` results.
    pub errors: usize,
}

impl JurisdictionResult {
    /// Empty tallies for `code`.
    pub fn new(code: JurisdictionCode) -> Self {
        Self {
            jurisdiction_code: code,
            total_obligations: 0,
            compliant: 0,
            non_compliant: 0,
            not_applicable: 0,
            errors: 0,
        }
    }

    /// Count one obligation outcome.
    pub fn record(&mut self, result: PolicyResult) {
        self.total_obligations += 1;
        match result {
            PolicyResult::Permit => self.compliant += 1,
            PolicyResult::Deny => self.non_compliant += 1,
            PolicyResult::NotApplicable => self.not_applicable += 1,
            PolicyResult::Indeterminate => self.errors += 1,
        }
    }
}

/// A declared conflict among the evaluated obligations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictResult {
    /// First obligation.
    pub obligation_a: ObligationId,
    /// Second obligation.
    pub obligation_b: ObligationId,
    /// Home jurisdiction of the first.
    pub jurisdiction_a: JurisdictionCode,
    /// Home jurisdiction of the second.
    pub jurisdiction_b: JurisdictionCode,
    /// Declared severity.
    pub severity: String,
    /// Recommended resolution.
    pub resolution: String,
    /// Declared reason.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

impl From<&ConflictInfo> for ConflictResult {
    fn from(c: &ConflictInfo) -> Self {
        Self {
            obligation_a: c.obligation_a.obligation_id.clone(),
            obligation_b: c.obligation_b.obligation_id.clone(),
            jurisdiction_a: c.obligation_a.jurisdiction_code.clone(),
            jurisdiction_b: c.obligation_b.jurisdiction_code.clone(),
            severity: c.severity.clone(),
            resolution: c.recommendation.clone(),
            notes: c.conflict_reason.clone(),
        }
    }
}

/// The auditable answer to one check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnforcementResult {
    /// Request id (caller-supplied or generated).
    pub request_id: String,
    /// Entity checked.
    pub entity_id: String,
    /// When the check started.
    pub timestamp: Timestamp,
    /// Aggregate decision.
    pub overall: PolicyResult,
    /// One entry per applicable obligation, risk descending then id.
    pub by_obligation: Vec<ObligationResult>,
    /// Tallies per requested jurisdiction.
    pub by_jurisdiction: BTreeMap<JurisdictionCode, JurisdictionResult>,
    /// Declared conflicts among the applicable obligations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<ConflictResult>,
    /// Weighted share of denied obligations, in `[0, 1]`.
    pub risk_score: f64,
    /// Wall time of the check.
    pub evaluation_time: Duration,
    /// Graph hash (hex) the check was computed against.
    pub graph_version: String,
}

/// Aggregate decision over obligation results.
///
/// Any `Deny` wins. Otherwise, in strict mode, any `Indeterminate` makes
/// the whole check `Indeterminate`; everything else is `Permit`.
pub fn overall_result(results: &[ObligationResult], strict_indeterminate: bool) -> PolicyResult {
    if results.iter().any(|r| r.result == PolicyResult::Deny) {
        return PolicyResult::Deny;
    }
    if strict_indeterminate && results.iter().any(|r| r.result == PolicyResult::Indeterminate) {
        return PolicyResult::Indeterminate;
    }
    PolicyResult::Permit
}

/// Weighted share of denied obligations.
///
/// `sum(weight of Deny) / sum(weight of all)`, with weights from
/// [`RiskLevel::weight`]; zero when nothing was evaluated.
pub fn risk_score(results: &[ObligationResult]) -> f64 {
    let (denied, total) = results.iter().fold((0.0, 0.0), |(denied, total), r| {
        let w = r.risk_level.weight();
        if r.result == PolicyResult::Deny {
            (denied + w, total + w)
        } else {
            (denied, total + w)
        }
    });
    if total == 0.0 {
        0.0
    } else {
        denied / total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn outcome(id: &str, risk: RiskLevel, result: PolicyResult) -> ObligationResult {
        ObligationResult {
            obligation_id: id.into(),
            framework: "F".into(),
            title: String::new(),
            jurisdiction_code: "EU".into(),
            resolved_via: "EU".into(),
            result,
            expression: None,
            risk_level: risk,
            error_message: None,
        }
    }

    #[test]
    fn deny_dominates() {
        let results = vec![
            outcome("a", RiskLevel::Low, PolicyResult::Indeterminate),
            outcome("b", RiskLevel::Low, PolicyResult::Deny),
            outcome("c", RiskLevel::Low, PolicyResult::Permit),
        ];
        assert_eq!(overall_result(&results, true), PolicyResult::Deny);
        assert_eq!(overall_result(&results, false), PolicyResult::Deny);
    }

    #[test]
    fn indeterminate_blocks_permit_only_when_strict() {
        let results = vec![
            outcome("a", RiskLevel::Low, PolicyResult::Permit),
            outcome("b", RiskLevel::Low, PolicyResult::Indeterminate),
        ];
        assert_eq!(overall_result(&results, true), PolicyResult::Indeterminate);
        assert_eq!(overall_result(&results, false), PolicyResult::Permit);
    }

    #[test]
    fn not_applicable_is_permit() {
        let results = vec![outcome("a", RiskLevel::High, PolicyResult::NotApplicable)];
        assert_eq!(overall_result(&results, true), PolicyResult::Permit);
        assert_eq!(overall_result(&[], true), PolicyResult::Permit);
    }

    #[test]
    fn risk_score_weights() {
        assert_eq!(risk_score(&[]), 0.0);
        let results = vec![
            outcome("a", RiskLevel::Critical, PolicyResult::Deny),
            outcome("b", RiskLevel::Medium, PolicyResult::Permit),
        ];
        assert!((risk_score(&results) - 4.0 / 6.0).abs() < 1e-12);
        let info = vec![
            outcome("a", RiskLevel::Info, PolicyResult::Deny),
            outcome("b", RiskLevel::Low, PolicyResult::Indeterminate),
        ];
        assert!((risk_score(&info) - 0.5 / 1.5).abs() < 1e-12);
    }

    #[test]
    fn tallies() {
        let mut j = JurisdictionResult::new("US".into());
        for r in [
            PolicyResult::Permit,
            PolicyResult::Deny,
            PolicyResult::Deny,
            PolicyResult::NotApplicable,
            PolicyResult::Indeterminate,
        ] {
            j.record(r);
        }
        assert_eq!(j.total_obligations, 5);
        assert_eq!(j.compliant, 1);
        assert_eq!(j.non_compliant, 2);
        assert_eq!(j.not_applicable, 1);
        assert_eq!(j.errors, 1);
    }

    #[test]
    fn request_id_is_optional_on_the_wire() {
        let req: EnforcementRequest = serde_json::from_value(serde_json::json!({
            "entity_id": "acme",
            "entity_type": "CASP",
            "jurisdictions": ["EU"]
        }))
        .unwrap();
        assert!(req.request_id.is_none());
        assert!(req.context.is_empty());
    }
}
