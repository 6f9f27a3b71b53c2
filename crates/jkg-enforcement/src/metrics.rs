//! # Enforcement Metrics
//!
//! Cumulative counters kept by the engine, readable as a snapshot through
//! [`crate::EnforcementEngine::metrics`]. The same events are also emitted
//! through the `metrics` facade; the library installs no recorder, so
//! those are no-ops until the host application installs one.
//!
//! | Facade metric                          | Kind      | Labels    |
//! |----------------------------------------|-----------|-----------|
//! | `jkg_enforcement_checks_total`         | counter   | `overall` |
//! | `jkg_enforcement_obligations_total`    | counter   | `result`  |
//! | `jkg_enforcement_conflicts_total`      | counter   |           |
//! | `jkg_enforcement_check_seconds`        | histogram |           |

use std::collections::BTreeMap;
use std::time::Duration;

use jkg_core::JurisdictionCode;
use serde::{Deserialize, Serialize};

use crate::policy::PolicyResult;
use crate::result::{EnforcementResult, ObligationResult};

/// Snapshot of the engine's cumulative counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnforcementMetrics {
    /// Checks completed.
    pub total_checks: u64,
    /// Checks with overall `Permit`.
    pub compliant_checks: u64,
    /// Checks with overall `Deny`.
    pub non_compliant_checks: u64,
    /// Checks with overall `Indeterminate`.
    pub indeterminate_checks: u64,
    /// Obligations evaluated across all checks.
    pub obligations_evaluated: u64,
    /// Obligations that ended `Indeterminate`.
    pub error_count: u64,
    /// Mean wall time of a check.
    pub avg_evaluation_time: Duration,
    /// Obligations evaluated per resolving jurisdiction.
    pub by_jurisdiction: BTreeMap<JurisdictionCode, u64>,
    /// Obligations evaluated per framework.
    pub by_framework: BTreeMap<String, u64>,
    /// Conflicts reported across all checks.
    pub conflicts_detected: u64,
    #[serde(skip)]
    total_evaluation_time: Duration,
}

impl EnforcementMetrics {
    /// Count one evaluated obligation.
    pub(crate) fn record_obligation(&mut self, outcome: &ObligationResult) {
        self.obligations_evaluated += 1;
        *self
            .by_jurisdiction
            .entry(outcome.resolved_via.clone())
            .or_insert(0) += 1;
        *self
            .by_framework
            .entry(outcome.framework.clone())
            .or_insert(0) += 1;
        if outcome.result == PolicyResult::Indeterminate {
            self.error_count += 1;
        }
    }

    /// Count one completed check.
    pub(crate) fn record_check(&mut self, result: &EnforcementResult) {
        self.total_checks += 1;
        match result.overall {
            PolicyResult::Deny => self.non_compliant_checks += 1,
            PolicyResult::Indeterminate => self.indeterminate_checks += 1,
            PolicyResult::Permit | PolicyResult::NotApplicable => self.compliant_checks += 1,
        }
        self.conflicts_detected += result.conflicts.len() as u64;
        self.total_evaluation_time += result.evaluation_time;
        self.avg_evaluation_time = Duration::from_secs_f64(
            self.total_evaluation_time.as_secs_f64() / self.total_checks as f64,
        );
    }
}

/// Emit one completed check through the `metrics` facade.
pub(crate) fn publish(result: &EnforcementResult) {
    ::metrics::counter!("jkg_enforcement_checks_total", "overall" => result.overall.as_str())
        .increment(1);
    for outcome in &result.by_obligation {
        ::metrics::counter!("jkg_enforcement_obligations_total", "result" => outcome.result.as_str())
            .increment(1);
    }
    ::metrics::counter!("jkg_enforcement_conflicts_total").increment(result.conflicts.len() as u64);
    ::metrics::histogram!("jkg_enforcement_check_seconds").record(result.evaluation_time.as_secs_f64());
}
