//! # Enforcement Engine
//!
//! Runs one compliance check per call, in a single pass:
//!
//! 1. Validate the request and assign a request id if none was given.
//! 2. Resolve applicable obligations through the query layer. None means
//!    an immediate `Permit` without calling the compiler or evaluator.
//! 3. Under one deadline for the whole loop, compile and evaluate each
//!    obligation in order. Compile errors, evaluator errors, a missing
//!    evaluator and the deadline all yield `Indeterminate` for that
//!    obligation; nothing is dropped from the result.
//! 4. Aggregate: overall decision, per-jurisdiction tallies, conflicts,
//!    risk score, graph hash, wall time.
//!
//! ## Graph refresh
//!
//! The `(store, query)` pair sits behind a `parking_lot::RwLock` that is
//! held only long enough to clone the pair. A check keeps the snapshot it
//! started with; [`EnforcementEngine::refresh_graph`] affects later checks.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use jkg_core::{JurisdictionCode, Timestamp};
use jkg_graph::{ApplicabilityQuery, ApplicabilityRequest, GraphStore, Obligation};
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config::EnforcementConfig;
use crate::error::EnforcementError;
use crate::metrics::{publish, EnforcementMetrics};
use crate::policy::{EvaluationContext, PolicyCompiler, PolicyEvaluator, PolicyResult};
use crate::result::{
    overall_result, risk_score, ConflictResult, EnforcementRequest, EnforcementResult,
    JurisdictionResult, ObligationResult,
};

/// Message for obligations cut off by the deadline.
pub const DEADLINE_EXCEEDED: &str = "evaluation deadline exceeded";
/// Message for obligations checked without an evaluator.
pub const NO_EVALUATOR: &str = "no policy evaluator configured";

#[derive(Clone)]
struct GraphSnapshot {
    graph: Arc<GraphStore>,
    query: ApplicabilityQuery,
}

impl GraphSnapshot {
    fn new(graph: Arc<GraphStore>) -> Self {
        Self {
            query: ApplicabilityQuery::new(Arc::clone(&graph)),
            graph,
        }
    }
}

/// Per-check values shared by every obligation evaluation.
struct CheckScope<'a> {
    request_id: &'a str,
    entity_id: &'a str,
    context: &'a Map<String, Value>,
    deadline: Instant,
}

/// Compliance orchestrator over a knowledge graph.
pub struct EnforcementEngine {
    current: RwLock<GraphSnapshot>,
    compiler: Arc<dyn PolicyCompiler>,
    evaluator: Option<Arc<dyn PolicyEvaluator>>,
    config: EnforcementConfig,
    metrics: Mutex<EnforcementMetrics>,
}

impl fmt::Debug for EnforcementEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnforcementEngine")
            .field("config", &self.config)
            .field("has_evaluator", &self.evaluator.is_some())
            .finish_non_exhaustive()
    }
}

impl EnforcementEngine {
    /// Build an engine. With `evaluator = None`, every applicable
    /// obligation is reported `Indeterminate`.
    pub fn new(
        graph: Arc<GraphStore>,
        compiler: Arc<dyn PolicyCompiler>,
        evaluator: Option<Arc<dyn PolicyEvaluator>>,
        config: EnforcementConfig,
    ) -> Self {
        Self {
            current: RwLock::new(GraphSnapshot::new(graph)),
            compiler,
            evaluator,
            config,
            metrics: Mutex::new(EnforcementMetrics::default()),
        }
    }

    /// The store currently in use.
    pub fn graph(&self) -> Arc<GraphStore> {
        Arc::clone(&self.current.read().graph)
    }

    /// The query layer currently in use.
    pub fn query(&self) -> ApplicabilityQuery {
        self.current.read().query.clone()
    }

    /// Snapshot of the cumulative metrics.
    pub fn metrics(&self) -> EnforcementMetrics {
        self.metrics.lock().clone()
    }

    /// The engine's configuration.
    pub fn config(&self) -> &EnforcementConfig {
        &self.config
    }

    /// Swap in a new store. Checks already running finish against the
    /// store they started with.
    pub fn refresh_graph(&self, graph: Arc<GraphStore>) {
        let version = graph.hash().to_hex();
        *self.current.write() = GraphSnapshot::new(graph);
        tracing::info!(graph_version = %version, "enforcement graph refreshed");
    }

    /// Run one compliance check.
    ///
    /// # Errors
    ///
    /// [`EnforcementError::InvalidRequest`] if a requested jurisdiction
    /// code is blank. Every other failure is reported inside the result.
    pub fn check(&self, request: EnforcementRequest) -> Result<EnforcementResult, EnforcementError> {
        let start = Instant::now();
        let started_at = Timestamp::now();

        if let Some(pos) = request.jurisdictions.iter().position(JurisdictionCode::is_blank) {
            return Err(EnforcementError::InvalidRequest(format!(
                "jurisdiction code at position {pos} is blank"
            )));
        }

        let request_id = request
            .request_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(generate_request_id);

        let snapshot = self.current.read().clone();
        let applicability = snapshot.query.find_applicable(&ApplicabilityRequest {
            entity_id: request.entity_id.clone(),
            entity_type: request.entity_type.clone(),
            jurisdictions: request.jurisdictions.clone(),
            frameworks: request.frameworks.clone(),
            as_of_date: request.as_of_date,
            include_expired: false,
            match_subject: false,
        });

        let mut result = EnforcementResult {
            request_id,
            entity_id: request.entity_id.clone(),
            timestamp: started_at,
            overall: PolicyResult::Permit,
            by_obligation: Vec::new(),
            by_jurisdiction: BTreeMap::new(),
            conflicts: Vec::new(),
            risk_score: 0.0,
            evaluation_time: Default::default(),
            graph_version: applicability.graph_version.clone(),
        };

        if applicability.obligations.is_empty() {
            tracing::debug!(
                request_id = %result.request_id,
                entity = %result.entity_id,
                "no applicable obligations"
            );
            return Ok(self.finish(result, start));
        }

        for code in &request.jurisdictions {
            result
                .by_jurisdiction
                .entry(code.clone())
                .or_insert_with(|| JurisdictionResult::new(code.clone()));
        }

        let scope = CheckScope {
            request_id: &result.request_id,
            entity_id: &result.entity_id,
            context: &request.context,
            deadline: Instant::now() + self.config.evaluation_timeout(),
        };

        let mut outcomes = Vec::with_capacity(applicability.obligations.len());
        let mut deadline_logged = false;
        for obligation in &applicability.obligations {
            let resolved_via = applicability
                .resolved_via
                .get(&obligation.obligation_id)
                .cloned()
                .unwrap_or_else(|| obligation.jurisdiction_code.clone());

            let outcome = if Instant::now() >= scope.deadline {
                if !deadline_logged {
                    tracing::warn!(
                        request_id = %scope.request_id,
                        remaining = applicability.obligations.len() - outcomes.len(),
                        "evaluation deadline exceeded, remaining obligations are indeterminate"
                    );
                    deadline_logged = true;
                }
                indeterminate(obligation, resolved_via, None, DEADLINE_EXCEEDED.to_string())
            } else {
                self.evaluate_obligation(&scope, obligation, resolved_via)
            };

            result
                .by_jurisdiction
                .entry(outcome.resolved_via.clone())
                .or_insert_with(|| JurisdictionResult::new(outcome.resolved_via.clone()))
                .record(outcome.result);
            self.metrics.lock().record_obligation(&outcome);
            outcomes.push(outcome);
        }

        result.overall = overall_result(&outcomes, self.config.strict_indeterminate);
        result.risk_score = risk_score(&outcomes);
        result.by_obligation = outcomes;
        result.conflicts = applicability
            .conflicts
            .iter()
            .map(ConflictResult::from)
            .collect();

        Ok(self.finish(result, start))
    }

    fn evaluate_obligation(
        &self,
        scope: &CheckScope<'_>,
        obligation: &Obligation,
        resolved_via: JurisdictionCode,
    ) -> ObligationResult {
        let policy = match self.compiler.compile(
            &obligation.description,
            &obligation.framework,
            &obligation.article_ref,
        ) {
            Ok(policy) => policy,
            Err(e) => {
                tracing::warn!(
                    request_id = %scope.request_id,
                    obligation = %obligation.obligation_id,
                    error = %e,
                    "policy compilation failed"
                );
                return indeterminate(obligation, resolved_via, None, format!("compilation error: {e}"));
            }
        };

        let Some(evaluator) = &self.evaluator else {
            return indeterminate(
                obligation,
                resolved_via,
                Some(policy.expression),
                NO_EVALUATOR.to_string(),
            );
        };

        let ctx = EvaluationContext {
            request_id: scope.request_id,
            entity_id: scope.entity_id,
            obligation_id: &obligation.obligation_id,
            deadline: scope.deadline,
        };
        let evaluated = evaluator.evaluate(&ctx, &policy.expression, scope.context);

        if ctx.is_expired() {
            tracing::warn!(
                request_id = %scope.request_id,
                obligation = %obligation.obligation_id,
                "evaluation returned after the deadline"
            );
            return indeterminate(
                obligation,
                resolved_via,
                Some(policy.expression),
                DEADLINE_EXCEEDED.to_string(),
            );
        }

        match evaluated {
            Ok(result) => ObligationResult {
                obligation_id: obligation.obligation_id.clone(),
                framework: obligation.framework.clone(),
                title: obligation.title.clone(),
                jurisdiction_code: obligation.jurisdiction_code.clone(),
                resolved_via,
                result,
                expression: Some(policy.expression),
                risk_level: obligation.risk_level,
                error_message: None,
            },
            Err(e) => {
                tracing::warn!(
                    request_id = %scope.request_id,
                    obligation = %obligation.obligation_id,
                    error = %e,
                    "policy evaluation failed"
                );
                indeterminate(
                    obligation,
                    resolved_via,
                    Some(policy.expression),
                    format!("evaluation error: {e}"),
                )
            }
        }
    }

    fn finish(&self, mut result: EnforcementResult, start: Instant) -> EnforcementResult {
        result.evaluation_time = start.elapsed();
        self.metrics.lock().record_check(&result);
        publish(&result);
        tracing::info!(
            request_id = %result.request_id,
            entity = %result.entity_id,
            overall = %result.overall,
            risk_score = result.risk_score,
            evaluated = result.by_obligation.len(),
            conflicts = result.conflicts.len(),
            graph_version = %result.graph_version,
            "compliance check complete"
        );
        result
    }
}

fn indeterminate(
    obligation: &Obligation,
    resolved_via: JurisdictionCode,
    expression: Option<String>,
    message: String,
) -> ObligationResult {
    ObligationResult {
        obligation_id: obligation.obligation_id.clone(),
        framework: obligation.framework.clone(),
        title: obligation.title.clone(),
        jurisdiction_code: obligation.jurisdiction_code.clone(),
        resolved_via,
        result: PolicyResult::Indeterminate,
        expression,
        risk_level: obligation.risk_level,
        error_message: Some(message),
    }
}

fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{CompileError, CompiledPolicy, EvaluatorError};
    use jkg_graph::RiskLevel;

    struct EchoCompiler;

    impl PolicyCompiler for EchoCompiler {
        fn compile(
            &self,
            _text: &str,
            framework: &str,
            article_ref: &str,
        ) -> Result<CompiledPolicy, CompileError> {
            Ok(CompiledPolicy {
                expression: format!("{framework}/{article_ref}"),
                risk_level: RiskLevel::Medium,
            })
        }
    }

    struct Fixed(PolicyResult);

    impl PolicyEvaluator for Fixed {
        fn evaluate(
            &self,
            _ctx: &EvaluationContext<'_>,
            _expression: &str,
            _input: &Map<String, Value>,
        ) -> Result<PolicyResult, EvaluatorError> {
            Ok(self.0)
        }
    }

    fn graph() -> Arc<GraphStore> {
        let store = GraphStore::new();
        store
            .add_obligation(
                Obligation::new("O1", "EU", "EU-ESMA", "MiCA", RiskLevel::High)
                    .with_article_ref("Article 59"),
            )
            .unwrap();
        Arc::new(store)
    }

    fn engine(evaluator: Option<Arc<dyn PolicyEvaluator>>) -> EnforcementEngine {
        EnforcementEngine::new(
            graph(),
            Arc::new(EchoCompiler),
            evaluator,
            EnforcementConfig::default(),
        )
    }

    fn eu_request() -> EnforcementRequest {
        EnforcementRequest::new("acme", "CASP", [JurisdictionCode::from("EU")])
    }

    #[test]
    fn blank_jurisdiction_is_invalid() {
        let e = engine(None);
        let req = EnforcementRequest::new("acme", "CASP", [JurisdictionCode::from(" ")]);
        assert!(matches!(e.check(req), Err(EnforcementError::InvalidRequest(_))));
        assert_eq!(e.metrics().total_checks, 0);
    }

    #[test]
    fn request_id_kept_or_generated() {
        let e = engine(Some(Arc::new(Fixed(PolicyResult::Permit))));
        let kept = e.check(eu_request().with_request_id("req-1")).unwrap();
        assert_eq!(kept.request_id, "req-1");

        let generated = e.check(eu_request().with_request_id("  ")).unwrap();
        assert!(Uuid::parse_str(&generated.request_id).is_ok());
        let other = e.check(eu_request()).unwrap();
        assert_ne!(generated.request_id, other.request_id);
    }

    #[test]
    fn expression_is_recorded() {
        let e = engine(Some(Arc::new(Fixed(PolicyResult::Permit))));
        let result = e.check(eu_request()).unwrap();
        assert_eq!(result.overall, PolicyResult::Permit);
        assert_eq!(
            result.by_obligation[0].expression.as_deref(),
            Some("MiCA/Article 59")
        );
        assert_eq!(result.graph_version, e.graph().hash().to_hex());
    }

    #[test]
    fn timestamp_marks_the_start_of_the_check() {
        let e = engine(Some(Arc::new(Fixed(PolicyResult::Permit))));
        let before = Timestamp::now();
        let result = e.check(eu_request()).unwrap();
        let after = Timestamp::now();
        assert!(before <= result.timestamp && result.timestamp <= after);
    }

    #[test]
    fn missing_evaluator_keeps_expression_and_fails_closed() {
        let e = engine(None);
        let result = e.check(eu_request()).unwrap();
        let o = &result.by_obligation[0];
        assert_eq!(o.result, PolicyResult::Indeterminate);
        assert_eq!(o.error_message.as_deref(), Some(NO_EVALUATOR));
        assert!(o.expression.is_some());
        assert_eq!(result.overall, PolicyResult::Indeterminate);
    }

    #[test]
    fn debug_does_not_require_debug_collaborators() {
        let rendered = format!("{:?}", engine(None));
        assert!(rendered.contains("has_evaluator: false"));
    }
}
