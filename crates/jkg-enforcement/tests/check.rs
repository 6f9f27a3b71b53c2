//! End-to-end compliance checks through [`EnforcementEngine`] with stub
//! compilers and evaluators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use jkg_core::JurisdictionCode;
use jkg_enforcement::{
    CompileError, CompiledPolicy, EnforcementConfig, EnforcementEngine, EnforcementError,
    EnforcementRequest, EvaluationContext, EvaluatorError, PolicyCompiler, PolicyEvaluator,
    PolicyResult,
};
use jkg_graph::{GraphStore, Jurisdiction, Obligation, RiskLevel};
use serde_json::{json, Map, Value};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// -- Stubs ------------------------------------------------------------------

/// Expression is `framework|article`; rejects one framework by name.
struct StubCompiler {
    reject: Option<&'static str>,
}

impl StubCompiler {
    fn accepting() -> Arc<Self> {
        Arc::new(Self { reject: None })
    }

    fn rejecting(framework: &'static str) -> Arc<Self> {
        Arc::new(Self {
            reject: Some(framework),
        })
    }
}

impl PolicyCompiler for StubCompiler {
    fn compile(
        &self,
        _text: &str,
        framework: &str,
        article_ref: &str,
    ) -> Result<CompiledPolicy, CompileError> {
        if self.reject == Some(framework) {
            return Err(CompileError::UnsupportedFramework {
                framework: framework.to_string(),
            });
        }
        Ok(CompiledPolicy {
            expression: format!("{framework}|{article_ref}"),
            risk_level: RiskLevel::Medium,
        })
    }
}

struct Always(PolicyResult);

impl PolicyEvaluator for Always {
    fn evaluate(
        &self,
        _ctx: &EvaluationContext<'_>,
        _expression: &str,
        _input: &Map<String, Value>,
    ) -> Result<PolicyResult, EvaluatorError> {
        Ok(self.0)
    }
}

/// Denies expressions compiled from one framework, permits the rest.
struct DenyFramework(&'static str);

impl PolicyEvaluator for DenyFramework {
    fn evaluate(
        &self,
        _ctx: &EvaluationContext<'_>,
        expression: &str,
        _input: &Map<String, Value>,
    ) -> Result<PolicyResult, EvaluatorError> {
        if expression.starts_with(&format!("{}|", self.0)) {
            Ok(PolicyResult::Deny)
        } else {
            Ok(PolicyResult::Permit)
        }
    }
}

/// Permits when the context flag `kyc_complete` is true; fails when it
/// is absent.
struct KycEvaluator;

impl PolicyEvaluator for KycEvaluator {
    fn evaluate(
        &self,
        _ctx: &EvaluationContext<'_>,
        _expression: &str,
        input: &Map<String, Value>,
    ) -> Result<PolicyResult, EvaluatorError> {
        match input.get("kyc_complete").and_then(Value::as_bool) {
            Some(true) => Ok(PolicyResult::Permit),
            Some(false) => Ok(PolicyResult::Deny),
            None => Err(EvaluatorError::MissingInput {
                field: "kyc_complete".into(),
            }),
        }
    }
}

/// Sleeps past the deadline on its first call.
struct Slow {
    calls: AtomicUsize,
    delay: Duration,
}

impl PolicyEvaluator for Slow {
    fn evaluate(
        &self,
        _ctx: &EvaluationContext<'_>,
        _expression: &str,
        _input: &Map<String, Value>,
    ) -> Result<PolicyResult, EvaluatorError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            thread::sleep(self.delay);
        }
        Ok(PolicyResult::Permit)
    }
}

// -- Fixtures ---------------------------------------------------------------

fn two_region_graph() -> Arc<GraphStore> {
    let graph = GraphStore::new();
    graph.add_jurisdiction(Jurisdiction::new("EU", "European Union")).unwrap();
    graph.add_jurisdiction(Jurisdiction::new("US", "United States")).unwrap();
    graph
        .add_obligation(
            Obligation::new("E1", "EU", "EU-ESMA", "MiCA", RiskLevel::Critical)
                .with_article_ref("Article 59"),
        )
        .unwrap();
    graph
        .add_obligation(
            Obligation::new("E2", "US", "US-FinCEN", "BSA/AML", RiskLevel::Medium)
                .with_article_ref("31 CFR 1022.320"),
        )
        .unwrap();
    Arc::new(graph)
}

fn defaults() -> Arc<GraphStore> {
    Arc::new(GraphStore::with_defaults().unwrap())
}

fn engine(
    graph: Arc<GraphStore>,
    compiler: Arc<dyn PolicyCompiler>,
    evaluator: Option<Arc<dyn PolicyEvaluator>>,
) -> EnforcementEngine {
    EnforcementEngine::new(graph, compiler, evaluator, EnforcementConfig::default())
}

fn request(codes: &[&str]) -> EnforcementRequest {
    EnforcementRequest::new(
        "acme-exchange",
        "CASP",
        codes.iter().map(|c| JurisdictionCode::from(*c)),
    )
}

// -- Aggregation ------------------------------------------------------------

#[test]
fn deny_everywhere_scores_one() {
    init_tracing();
    let e = engine(
        two_region_graph(),
        StubCompiler::accepting(),
        Some(Arc::new(Always(PolicyResult::Deny))),
    );
    let result = e.check(request(&["EU", "US"])).unwrap();

    assert_eq!(result.overall, PolicyResult::Deny);
    assert!((result.risk_score - 1.0).abs() < 1e-12);
    assert_eq!(result.by_obligation.len(), 2);
    assert_eq!(result.by_obligation[0].obligation_id.as_str(), "E1");
    let eu = &result.by_jurisdiction[&JurisdictionCode::from("EU")];
    let us = &result.by_jurisdiction[&JurisdictionCode::from("US")];
    assert_eq!((eu.total_obligations, eu.non_compliant), (1, 1));
    assert_eq!((us.total_obligations, us.non_compliant), (1, 1));
}

#[test]
fn partial_deny_is_weighted_by_risk() {
    let e = engine(
        two_region_graph(),
        StubCompiler::accepting(),
        Some(Arc::new(DenyFramework("BSA/AML"))),
    );
    let result = e.check(request(&["EU", "US"])).unwrap();

    // Only the medium obligation denied: 2 / (4 + 2).
    assert_eq!(result.overall, PolicyResult::Deny);
    assert!((result.risk_score - 1.0 / 3.0).abs() < 1e-12);
    assert_eq!(result.by_jurisdiction[&JurisdictionCode::from("EU")].compliant, 1);
    assert_eq!(result.by_jurisdiction[&JurisdictionCode::from("US")].non_compliant, 1);
}

#[test]
fn context_drives_the_decision() {
    let e = engine(
        two_region_graph(),
        StubCompiler::accepting(),
        Some(Arc::new(KycEvaluator)),
    );
    let permitted = e
        .check(request(&["EU", "US"]).with_context("kyc_complete", json!(true)))
        .unwrap();
    assert_eq!(permitted.overall, PolicyResult::Permit);
    assert_eq!(permitted.risk_score, 0.0);

    let denied = e
        .check(request(&["EU", "US"]).with_context("kyc_complete", json!(false)))
        .unwrap();
    assert_eq!(denied.overall, PolicyResult::Deny);
    assert!((denied.risk_score - 1.0).abs() < 1e-12);
}

#[test]
fn nothing_applicable_permits_without_calling_collaborators() {
    let slow = Arc::new(Slow {
        calls: AtomicUsize::new(0),
        delay: Duration::ZERO,
    });
    let e = engine(
        two_region_graph(),
        StubCompiler::rejecting("MiCA"),
        Some(Arc::clone(&slow) as Arc<dyn PolicyEvaluator>),
    );
    let result = e.check(request(&["SG"])).unwrap();

    assert_eq!(result.overall, PolicyResult::Permit);
    assert!(result.by_obligation.is_empty());
    assert!(result.by_jurisdiction.is_empty());
    assert_eq!(result.risk_score, 0.0);
    assert_eq!(slow.calls.load(Ordering::SeqCst), 0);
    assert_eq!(e.metrics().total_checks, 1);
    assert_eq!(e.metrics().compliant_checks, 1);
}

// -- Fail-closed handling ---------------------------------------------------

#[test]
fn missing_evaluator_never_permits_in_strict_mode() {
    let e = engine(two_region_graph(), StubCompiler::accepting(), None);
    let result = e.check(request(&["EU", "US"])).unwrap();

    assert_eq!(result.overall, PolicyResult::Indeterminate);
    assert_eq!(result.by_obligation.len(), 2);
    for o in &result.by_obligation {
        assert_eq!(o.result, PolicyResult::Indeterminate);
        assert_eq!(o.error_message.as_deref(), Some("no policy evaluator configured"));
    }
    assert_eq!(result.by_jurisdiction[&JurisdictionCode::from("EU")].errors, 1);
    assert_eq!(result.risk_score, 0.0);
}

#[test]
fn lenient_mode_reports_errors_but_permits() {
    let e = EnforcementEngine::new(
        two_region_graph(),
        StubCompiler::accepting(),
        None,
        EnforcementConfig {
            strict_indeterminate: false,
            ..EnforcementConfig::default()
        },
    );
    let result = e.check(request(&["EU"])).unwrap();
    assert_eq!(result.overall, PolicyResult::Permit);
    assert_eq!(result.by_obligation[0].result, PolicyResult::Indeterminate);
    assert_eq!(e.metrics().error_count, 1);
}

#[test]
fn compile_failure_is_scoped_to_its_obligation() {
    let e = engine(
        two_region_graph(),
        StubCompiler::rejecting("MiCA"),
        Some(Arc::new(Always(PolicyResult::Permit))),
    );
    let result = e.check(request(&["EU", "US"])).unwrap();

    let e1 = &result.by_obligation[0];
    assert_eq!(e1.obligation_id.as_str(), "E1");
    assert_eq!(e1.result, PolicyResult::Indeterminate);
    assert_eq!(e1.expression, None);
    assert_eq!(
        e1.error_message.as_deref(),
        Some("compilation error: framework not supported: MiCA")
    );

    let e2 = &result.by_obligation[1];
    assert_eq!(e2.result, PolicyResult::Permit);
    assert_eq!(e2.expression.as_deref(), Some("BSA/AML|31 CFR 1022.320"));

    assert_eq!(result.overall, PolicyResult::Indeterminate);
}

#[test]
fn evaluator_failure_keeps_expression() {
    let e = engine(
        two_region_graph(),
        StubCompiler::accepting(),
        Some(Arc::new(KycEvaluator)),
    );
    let result = e.check(request(&["US"])).unwrap();
    let o = &result.by_obligation[0];
    assert_eq!(o.result, PolicyResult::Indeterminate);
    assert_eq!(o.expression.as_deref(), Some("BSA/AML|31 CFR 1022.320"));
    assert_eq!(
        o.error_message.as_deref(),
        Some("evaluation error: missing input: kyc_complete")
    );
}

#[test]
fn deadline_marks_remaining_obligations_indeterminate() {
    init_tracing();
    let slow = Arc::new(Slow {
        calls: AtomicUsize::new(0),
        delay: Duration::from_millis(40),
    });
    let config = EnforcementConfig::from_yaml_str("evaluation_timeout_ms: 20").unwrap();
    let e = EnforcementEngine::new(
        two_region_graph(),
        StubCompiler::accepting(),
        Some(Arc::clone(&slow) as Arc<dyn PolicyEvaluator>),
        config,
    );
    let result = e.check(request(&["EU", "US"])).unwrap();

    assert_eq!(slow.calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.by_obligation.len(), 2);
    for o in &result.by_obligation {
        assert_eq!(o.result, PolicyResult::Indeterminate);
        assert_eq!(o.error_message.as_deref(), Some("evaluation deadline exceeded"));
    }
    assert!(result.by_obligation[0].expression.is_some());
    assert!(result.by_obligation[1].expression.is_none());
    assert_eq!(result.overall, PolicyResult::Indeterminate);
    assert!(result.evaluation_time >= Duration::from_millis(40));
}

// -- Inheritance and conflicts ----------------------------------------------

#[test]
fn member_state_tallies_under_requested_code() {
    let e = engine(
        defaults(),
        StubCompiler::accepting(),
        Some(Arc::new(Always(PolicyResult::Permit))),
    );
    let result = e.check(request(&["BG"])).unwrap();

    assert_eq!(result.by_obligation.len(), 6);
    assert!(result
        .by_obligation
        .iter()
        .all(|o| o.resolved_via.as_str() == "BG" && o.jurisdiction_code.as_str() == "EU"));
    assert_eq!(result.by_jurisdiction.len(), 1);
    let bg = &result.by_jurisdiction[&JurisdictionCode::from("BG")];
    assert_eq!((bg.total_obligations, bg.compliant), (6, 6));
    assert_eq!(e.metrics().by_jurisdiction[&JurisdictionCode::from("BG")], 6);
}

#[test]
fn declared_conflicts_are_reported() {
    let e = engine(
        defaults(),
        StubCompiler::accepting(),
        Some(Arc::new(Always(PolicyResult::Permit))),
    );

    let both = e.check(request(&["EU", "US"])).unwrap();
    assert_eq!(both.conflicts.len(), 1);
    let c = &both.conflicts[0];
    assert_eq!(c.obligation_a.as_str(), "EU-AMLD6-CDD");
    assert_eq!(c.obligation_b.as_str(), "US-BSA-SAR");
    assert_eq!(c.severity, "medium");
    assert_eq!(c.notes, "Privacy vs reporting requirements");
    assert!(!c.resolution.is_empty());
    assert_eq!(e.metrics().conflicts_detected, 1);

    let eu_only = e.check(request(&["EU"])).unwrap();
    assert!(eu_only.conflicts.is_empty());
}

// -- Requests, refresh, metrics ---------------------------------------------

#[test]
fn blank_jurisdiction_is_rejected() {
    let e = engine(two_region_graph(), StubCompiler::accepting(), None);
    let err = e.check(request(&["EU", ""])).unwrap_err();
    assert!(matches!(err, EnforcementError::InvalidRequest(_)));
}

#[test]
fn framework_filter_is_forwarded() {
    let e = engine(
        defaults(),
        StubCompiler::accepting(),
        Some(Arc::new(Always(PolicyResult::Deny))),
    );
    let result = e
        .check(request(&["EU", "US"]).with_frameworks(["mica"]))
        .unwrap();
    assert_eq!(result.by_obligation.len(), 3);
    assert!(result.by_obligation.iter().all(|o| o.framework == "MiCA"));
    assert_eq!(e.metrics().by_framework["MiCA"], 3);
}

#[test]
fn refresh_applies_to_later_checks() {
    let first = two_region_graph();
    let e = engine(
        Arc::clone(&first),
        StubCompiler::accepting(),
        Some(Arc::new(Always(PolicyResult::Deny))),
    );
    let before = e.check(request(&["EU"])).unwrap();
    assert_eq!(before.overall, PolicyResult::Deny);
    assert_eq!(before.graph_version, first.hash().to_hex());

    let empty = Arc::new(GraphStore::new());
    e.refresh_graph(Arc::clone(&empty));
    let after = e.check(request(&["EU"])).unwrap();
    assert_eq!(after.overall, PolicyResult::Permit);
    assert!(after.by_obligation.is_empty());
    assert_eq!(after.graph_version, empty.hash().to_hex());
    assert_ne!(before.graph_version, after.graph_version);
    assert!(Arc::ptr_eq(&e.graph(), &empty));
}

#[test]
fn metrics_accumulate_across_checks() {
    let e = engine(
        two_region_graph(),
        StubCompiler::accepting(),
        Some(Arc::new(KycEvaluator)),
    );
    e.check(request(&["EU", "US"]).with_context("kyc_complete", json!(true)))
        .unwrap();
    e.check(request(&["EU", "US"]).with_context("kyc_complete", json!(false)))
        .unwrap();
    e.check(request(&["EU"])).unwrap();

    let m = e.metrics();
    assert_eq!(m.total_checks, 3);
    assert_eq!(m.compliant_checks, 1);
    assert_eq!(m.non_compliant_checks, 1);
    assert_eq!(m.indeterminate_checks, 1);
    assert_eq!(m.obligations_evaluated, 5);
    assert_eq!(m.error_count, 1);
    assert_eq!(m.by_jurisdiction[&JurisdictionCode::from("EU")], 3);
    assert_eq!(m.by_jurisdiction[&JurisdictionCode::from("US")], 2);
}

#[test]
fn result_serializes_with_wire_names() {
    let e = engine(
        two_region_graph(),
        StubCompiler::accepting(),
        Some(Arc::new(Always(PolicyResult::Deny))),
    );
    let result = e.check(request(&["EU"]).with_request_id("audit-7")).unwrap();
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["request_id"], "audit-7");
    assert_eq!(value["overall"], "DENY");
    assert_eq!(value["by_obligation"][0]["risk_level"], "CRITICAL");
}
