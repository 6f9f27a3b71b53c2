//! # jkg-enforcement: Compliance Enforcement
//!
//! Orchestrates one compliance check: resolve the obligations that apply
//! to an entity through [`jkg_graph::ApplicabilityQuery`], compile each
//! into a policy expression, evaluate it against the request context
//! under a single deadline, and aggregate an auditable
//! [`EnforcementResult`].
//!
//! Compilation and evaluation are external contracts
//! ([`PolicyCompiler`], [`PolicyEvaluator`]). Any failure in them is
//! recorded as `Indeterminate` for that obligation, and an
//! `Indeterminate` obligation never lets a check pass silently.

pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod result;

pub use config::EnforcementConfig;
pub use engine::EnforcementEngine;
pub use error::EnforcementError;
pub use metrics::EnforcementMetrics;
pub use policy::{
    CompileError, CompiledPolicy, EvaluationContext, EvaluatorError, PolicyCompiler,
    PolicyEvaluator, PolicyResult,
};
pub use result::{
    overall_result, risk_score, ConflictResult, EnforcementRequest, EnforcementResult,
    JurisdictionResult, ObligationResult,
};
