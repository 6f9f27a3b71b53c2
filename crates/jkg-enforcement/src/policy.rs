//! # Policy Contracts
//!
//! The two external collaborators of the engine:
//!
//! - [`PolicyCompiler`] turns an obligation's legal text into a policy
//!   expression. It must be deterministic: the same text, framework and
//!   article always yield the same expression, since that expression is
//!   recorded in the audit trail.
//! - [`PolicyEvaluator`] evaluates an expression against the request's
//!   context map and returns a [`PolicyResult`].
//!
//! Both are synchronous and shared across threads. Neither grammar nor
//! evaluation semantics are defined here.

use std::fmt;
use std::time::{Duration, Instant};

use jkg_core::ObligationId;
use jkg_graph::RiskLevel;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Outcome of evaluating one policy, and of a whole check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyResult {
    /// Compliant.
    Permit,
    /// Non-compliant.
    Deny,
    /// Could not be determined (compile or evaluation failure, missing
    /// evaluator, deadline).
    Indeterminate,
    /// The rule does not apply to this entity.
    NotApplicable,
}

impl PolicyResult {
    /// Wire name of the result.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Permit => "PERMIT",
            Self::Deny => "DENY",
            Self::Indeterminate => "INDETERMINATE",
            Self::NotApplicable => "NOT_APPLICABLE",
        }
    }
}

impl fmt::Display for PolicyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compiled policy expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledPolicy {
    /// Boolean predicate over the request context.
    pub expression: String,
    /// Risk the compiler assigned to the text.
    pub risk_level: RiskLevel,
}

/// Compiler failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// No expression could be derived from the text.
    #[error("no policy expression derivable from text: {reason}")]
    Unparseable {
        /// Why the text was rejected.
        reason: String,
    },
    /// The framework is not supported by this compiler.
    #[error("framework not supported: {framework}")]
    UnsupportedFramework {
        /// The framework name.
        framework: String,
    },
}

/// Evaluator failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluatorError {
    /// The expression is malformed for this evaluator.
    #[error("invalid expression: {reason}")]
    InvalidExpression {
        /// Parser diagnostics.
        reason: String,
    },
    /// The context map lacks required input.
    #[error("missing input: {field}")]
    MissingInput {
        /// The missing key.
        field: String,
    },
    /// The evaluator gave up at the deadline.
    #[error("deadline exceeded")]
    DeadlineExceeded,
    /// The evaluator backend is unavailable.
    #[error("evaluator unavailable: {reason}")]
    Unavailable {
        /// Backend diagnostics.
        reason: String,
    },
}

/// Turns legal text into a policy expression.
pub trait PolicyCompiler: Send + Sync {
    /// Compile `text` from `framework` / `article_ref`.
    fn compile(
        &self,
        text: &str,
        framework: &str,
        article_ref: &str,
    ) -> Result<CompiledPolicy, CompileError>;
}

/// Per-call information handed to the evaluator.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    /// The check's request id.
    pub request_id: &'a str,
    /// The entity being checked.
    pub entity_id: &'a str,
    /// The obligation the expression was compiled from.
    pub obligation_id: &'a ObligationId,
    /// Absolute deadline of the whole check.
    pub deadline: Instant,
}

impl EvaluationContext<'_> {
    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// True once the deadline has passed.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

/// Evaluates compiled expressions.
pub trait PolicyEvaluator: Send + Sync {
    /// Evaluate `expression` against `input`. Long-running evaluators
    /// should watch `ctx.deadline` and return
    /// [`EvaluatorError::DeadlineExceeded`] rather than overrun it.
    fn evaluate(
        &self,
        ctx: &EvaluationContext<'_>,
        expression: &str,
        input: &Map<String, Value>,
    ) -> Result<PolicyResult, EvaluatorError>;
}
