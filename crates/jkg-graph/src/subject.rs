//! # Subject Criteria
//!
//! A tiny predicate language over the regulated entity's type, carried by
//! every obligation in `subject_criteria`:
//!
//! | Expression               | Meaning                        |
//! |--------------------------|--------------------------------|
//! | `""`, `*`, `true`        | applies to every entity type   |
//! | `type == "CASP"`         | exact match                    |
//! | `type != "BANK"`         | anything but                   |
//! | `type in ["CASP","EMI"]` | set membership                 |
//!
//! Anything else is unrecognized and applies to every entity type. The
//! store logs such obligations at `debug` when they are resolved.

/// Parsed subject-matching expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectCriteria {
    /// Matches every entity type.
    Any,
    /// Matches exactly this entity type.
    Equals(String),
    /// Matches every entity type except this one.
    NotEquals(String),
    /// Matches any of these entity types.
    OneOf(Vec<String>),
    /// Could not be parsed; matches every entity type.
    Unrecognized(String),
}

impl SubjectCriteria {
    /// Parse an expression. Never fails; see [`SubjectCriteria::Unrecognized`].
    pub fn parse(expr: &str) -> Self {
        let expr = expr.trim();
        if expr.is_empty() || expr == "*" || expr == "true" {
            return Self::Any;
        }
        if let Some(rest) = expr.strip_prefix("type == ") {
            return Self::Equals(unquote(rest).to_string());
        }
        if let Some(rest) = expr.strip_prefix("type != ") {
            return Self::NotEquals(unquote(rest).to_string());
        }
        if let Some(rest) = expr.strip_prefix("type in ") {
            let set = rest.trim_matches(|c| c == '[' || c == ']' || c == ' ');
            let members = set
                .split(',')
                .map(|m| unquote(m).to_string())
                .filter(|m| !m.is_empty())
                .collect();
            return Self::OneOf(members);
        }
        Self::Unrecognized(expr.to_string())
    }

    /// Evaluate against an entity type.
    pub fn matches(&self, entity_type: &str) -> bool {
        match self {
            Self::Any | Self::Unrecognized(_) => true,
            Self::Equals(t) => entity_type == t,
            Self::NotEquals(t) => entity_type != t,
            Self::OneOf(set) => set.iter().any(|t| t == entity_type),
        }
    }

    /// False for [`SubjectCriteria::Unrecognized`].
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

fn unquote(s: &str) -> &str {
    s.trim().trim_matches('"')
}
