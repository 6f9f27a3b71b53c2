//! # Engine Configuration
//!
//! ```yaml
//! evaluation_timeout_ms: 5000
//! strict_indeterminate: true
//! ```
//!
//! Every field has a default, so an empty document is a valid config.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EnforcementError;

/// Default whole-loop evaluation deadline.
pub const DEFAULT_EVALUATION_TIMEOUT_MS: u64 = 5_000;

/// Enforcement engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnforcementConfig {
    /// Deadline for evaluating all obligations of one check, in
    /// milliseconds.
    pub evaluation_timeout_ms: u64,
    /// When true, an `Indeterminate` obligation without any `Deny` makes
    /// the overall result `Indeterminate` instead of `Permit`.
    pub strict_indeterminate: bool,
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        Self {
            evaluation_timeout_ms: DEFAULT_EVALUATION_TIMEOUT_MS,
            strict_indeterminate: true,
        }
    }
}

impl EnforcementConfig {
    /// The evaluation deadline as a `Duration`.
    pub fn evaluation_timeout(&self) -> Duration {
        Duration::from_millis(self.evaluation_timeout_ms)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml_str(s: &str) -> Result<Self, EnforcementError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, EnforcementError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| EnforcementError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Reject values that would make every check time out.
    pub fn validate(&self) -> Result<(), EnforcementError> {
        if self.evaluation_timeout_ms == 0 {
            return Err(EnforcementError::Config(
                "evaluation_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
