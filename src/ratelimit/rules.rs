//! Constraint definitions and their YAML configuration format.
//!
//! A limiter is configured with a list of rules, each capping the number of
//! admissions within a rolling interval:
//!
//! ```yaml
//! constraints:
//!   - interval_ms: 1000
//!     limit: 2
//!   - interval_ms: 5000
//!     limit: 5
//!     name: burst
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{Result, TandemError};

/// A single `(interval, limit)` rate rule.
///
/// `limit` is signed so that configurations can be validated rather than
/// silently clamped; limiter construction rejects negative values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Constraint {
    /// Length of the rolling window
    pub interval: Duration,
    /// Maximum admissions within any window of `interval`
    pub limit: i64,
}

impl Constraint {
    /// Create a new constraint.
    pub fn new(interval: Duration, limit: i64) -> Self {
        Self { interval, limit }
    }

    /// Convenience constructor for whole-second intervals.
    ///
    /// Arguments follow [`Constraint::new`]: interval first, then limit.
    pub fn per_secs(secs: u64, limit: i64) -> Self {
        Self::new(Duration::from_secs(secs), limit)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} per {}ms", self.limit, self.interval.as_millis())
    }
}

impl From<(Duration, i64)> for Constraint {
    fn from((interval, limit): (Duration, i64)) -> Self {
        Self::new(interval, limit)
    }
}

/// Serialized form of a [`Constraint`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintRule {
    /// Window length in milliseconds
    pub interval_ms: u64,
    /// Admissions allowed per window
    pub limit: i64,
    /// Optional name/description for this rule
    #[serde(default)]
    pub name: Option<String>,
}

impl From<&ConstraintRule> for Constraint {
    fn from(rule: &ConstraintRule) -> Self {
        Constraint::new(Duration::from_millis(rule.interval_ms), rule.limit)
    }
}

impl From<Constraint> for ConstraintRule {
    fn from(constraint: Constraint) -> Self {
        Self {
            interval_ms: constraint.interval.as_millis() as u64,
            limit: constraint.limit,
            name: None,
        }
    }
}

/// The set of rules for one limiter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Rules enforced simultaneously
    #[serde(default)]
    pub constraints: Vec<ConstraintRule>,
}

impl LimiterConfig {
    /// Create a configuration from constraints.
    pub fn new<I, C>(constraints: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Constraint>,
    {
        Self {
            constraints: constraints
                .into_iter()
                .map(|c| ConstraintRule::from(c.into()))
                .collect(),
        }
    }

    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading limiter configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| TandemError::Config(format!("Failed to parse limiter config: {}", e)))
    }

    /// The rules as constraints, in declaration order.
    pub fn to_constraints(&self) -> Vec<Constraint> {
        self.constraints.iter().map(Constraint::from).collect()
    }
}
