//! Configuration management for the Tandem demo driver.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ratelimit::{Constraint, LimiterConfig};

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TandemConfig {
    /// Limiter constraints
    #[serde(default = "default_limiter")]
    pub limiter: LimiterConfig,

    /// Demo driver settings
    #[serde(default)]
    pub demo: DemoConfig,
}

impl Default for TandemConfig {
    fn default() -> Self {
        Self {
            limiter: default_limiter(),
            demo: DemoConfig::default(),
        }
    }
}

/// Settings for the demo loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Total acquisitions to perform
    #[serde(default = "default_iterations")]
    pub iterations: usize,

    /// Concurrent tasks sharing the acquisitions
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            workers: default_workers(),
        }
    }
}

/// Two per second and five per five seconds.
fn default_limiter() -> LimiterConfig {
    LimiterConfig::new([
        Constraint::new(Duration::from_secs(1), 2),
        Constraint::new(Duration::from_secs(5), 5),
    ])
}

fn default_iterations() -> usize {
    100
}

fn default_workers() -> usize {
    1
}

impl TandemConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: &str) -> crate::error::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| crate::error::TandemError::Config(e.to_string()))
    }
}
