//! Coordinator configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// How votes are collected during `prepare_transaction`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VotingStrategy {
    /// All prepares in flight at once; the first NACK to arrive decides
    #[default]
    Concurrent,
    /// Registration order; participants after the first NACK are not asked
    Sequential,
}

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Deadline for each prepare/commit/abort call in milliseconds
    #[serde(rename = "call-timeout-ms", default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    /// Vote collection strategy
    #[serde(default)]
    pub voting: VotingStrategy,
}

fn default_call_timeout_ms() -> u64 {
    debug!("default_call_timeout_ms: called");
    2_000
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        debug!("CoordinatorConfig::default: called");
        Self {
            call_timeout_ms: default_call_timeout_ms(),
            voting: VotingStrategy::default(),
        }
    }
}

impl CoordinatorConfig {
    /// Get the per-call timeout as a Duration
    pub fn call_timeout(&self) -> Duration {
        debug!(call_timeout_ms = %self.call_timeout_ms, "CoordinatorConfig::call_timeout: called");
        Duration::from_millis(self.call_timeout_ms)
    }
}
