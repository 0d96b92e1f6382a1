//! Participant configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Participant configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticipantConfig {
    /// Transaction contexts untouched for this long are discarded
    #[serde(rename = "txn-ttl-ms")]
    pub txn_ttl_ms: u64,

    /// Deadline for each replication call to a peer
    #[serde(rename = "replication-timeout-ms")]
    pub replication_timeout_ms: u64,
}

impl Default for ParticipantConfig {
    fn default() -> Self {
        Self {
            txn_ttl_ms: 60_000,
            replication_timeout_ms: 2_000,
        }
    }
}

impl ParticipantConfig {
    pub fn txn_ttl(&self) -> Duration {
        Duration::from_millis(self.txn_ttl_ms)
    }

    pub fn replication_timeout(&self) -> Duration {
        Duration::from_millis(self.replication_timeout_ms)
    }
}
