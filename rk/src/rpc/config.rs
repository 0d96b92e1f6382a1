//! RPC transport configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Limits applied to every inter-node call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Deadline for each of connect, write and read, in milliseconds
    ///
    /// Must cover a whole voting round plus replication, since a client's
    /// gated write waits for both.
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Largest accepted JSON line, in bytes
    #[serde(rename = "max-message-bytes")]
    pub max_message_bytes: usize,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_message_bytes: 64 * 1024,
        }
    }
}

impl RpcConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_outlast_a_voting_round() {
        let rpc = RpcConfig::default();
        let coordinator = crate::coordinator::CoordinatorConfig::default();
        let participant = crate::participant::ParticipantConfig::default();

        // revote (prepare + broadcast) then replication fan-out
        let worst = coordinator.call_timeout() * 2 + participant.replication_timeout();
        assert!(rpc.timeout() > worst);
    }

    #[test]
    fn test_partial_yaml() {
        let config: RpcConfig = serde_yaml::from_str("max-message-bytes: 128").unwrap();
        assert_eq!(config.max_message_bytes, 128);
        assert_eq!(config.timeout_ms, 10_000);
    }
}
