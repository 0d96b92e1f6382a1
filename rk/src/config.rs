//! replikv configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::coordinator::CoordinatorConfig;
use crate::participant::ParticipantConfig;
use crate::rpc::RpcConfig;

/// Main replikv configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Static membership and replication
    pub cluster: ClusterConfig,

    /// Transport limits
    pub rpc: RpcConfig,

    /// Voting behaviour
    pub coordinator: CoordinatorConfig,

    /// Participant-side transaction handling
    pub participant: ParticipantConfig,

    /// Interactive client settings
    pub client: ClientConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

/// Only the log level, so it can be read before logging is set up
#[derive(Debug, Default, Deserialize)]
struct LogLevelOnly {
    #[serde(rename = "log-level")]
    log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        if self.cluster.participants.is_empty() {
            return Err(eyre::eyre!("cluster.participants must list at least one endpoint"));
        }
        if let Some(index) = self.client.primary
            && index >= self.cluster.participants.len()
        {
            return Err(eyre::eyre!(
                "client.primary is {} but only {} participants are configured",
                index,
                self.cluster.participants.len()
            ));
        }
        if self.rpc.max_message_bytes == 0 {
            return Err(eyre::eyre!("rpc.max-message-bytes must be greater than zero"));
        }
        for (name, value) in [
            ("rpc.timeout-ms", self.rpc.timeout_ms),
            ("coordinator.call-timeout-ms", self.coordinator.call_timeout_ms),
            ("participant.replication-timeout-ms", self.participant.replication_timeout_ms),
            ("participant.txn-ttl-ms", self.participant.txn_ttl_ms),
        ] {
            if value == 0 {
                return Err(eyre::eyre!("{} must be greater than zero", name));
            }
        }

        let round = self.worst_case_round();
        if self.rpc.timeout() <= round {
            return Err(eyre::eyre!(
                "rpc.timeout-ms is {} but a gated operation can take up to {} ms; raise rpc.timeout-ms or lower the coordinator and participant timeouts",
                self.rpc.timeout_ms,
                round.as_millis()
            ));
        }
        Ok(())
    }

    /// Longest a client can wait on one gated operation
    ///
    /// A voting round is a prepare and a broadcast, each bounded by the call
    /// timeout. With replication on, the primary follows it with replication.
    pub fn worst_case_round(&self) -> Duration {
        let round = self.coordinator.call_timeout() * 2;
        if self.cluster.replication {
            round + self.participant.replication_timeout()
        } else {
            round
        }
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::candidates() {
            if candidate.exists() {
                match Self::load_from_file(&candidate) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", candidate.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read just `log-level` from the first config file found
    ///
    /// Errors are swallowed; logging is not initialized yet when this runs.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let paths: Vec<PathBuf> = match config_path {
            Some(path) => vec![path.clone()],
            None => Self::candidates(),
        };

        paths
            .iter()
            .filter(|path| path.exists())
            .find_map(|path| {
                let content = fs::read_to_string(path).ok()?;
                serde_yaml::from_str::<LogLevelOnly>(&content).ok()
            })
            .and_then(|only| only.log_level)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;
        fs::write(path, content).context(format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }

    /// Project-local `./replikv.yml`, then `~/.config/replikv/replikv.yml`
    fn candidates() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("replikv.yml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("replikv").join("replikv.yml"));
        }
        paths
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Static cluster membership
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Coordinator listen address
    pub coordinator: String,

    /// Participant listen addresses, in registration order
    pub participants: Vec<String>,

    /// Replicate accepted writes to every other participant
    pub replication: bool,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            coordinator: default_coordinator_endpoint(),
            participants: default_participant_endpoints(),
            replication: true,
        }
    }
}

fn default_coordinator_endpoint() -> String {
    debug!("default_coordinator_endpoint: called");
    "127.0.0.1:1099".to_string()
}

fn default_participant_endpoints() -> Vec<String> {
    debug!("default_participant_endpoints: called");
    (5001..=5005).map(|port| format!("127.0.0.1:{}", port)).collect()
}

/// Interactive client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Identifier stamped on every request and used for the log file name
    #[serde(rename = "client-id")]
    pub client_id: String,

    /// Index into `cluster.participants` of the primary; random when unset
    pub primary: Option<usize>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_id: "1".to_string(),
            primary: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::VotingStrategy;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.cluster.coordinator, "127.0.0.1:1099");
        assert_eq!(config.cluster.participants.len(), 5);
        assert_eq!(config.cluster.participants[0], "127.0.0.1:5001");
        assert_eq!(config.cluster.participants[4], "127.0.0.1:5005");
        assert!(config.cluster.replication);
        assert_eq!(config.client.client_id, "1");
        assert!(config.client.primary.is_none());
        assert!(config.log_level.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
cluster:
  coordinator: 10.0.0.1:2000
  participants:
    - 10.0.0.2:3000
    - 10.0.0.3:3000
  replication: false

rpc:
  timeout-ms: 5000
  max-message-bytes: 4096

coordinator:
  call-timeout-ms: 750
  voting: sequential

participant:
  txn-ttl-ms: 1000

client:
  client-id: "7"
  primary: 1

log-level: debug
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.cluster.coordinator, "10.0.0.1:2000");
        assert_eq!(config.cluster.participants, vec!["10.0.0.2:3000", "10.0.0.3:3000"]);
        assert!(!config.cluster.replication);
        assert_eq!(config.rpc.timeout_ms, 5000);
        assert_eq!(config.rpc.max_message_bytes, 4096);
        assert_eq!(config.coordinator.call_timeout_ms, 750);
        assert_eq!(config.coordinator.voting, VotingStrategy::Sequential);
        assert_eq!(config.participant.txn_ttl_ms, 1000);
        assert_eq!(config.client.client_id, "7");
        assert_eq!(config.client.primary, Some(1));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
rpc:
  timeout-ms: 100
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.rpc.timeout_ms, 100);
        assert_eq!(config.rpc.max_message_bytes, RpcConfig::default().max_message_bytes);
        assert_eq!(config.cluster.participants.len(), 5);
    }

    #[test]
    fn test_validate_rejects_out_of_range_primary() {
        let mut config = Config::default();
        config.client.primary = Some(5);
        assert!(config.validate().is_err());

        config.client.primary = Some(4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_rpc_timeout_shorter_than_round() {
        let mut config = Config::default();
        config.coordinator.call_timeout_ms = 5_000;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("rpc.timeout-ms"), "{}", err);

        // Without replication the primary skips the fan-out
        config.coordinator.call_timeout_ms = 4_000;
        assert!(config.validate().is_err());
        config.cluster.replication = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_timeouts() {
        let mut config = Config::default();
        config.participant.replication_timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("participant.replication-timeout-ms"), "{}", err);

        let mut config = Config::default();
        config.rpc.timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.participant.txn_ttl_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_membership() {
        let mut config = Config::default();
        config.cluster.participants.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("replikv.yml");
        fs::write(&path, "cluster:\n  coordinator: 127.0.0.1:9999\nlog-level: warn\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.cluster.coordinator, "127.0.0.1:9999");

        assert_eq!(Config::load_log_level(Some(&path)).as_deref(), Some("warn"));
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("absent.yml");
        assert!(Config::load(Some(&path)).is_err());
        assert!(Config::load_log_level(Some(&path)).is_none());
    }

    #[test]
    fn test_load_malformed_file_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.yml");
        fs::write(&path, "cluster: [not, a, map\n").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("saved.yml");

        let mut config = Config::default();
        config.client.client_id = "42".to_string();
        config.save(&path).unwrap();

        let reloaded = Config::load(Some(&path)).unwrap();
        assert_eq!(reloaded.client.client_id, "42");
        assert_eq!(reloaded.cluster.participants, config.cluster.participants);
    }
}
