//! Client-side transaction driver

use std::fmt;
use std::sync::Arc;

use rand::Rng;
use tracing::{debug, info, warn};

use super::command::ClientCommand;
use crate::config::Config;
use crate::error::KvResult;
use crate::rpc::{RemoteCoordinator, RemoteParticipant};
use crate::service::{CoordinatorService, ParticipantService};
use crate::txn::{Decision, GetOutcome, OpKind, Txn, TxnId};

/// Result of one client operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Put { key: String, inserted: bool },
    Get { key: String, outcome: GetOutcome },
    Delete { key: String, deleted: bool },
}

impl Reply {
    /// Whether the operation had its intended effect
    pub fn succeeded(&self) -> bool {
        match self {
            Reply::Put { inserted, .. } => *inserted,
            Reply::Get { outcome, .. } => matches!(outcome, GetOutcome::Found(_)),
            Reply::Delete { deleted, .. } => *deleted,
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Put { key, inserted: true } => write!(f, "PUT {}: Insertion Successful", key),
            Reply::Put { key, inserted: false } => write!(f, "PUT {}: Insertion Unsuccessful", key),
            Reply::Get {
                key,
                outcome: GetOutcome::Found(value),
            } => write!(f, "GET {}: {}", key, value),
            Reply::Get {
                key,
                outcome: GetOutcome::NotFound,
            } => write!(f, "GET {}: Key not found", key),
            Reply::Get {
                key,
                outcome: GetOutcome::Aborted,
            } => write!(f, "GET {}: Get operation is aborted", key),
            Reply::Delete { key, deleted: true } => write!(f, "DELETE {}: Deletion Successful", key),
            Reply::Delete { key, deleted: false } => write!(f, "DELETE {}: Key not found to delete", key),
        }
    }
}

/// Issues operations against one primary participant
pub struct KvClient {
    coordinator: Arc<dyn CoordinatorService>,
    primary: Arc<dyn ParticipantService>,
    client_id: String,
}

impl KvClient {
    pub fn new(
        coordinator: Arc<dyn CoordinatorService>,
        primary: Arc<dyn ParticipantService>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            coordinator,
            primary,
            client_id: client_id.into(),
        }
    }

    /// Build a client reaching the cluster over TCP
    ///
    /// The primary is `config.client.primary` when set, otherwise picked at random.
    pub fn connect(config: &Config) -> eyre::Result<Self> {
        let participants = &config.cluster.participants;
        if participants.is_empty() {
            return Err(eyre::eyre!("No participants configured"));
        }

        let index = match config.client.primary {
            Some(index) if index < participants.len() => index,
            Some(index) => {
                return Err(eyre::eyre!(
                    "Primary index {} out of range (0..{})",
                    index,
                    participants.len()
                ));
            }
            None => rand::rng().random_range(0..participants.len()),
        };

        let primary = &participants[index];
        info!(client_id = %config.client.client_id, %primary, "Client connected to primary");

        Ok(Self::new(
            Arc::new(RemoteCoordinator::new(&config.cluster.coordinator, &config.rpc)),
            Arc::new(RemoteParticipant::new(primary, &config.rpc)),
            config.client.client_id.clone(),
        ))
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Endpoint of the primary participant
    pub fn primary(&self) -> &str {
        self.primary.node_id()
    }

    /// Register intent on the primary and run the voting round
    ///
    /// The gated operation is issued regardless of the decision; the primary
    /// refuses it when the round aborted.
    async fn begin(&self, key: &str, kind: OpKind) -> KvResult<TxnId> {
        let id = TxnId::generate();
        self.primary.request_txn(&id, kind == OpKind::Delete).await?;

        let decision = self
            .coordinator
            .prepare_transaction(&Txn::new(id.clone(), key, kind))
            .await?;
        match decision {
            Decision::Commit => debug!(txn_id = %id, %key, ?kind, "begin: committed"),
            Decision::Abort => info!(txn_id = %id, %key, ?kind, "Transaction aborted"),
        }
        Ok(id)
    }

    pub async fn put(&self, key: &str, value: &str) -> KvResult<bool> {
        let id = self.begin(key, OpKind::Write).await?;
        let inserted = self.primary.put_value(key, value, &id, &self.client_id).await?;
        info!(%key, %value, txn_id = %id, inserted, "PUT");
        Ok(inserted)
    }

    pub async fn get(&self, key: &str) -> KvResult<GetOutcome> {
        let id = self.begin(key, OpKind::Read).await?;
        let outcome = self.primary.get_value(key, &id, &self.client_id).await?;
        info!(%key, txn_id = %id, value = %outcome.as_sentinel(), "GET");
        Ok(outcome)
    }

    pub async fn delete(&self, key: &str) -> KvResult<bool> {
        let id = self.begin(key, OpKind::Delete).await?;
        let deleted = self.primary.delete_value(key, &id, &self.client_id).await?;
        info!(%key, txn_id = %id, deleted, "DELETE");
        Ok(deleted)
    }

    /// Run one parsed command; `None` for `quit`
    pub async fn execute(&self, command: &ClientCommand) -> Option<KvResult<Reply>> {
        debug!(%command, "execute: called");
        let reply = match command {
            ClientCommand::Put { key, value } => self.put(key, value).await.map(|inserted| Reply::Put {
                key: key.clone(),
                inserted,
            }),
            ClientCommand::Get { key } => self.get(key).await.map(|outcome| Reply::Get {
                key: key.clone(),
                outcome,
            }),
            ClientCommand::Delete { key } => self.delete(key).await.map(|deleted| Reply::Delete {
                key: key.clone(),
                deleted,
            }),
            ClientCommand::Quit => return None,
        };
        if let Err(e) = &reply {
            warn!(%command, error = %e, "Request failed");
        }
        Some(reply)
    }

    /// Insert `key1..key10` with values `1..10`
    pub async fn populate(&self) -> Vec<KvResult<Reply>> {
        info!("Initializing the key-value store with 10 pairs");
        let mut replies = Vec::new();
        for i in 1..=10 {
            let command = ClientCommand::Put {
                key: format!("key{}", i),
                value: i.to_string(),
            };
            if let Some(reply) = self.execute(&command).await {
                replies.push(reply);
            }
        }
        info!("Initialization done");
        replies
    }

    /// PUT, GET, DELETE each of `key11..key15` in turn
    pub async fn perform_operations(&self) -> Vec<KvResult<Reply>> {
        info!("Performing 5 PUT/GET/DELETE operations");
        let mut replies = Vec::new();
        for i in 11..=15 {
            let key = format!("key{}", i);
            let commands = [
                ClientCommand::Put {
                    key: key.clone(),
                    value: i.to_string(),
                },
                ClientCommand::Get { key: key.clone() },
                ClientCommand::Delete { key },
            ];
            for command in &commands {
                if let Some(reply) = self.execute(command).await {
                    replies.push(reply);
                }
            }
        }
        replies
    }
}
