//! Remote service stubs
//!
//! [`RemoteParticipant`] and [`RemoteCoordinator`] implement the service traits
//! by forwarding every call over TCP, so protocol code is unaware whether a
//! peer lives in-process or on another host.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::net::TcpStream;
use tracing::debug;

use super::codec::{read_frame, write_frame};
use super::config::RpcConfig;
use super::messages::{CoordinatorMessage, ParticipantMessage, Response};
use crate::coordinator::CoordinatorMetrics;
use crate::error::{KvError, KvResult, with_timeout};
use crate::service::{CoordinatorService, ParticipantService};
use crate::txn::{Decision, GetOutcome, Txn, TxnId, Vote};

/// One-shot request/response client for a single endpoint
#[derive(Debug, Clone)]
pub struct RpcClient {
    endpoint: String,
    timeout: Duration,
    max_message_bytes: usize,
}

impl RpcClient {
    pub fn new(endpoint: impl Into<String>, config: &RpcConfig) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: config.timeout(),
            max_message_bytes: config.max_message_bytes,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send a message and wait for the response
    ///
    /// Connect, write and read are each bounded by the configured timeout.
    pub async fn call<M: Serialize + Debug + Sync>(&self, message: &M) -> KvResult<Response> {
        debug!(endpoint = %self.endpoint, ?message, "RpcClient::call: sending");

        let mut stream = with_timeout(&self.endpoint, self.timeout, async {
            TcpStream::connect(&self.endpoint)
                .await
                .map_err(|e| KvError::io(&self.endpoint, e))
        })
        .await?;

        with_timeout(
            &self.endpoint,
            self.timeout,
            write_frame(&mut stream, message, self.max_message_bytes, &self.endpoint),
        )
        .await?;

        let response: Response = with_timeout(
            &self.endpoint,
            self.timeout,
            read_frame(&mut stream, self.max_message_bytes, &self.endpoint),
        )
        .await?;

        debug!(endpoint = %self.endpoint, ?response, "RpcClient::call: received");
        match response {
            Response::Error { message } => Err(KvError::Remote {
                endpoint: self.endpoint.clone(),
                message,
            }),
            other => Ok(other),
        }
    }

    fn unexpected(&self, response: Response) -> KvError {
        KvError::UnexpectedResponse {
            endpoint: self.endpoint.clone(),
            response: format!("{:?}", response),
        }
    }

    async fn call_ok<M: Serialize + Debug + Sync>(&self, message: &M) -> KvResult<()> {
        match self.call(message).await? {
            Response::Ok => Ok(()),
            other => Err(self.unexpected(other)),
        }
    }

    async fn call_vote<M: Serialize + Debug + Sync>(&self, message: &M) -> KvResult<Vote> {
        match self.call(message).await? {
            Response::Vote { vote } => Ok(vote),
            other => Err(self.unexpected(other)),
        }
    }

    async fn call_applied<M: Serialize + Debug + Sync>(&self, message: &M) -> KvResult<bool> {
        match self.call(message).await? {
            Response::Applied { applied } => Ok(applied),
            other => Err(self.unexpected(other)),
        }
    }

    async fn call_pong<M: Serialize + Debug + Sync>(&self, message: &M) -> KvResult<String> {
        match self.call(message).await? {
            Response::Pong { version } => Ok(version),
            other => Err(self.unexpected(other)),
        }
    }
}

/// Participant reached over the network
#[derive(Debug, Clone)]
pub struct RemoteParticipant {
    client: RpcClient,
}

impl RemoteParticipant {
    pub fn new(endpoint: impl Into<String>, config: &RpcConfig) -> Self {
        Self {
            client: RpcClient::new(endpoint, config),
        }
    }
}

#[async_trait]
impl ParticipantService for RemoteParticipant {
    fn node_id(&self) -> &str {
        self.client.endpoint()
    }

    async fn request_txn(&self, txn_id: &TxnId, is_delete: bool) -> KvResult<()> {
        self.client
            .call_ok(&ParticipantMessage::RequestTxn {
                txn_id: txn_id.clone(),
                is_delete,
            })
            .await
    }

    async fn prepare(&self, txn: &Txn) -> KvResult<Vote> {
        self.client.call_vote(&ParticipantMessage::Prepare { txn: txn.clone() }).await
    }

    async fn commit(&self, txn_id: &TxnId) -> KvResult<()> {
        self.client
            .call_ok(&ParticipantMessage::Commit { txn_id: txn_id.clone() })
            .await
    }

    async fn abort(&self, txn_id: &TxnId) -> KvResult<()> {
        self.client
            .call_ok(&ParticipantMessage::Abort { txn_id: txn_id.clone() })
            .await
    }

    async fn get_value(&self, key: &str, request_id: &TxnId, client_id: &str) -> KvResult<GetOutcome> {
        let message = ParticipantMessage::GetValue {
            key: key.to_string(),
            request_id: request_id.clone(),
            client_id: client_id.to_string(),
        };
        match self.client.call(&message).await? {
            Response::Value { outcome } => Ok(outcome),
            other => Err(self.client.unexpected(other)),
        }
    }

    async fn put_value(&self, key: &str, value: &str, request_id: &TxnId, client_id: &str) -> KvResult<bool> {
        self.client
            .call_applied(&ParticipantMessage::PutValue {
                key: key.to_string(),
                value: value.to_string(),
                request_id: request_id.clone(),
                client_id: client_id.to_string(),
            })
            .await
    }

    async fn delete_value(&self, key: &str, request_id: &TxnId, client_id: &str) -> KvResult<bool> {
        self.client
            .call_applied(&ParticipantMessage::DeleteValue {
                key: key.to_string(),
                request_id: request_id.clone(),
                client_id: client_id.to_string(),
            })
            .await
    }

    async fn apply_put(&self, key: &str, value: &str) -> KvResult<Vote> {
        self.client
            .call_vote(&ParticipantMessage::ApplyPut {
                key: key.to_string(),
                value: value.to_string(),
            })
            .await
    }

    async fn apply_delete(&self, key: &str) -> KvResult<Vote> {
        self.client
            .call_vote(&ParticipantMessage::ApplyDelete { key: key.to_string() })
            .await
    }

    async fn set_coordinator(&self, coordinator: Arc<dyn CoordinatorService>) -> KvResult<()> {
        self.client
            .call_ok(&ParticipantMessage::SetCoordinator {
                endpoint: coordinator.endpoint().to_string(),
            })
            .await
    }

    async fn enable_replication(&self) -> KvResult<()> {
        self.client.call_ok(&ParticipantMessage::EnableReplication).await
    }

    async fn ping(&self) -> KvResult<String> {
        self.client.call_pong(&ParticipantMessage::Ping).await
    }
}

/// Coordinator reached over the network
#[derive(Debug, Clone)]
pub struct RemoteCoordinator {
    client: RpcClient,
    config: RpcConfig,
}

impl RemoteCoordinator {
    pub fn new(endpoint: impl Into<String>, config: &RpcConfig) -> Self {
        Self {
            client: RpcClient::new(endpoint, config),
            config: config.clone(),
        }
    }

    pub async fn ping(&self) -> KvResult<String> {
        self.client.call_pong(&CoordinatorMessage::Ping).await
    }
}

#[async_trait]
impl CoordinatorService for RemoteCoordinator {
    fn endpoint(&self) -> &str {
        self.client.endpoint()
    }

    async fn add_participant(&self, participant: Arc<dyn ParticipantService>) -> KvResult<()> {
        self.client
            .call_ok(&CoordinatorMessage::AddParticipant {
                endpoint: participant.node_id().to_string(),
            })
            .await
    }

    async fn participants(&self) -> KvResult<Vec<Arc<dyn ParticipantService>>> {
        match self.client.call(&CoordinatorMessage::GetParticipants).await? {
            Response::Participants { endpoints } => Ok(endpoints
                .into_iter()
                .map(|endpoint| Arc::new(RemoteParticipant::new(endpoint, &self.config)) as Arc<dyn ParticipantService>)
                .collect()),
            other => Err(self.client.unexpected(other)),
        }
    }

    async fn prepare_transaction(&self, txn: &Txn) -> KvResult<Decision> {
        match self
            .client
            .call(&CoordinatorMessage::PrepareTransaction { txn: txn.clone() })
            .await?
        {
            Response::Decision { decision } => Ok(decision),
            other => Err(self.client.unexpected(other)),
        }
    }

    async fn metrics(&self) -> KvResult<CoordinatorMetrics> {
        match self.client.call(&CoordinatorMessage::Metrics).await? {
            Response::Metrics { metrics } => Ok(metrics),
            other => Err(self.client.unexpected(other)),
        }
    }
}
