//! Request dispatch from wire messages to service calls

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::client::{RemoteCoordinator, RemoteParticipant};
use super::config::RpcConfig;
use super::listener::Handler;
use super::messages::{CoordinatorMessage, ParticipantMessage, Response};
use crate::error::KvResult;
use crate::service::{CoordinatorService, ParticipantService};

fn respond<T>(result: KvResult<T>, ok: impl FnOnce(T) -> Response) -> Response {
    match result {
        Ok(value) => ok(value),
        Err(e) => {
            warn!(error = %e, "Request failed");
            Response::Error { message: e.to_string() }
        }
    }
}

/// Serves a participant over the wire
pub struct ParticipantHandler {
    participant: Arc<dyn ParticipantService>,
    rpc: RpcConfig,
}

impl ParticipantHandler {
    pub fn new(participant: Arc<dyn ParticipantService>, rpc: RpcConfig) -> Self {
        Self { participant, rpc }
    }
}

#[async_trait]
impl Handler for ParticipantHandler {
    type Message = ParticipantMessage;

    async fn handle(&self, message: ParticipantMessage) -> Response {
        let p = &self.participant;
        match message {
            ParticipantMessage::RequestTxn { txn_id, is_delete } => {
                respond(p.request_txn(&txn_id, is_delete).await, |_| Response::Ok)
            }
            ParticipantMessage::Prepare { txn } => respond(p.prepare(&txn).await, |vote| Response::Vote { vote }),
            ParticipantMessage::Commit { txn_id } => respond(p.commit(&txn_id).await, |_| Response::Ok),
            ParticipantMessage::Abort { txn_id } => respond(p.abort(&txn_id).await, |_| Response::Ok),
            ParticipantMessage::GetValue {
                key,
                request_id,
                client_id,
            } => respond(p.get_value(&key, &request_id, &client_id).await, |outcome| {
                Response::Value { outcome }
            }),
            ParticipantMessage::PutValue {
                key,
                value,
                request_id,
                client_id,
            } => respond(p.put_value(&key, &value, &request_id, &client_id).await, |applied| {
                Response::Applied { applied }
            }),
            ParticipantMessage::DeleteValue {
                key,
                request_id,
                client_id,
            } => respond(p.delete_value(&key, &request_id, &client_id).await, |applied| {
                Response::Applied { applied }
            }),
            ParticipantMessage::ApplyPut { key, value } => {
                respond(p.apply_put(&key, &value).await, |vote| Response::Vote { vote })
            }
            ParticipantMessage::ApplyDelete { key } => {
                respond(p.apply_delete(&key).await, |vote| Response::Vote { vote })
            }
            ParticipantMessage::SetCoordinator { endpoint } => {
                debug!(node_id = %p.node_id(), %endpoint, "handle: wiring remote coordinator");
                let coordinator = Arc::new(RemoteCoordinator::new(endpoint, &self.rpc));
                respond(p.set_coordinator(coordinator).await, |_| Response::Ok)
            }
            ParticipantMessage::EnableReplication => respond(p.enable_replication().await, |_| Response::Ok),
            ParticipantMessage::Ping => respond(p.ping().await, |version| Response::Pong { version }),
        }
    }
}

/// Serves the coordinator over the wire
pub struct CoordinatorHandler {
    coordinator: Arc<dyn CoordinatorService>,
    rpc: RpcConfig,
}

impl CoordinatorHandler {
    pub fn new(coordinator: Arc<dyn CoordinatorService>, rpc: RpcConfig) -> Self {
        Self { coordinator, rpc }
    }
}

#[async_trait]
impl Handler for CoordinatorHandler {
    type Message = CoordinatorMessage;

    async fn handle(&self, message: CoordinatorMessage) -> Response {
        let c = &self.coordinator;
        match message {
            CoordinatorMessage::AddParticipant { endpoint } => {
                debug!(%endpoint, "handle: registering remote participant");
                let participant = Arc::new(RemoteParticipant::new(endpoint, &self.rpc));
                respond(c.add_participant(participant).await, |_| Response::Ok)
            }
            CoordinatorMessage::GetParticipants => respond(c.participants().await, |participants| {
                Response::Participants {
                    endpoints: participants.iter().map(|p| p.node_id().to_string()).collect(),
                }
            }),
            CoordinatorMessage::PrepareTransaction { txn } => {
                respond(c.prepare_transaction(&txn).await, |decision| Response::Decision { decision })
            }
            CoordinatorMessage::Metrics => respond(c.metrics().await, |metrics| Response::Metrics { metrics }),
            CoordinatorMessage::Ping => Response::Pong {
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::{Coordinator, CoordinatorConfig};
    use crate::participant::{Participant, ParticipantConfig};
    use crate::txn::{GetOutcome, OpKind, Txn, TxnId, Vote};

    fn participant_handler() -> (Arc<Participant>, ParticipantHandler) {
        let node = Arc::new(Participant::new("p1", ParticipantConfig::default()));
        let handler = ParticipantHandler::new(node.clone(), RpcConfig::default());
        (node, handler)
    }

    #[tokio::test]
    async fn test_prepare_dispatches_to_vote() {
        let (_, handler) = participant_handler();
        let response = handler
            .handle(ParticipantMessage::Prepare {
                txn: Txn::new(TxnId::generate(), "missing", OpKind::Delete),
            })
            .await;
        assert_eq!(response, Response::Vote { vote: Vote::Nack });
    }

    #[tokio::test]
    async fn test_commit_then_get_value() {
        let (node, handler) = participant_handler();
        node.apply_put("key1", "value1").await.unwrap();

        let id = TxnId::generate();
        assert_eq!(
            handler.handle(ParticipantMessage::Commit { txn_id: id.clone() }).await,
            Response::Ok
        );
        let response = handler
            .handle(ParticipantMessage::GetValue {
                key: "key1".to_string(),
                request_id: id,
                client_id: "client-1".to_string(),
            })
            .await;
        assert_eq!(
            response,
            Response::Value {
                outcome: GetOutcome::Found("value1".to_string())
            }
        );
    }

    #[tokio::test]
    async fn test_service_error_becomes_error_response() {
        let (_, handler) = participant_handler();
        handler.handle(ParticipantMessage::EnableReplication).await;

        // Replication on but no coordinator wired
        let response = handler
            .handle(ParticipantMessage::PutValue {
                key: "key1".to_string(),
                value: "value1".to_string(),
                request_id: TxnId::generate(),
                client_id: "client-1".to_string(),
            })
            .await;
        assert!(matches!(response, Response::Error { .. }));
    }

    #[tokio::test]
    async fn test_add_participant_registers_endpoint() {
        let coordinator = Arc::new(Coordinator::new("127.0.0.1:1099", CoordinatorConfig::default()));
        let handler = CoordinatorHandler::new(coordinator, RpcConfig::default());

        for endpoint in ["127.0.0.1:5001", "127.0.0.1:5002"] {
            let response = handler
                .handle(CoordinatorMessage::AddParticipant {
                    endpoint: endpoint.to_string(),
                })
                .await;
            assert_eq!(response, Response::Ok);
        }

        let response = handler.handle(CoordinatorMessage::GetParticipants).await;
        assert_eq!(
            response,
            Response::Participants {
                endpoints: vec!["127.0.0.1:5001".to_string(), "127.0.0.1:5002".to_string()]
            }
        );
    }

    #[tokio::test]
    async fn test_coordinator_ping() {
        let coordinator = Arc::new(Coordinator::new("127.0.0.1:1099", CoordinatorConfig::default()));
        let handler = CoordinatorHandler::new(coordinator, RpcConfig::default());
        assert!(matches!(
            handler.handle(CoordinatorMessage::Ping).await,
            Response::Pong { .. }
        ));
    }
}
