//! Service surfaces of participants and the coordinator
//!
//! Protocol code only talks to these traits. The in-process nodes
//! ([`crate::participant::Participant`], [`crate::coordinator::Coordinator`])
//! implement them directly; [`crate::rpc`] provides remote stubs that forward
//! each call over TCP.

use std::sync::Arc;

use async_trait::async_trait;

use crate::coordinator::CoordinatorMetrics;
use crate::error::KvResult;
use crate::txn::{Decision, GetOutcome, Txn, TxnId, Vote};

/// Operations a participant exposes to clients, peers and the coordinator
#[async_trait]
pub trait ParticipantService: Send + Sync {
    /// Endpoint identifying this participant (its listen address)
    fn node_id(&self) -> &str;

    /// Declare whether the upcoming operation of `txn_id` is a delete
    async fn request_txn(&self, txn_id: &TxnId, is_delete: bool) -> KvResult<()>;

    /// Vote on a transaction
    async fn prepare(&self, txn: &Txn) -> KvResult<Vote>;

    /// Open the gate for a transaction
    async fn commit(&self, txn_id: &TxnId) -> KvResult<()>;

    /// Close the gate for a transaction
    async fn abort(&self, txn_id: &TxnId) -> KvResult<()>;

    /// Gated read
    async fn get_value(&self, key: &str, request_id: &TxnId, client_id: &str) -> KvResult<GetOutcome>;

    /// Gated write, replicated to peers when replication is enabled
    async fn put_value(&self, key: &str, value: &str, request_id: &TxnId, client_id: &str) -> KvResult<bool>;

    /// Gated delete, replicated to peers when replication is enabled
    async fn delete_value(&self, key: &str, request_id: &TxnId, client_id: &str) -> KvResult<bool>;

    /// Peer-only: unconditional write, no voting
    async fn apply_put(&self, key: &str, value: &str) -> KvResult<Vote>;

    /// Peer-only: unconditional delete, no voting
    async fn apply_delete(&self, key: &str) -> KvResult<Vote>;

    /// One-time wiring of the coordinator handle
    async fn set_coordinator(&self, coordinator: Arc<dyn CoordinatorService>) -> KvResult<()>;

    /// Turn replication on (never turned off again)
    async fn enable_replication(&self) -> KvResult<()>;

    /// Liveness probe, returns the node's version string
    async fn ping(&self) -> KvResult<String>;
}

/// Operations the coordinator exposes
#[async_trait]
pub trait CoordinatorService: Send + Sync {
    /// Endpoint identifying the coordinator
    fn endpoint(&self) -> &str;

    /// Append a participant to the membership list
    async fn add_participant(&self, participant: Arc<dyn ParticipantService>) -> KvResult<()>;

    /// Current membership in registration order
    async fn participants(&self) -> KvResult<Vec<Arc<dyn ParticipantService>>>;

    /// Run one voting round for `txn` and resolve every participant
    async fn prepare_transaction(&self, txn: &Txn) -> KvResult<Decision>;

    /// Protocol counters
    async fn metrics(&self) -> KvResult<CoordinatorMetrics>;
}
