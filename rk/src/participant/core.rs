//! Participant node implementation

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::config::ParticipantConfig;
use super::contexts::TxnTable;
use crate::error::{KvError, KvResult, with_timeout};
use crate::service::{CoordinatorService, ParticipantService};
use crate::store::LocalStore;
use crate::txn::{GetOutcome, OpKind, Resolution, Txn, TxnId, Vote};

/// A write being propagated to peers
#[derive(Debug, Clone, Copy)]
enum Replicated<'a> {
    Put { key: &'a str, value: &'a str },
    Delete { key: &'a str },
}

/// One replica of the key/value store
pub struct Participant {
    node_id: String,
    config: ParticipantConfig,
    store: LocalStore,
    txns: TxnTable,
    replication_enabled: AtomicBool,
    coordinator: RwLock<Option<Arc<dyn CoordinatorService>>>,
}

impl Participant {
    /// Create a participant with an empty store
    pub fn new(node_id: impl Into<String>, config: ParticipantConfig) -> Self {
        let node_id = node_id.into();
        debug!(%node_id, ?config, "Participant::new: called");
        Self {
            txns: TxnTable::new(config.txn_ttl()),
            node_id,
            config,
            store: LocalStore::new(),
            replication_enabled: AtomicBool::new(false),
            coordinator: RwLock::new(None),
        }
    }

    /// Read-only access to the local store
    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn replication_enabled(&self) -> bool {
        self.replication_enabled.load(Ordering::SeqCst)
    }

    /// Number of transaction contexts currently tracked
    pub async fn open_transactions(&self) -> usize {
        self.txns.len().await
    }

    async fn coordinator(&self) -> KvResult<Arc<dyn CoordinatorService>> {
        self.coordinator
            .read()
            .await
            .clone()
            .ok_or_else(|| KvError::CoordinatorUnset {
                node_id: self.node_id.clone(),
            })
    }

    /// Second voting round run by the primary before a replicated write
    async fn revote(&self, key: &str, kind: OpKind, request_id: &TxnId) -> KvResult<()> {
        if !self.replication_enabled() {
            return Ok(());
        }
        let coordinator = self.coordinator().await?;
        let decision = coordinator
            .prepare_transaction(&Txn::new(request_id.clone(), key, kind))
            .await?;
        debug!(node_id = %self.node_id, %request_id, ?decision, "revote: decided");
        Ok(())
    }

    /// Check and consume the gate for `request_id`
    async fn pass_gate(&self, request_id: &TxnId) -> bool {
        self.txns.take_committed(request_id).await
    }

    /// Push an accepted write to every other participant, ignoring their results
    async fn replicate(&self, op: Replicated<'_>) {
        if !self.replication_enabled() {
            return;
        }

        let peers = match self.coordinator().await {
            Ok(coordinator) => match coordinator.participants().await {
                Ok(peers) => peers,
                Err(e) => {
                    warn!(node_id = %self.node_id, error = %e, "Failed to fetch peers, skipping replication");
                    return;
                }
            },
            Err(e) => {
                warn!(node_id = %self.node_id, error = %e, "Skipping replication");
                return;
            }
        };

        let timeout = self.config.replication_timeout();
        let calls = peers
            .iter()
            .filter(|peer| peer.node_id() != self.node_id)
            .map(|peer| async move {
                let call = async {
                    match op {
                        Replicated::Put { key, value } => peer.apply_put(key, value).await,
                        Replicated::Delete { key } => peer.apply_delete(key).await,
                    }
                };
                if let Err(e) = with_timeout(peer.node_id(), timeout, call).await {
                    warn!(from = %self.node_id, to = %peer.node_id(), ?op, error = %e, "Replication failed");
                }
            });

        join_all(calls).await;
        debug!(node_id = %self.node_id, ?op, "replicate: fan-out complete");
    }
}

#[async_trait]
impl ParticipantService for Participant {
    fn node_id(&self) -> &str {
        &self.node_id
    }

    async fn request_txn(&self, txn_id: &TxnId, is_delete: bool) -> KvResult<()> {
        debug!(node_id = %self.node_id, %txn_id, is_delete, "request_txn: called");
        self.txns.request(txn_id, is_delete).await;
        Ok(())
    }

    async fn prepare(&self, txn: &Txn) -> KvResult<Vote> {
        let delete_requested = self.txns.enlist(&txn.id).await;
        let is_delete = delete_requested || txn.kind == OpKind::Delete;

        let vote = if is_delete && !self.store.contains(&txn.key).await {
            Vote::Nack
        } else {
            Vote::Ack
        };
        debug!(node_id = %self.node_id, txn_id = %txn.id, key = %txn.key, ?vote, "prepare: voted");
        Ok(vote)
    }

    async fn commit(&self, txn_id: &TxnId) -> KvResult<()> {
        debug!(node_id = %self.node_id, %txn_id, "commit: called");
        self.txns.resolve(txn_id, Resolution::Committed).await;
        Ok(())
    }

    async fn abort(&self, txn_id: &TxnId) -> KvResult<()> {
        debug!(node_id = %self.node_id, %txn_id, "abort: called");
        self.txns.resolve(txn_id, Resolution::Aborted).await;
        Ok(())
    }

    async fn get_value(&self, key: &str, request_id: &TxnId, client_id: &str) -> KvResult<GetOutcome> {
        info!(node_id = %self.node_id, %key, %request_id, %client_id, "Request to get value");
        if !self.pass_gate(request_id).await {
            info!(node_id = %self.node_id, %key, %request_id, %client_id, "Get aborted");
            return Ok(GetOutcome::Aborted);
        }

        let outcome = match self.store.get(key).await {
            Some(value) => GetOutcome::Found(value),
            None => GetOutcome::NotFound,
        };
        info!(node_id = %self.node_id, %key, %request_id, %client_id, ?outcome, "Value retrieved");
        Ok(outcome)
    }

    async fn put_value(&self, key: &str, value: &str, request_id: &TxnId, client_id: &str) -> KvResult<bool> {
        info!(node_id = %self.node_id, %key, %value, %request_id, %client_id, "Request to put value");
        self.revote(key, OpKind::Write, request_id).await?;

        if !self.pass_gate(request_id).await {
            info!(node_id = %self.node_id, %key, %request_id, %client_id, "Put aborted");
            return Ok(false);
        }

        self.store.put(key, value).await;
        info!(node_id = %self.node_id, %key, %value, %request_id, %client_id, "Value inserted");

        self.replicate(Replicated::Put { key, value }).await;
        Ok(true)
    }

    async fn delete_value(&self, key: &str, request_id: &TxnId, client_id: &str) -> KvResult<bool> {
        info!(node_id = %self.node_id, %key, %request_id, %client_id, "Request to delete value");
        self.revote(key, OpKind::Delete, request_id).await?;

        if !self.pass_gate(request_id).await {
            info!(node_id = %self.node_id, %key, %request_id, %client_id, "Delete aborted");
            return Ok(false);
        }

        let deleted = self.store.remove(key).await.is_some();
        info!(node_id = %self.node_id, %key, deleted, %request_id, %client_id, "Value deletion status");

        self.replicate(Replicated::Delete { key }).await;
        Ok(deleted)
    }

    async fn apply_put(&self, key: &str, value: &str) -> KvResult<Vote> {
        debug!(node_id = %self.node_id, %key, "apply_put: called");
        self.store.put(key, value).await;
        Ok(Vote::Ack)
    }

    async fn apply_delete(&self, key: &str) -> KvResult<Vote> {
        debug!(node_id = %self.node_id, %key, "apply_delete: called");
        self.store.remove(key).await;
        Ok(Vote::Ack)
    }

    async fn set_coordinator(&self, coordinator: Arc<dyn CoordinatorService>) -> KvResult<()> {
        info!(node_id = %self.node_id, coordinator = %coordinator.endpoint(), "Coordinator assigned");
        *self.coordinator.write().await = Some(coordinator);
        Ok(())
    }

    async fn enable_replication(&self) -> KvResult<()> {
        if !self.replication_enabled.swap(true, Ordering::SeqCst) {
            info!(node_id = %self.node_id, "Replication enabled");
        }
        Ok(())
    }

    async fn ping(&self) -> KvResult<String> {
        Ok(env!("CARGO_PKG_VERSION").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::{Coordinator, CoordinatorConfig};
    use crate::txn::Decision;

    const CLIENT: &str = "client-1";

    async fn cluster(size: usize) -> (Arc<Coordinator>, Vec<Arc<Participant>>) {
        let coordinator = Arc::new(Coordinator::new("coordinator", CoordinatorConfig::default()));
        let mut nodes = Vec::new();
        for i in 1..=size {
            let node = Arc::new(Participant::new(format!("p{}", i), ParticipantConfig::default()));
            coordinator.add_participant(node.clone()).await.unwrap();
            node.set_coordinator(coordinator.clone()).await.unwrap();
            node.enable_replication().await.unwrap();
            nodes.push(node);
        }
        (coordinator, nodes)
    }

    async fn begin(primary: &Participant, coordinator: &Coordinator, key: &str, kind: OpKind) -> (TxnId, Decision) {
        let id = TxnId::generate();
        primary.request_txn(&id, kind == OpKind::Delete).await.unwrap();
        let decision = coordinator
            .prepare_transaction(&Txn::new(id.clone(), key, kind))
            .await
            .unwrap();
        (id, decision)
    }

    #[tokio::test]
    async fn test_prepare_nacks_delete_of_absent_key() {
        let node = Participant::new("p1", ParticipantConfig::default());
        let id = TxnId::generate();
        node.request_txn(&id, true).await.unwrap();

        let vote = node.prepare(&Txn::new(id, "missing", OpKind::Read)).await.unwrap();
        assert_eq!(vote, Vote::Nack);
    }

    #[tokio::test]
    async fn test_prepare_acks_reads_and_writes() {
        let node = Participant::new("p1", ParticipantConfig::default());
        for kind in [OpKind::Read, OpKind::Write] {
            let vote = node.prepare(&Txn::new(TxnId::generate(), "missing", kind)).await.unwrap();
            assert_eq!(vote, Vote::Ack);
        }
    }

    #[tokio::test]
    async fn test_prepare_acks_delete_of_present_key() {
        let node = Participant::new("p1", ParticipantConfig::default());
        node.apply_put("key1", "value1").await.unwrap();

        let vote = node
            .prepare(&Txn::new(TxnId::generate(), "key1", OpKind::Delete))
            .await
            .unwrap();
        assert_eq!(vote, Vote::Ack);
    }

    #[tokio::test]
    async fn test_abort_closes_gate_without_mutation() {
        let node = Participant::new("p1", ParticipantConfig::default());
        node.apply_put("key1", "value1").await.unwrap();

        let id = TxnId::generate();
        node.abort(&id).await.unwrap();
        assert_eq!(node.get_value("key1", &id, CLIENT).await.unwrap(), GetOutcome::Aborted);

        let id = TxnId::generate();
        node.abort(&id).await.unwrap();
        assert!(!node.put_value("key1", "other", &id, CLIENT).await.unwrap());

        let id = TxnId::generate();
        node.abort(&id).await.unwrap();
        assert!(!node.delete_value("key1", &id, CLIENT).await.unwrap());

        assert_eq!(node.store().get("key1").await.as_deref(), Some("value1"));
    }

    #[tokio::test]
    async fn test_unresolved_txn_gate_is_closed() {
        let node = Participant::new("p1", ParticipantConfig::default());
        let id = TxnId::generate();
        node.request_txn(&id, false).await.unwrap();

        assert!(!node.put_value("key1", "value1", &id, CLIENT).await.unwrap());
        assert!(node.store().is_empty().await);
    }

    #[tokio::test]
    async fn test_committed_put_then_get_round_trip() {
        let node = Participant::new("p1", ParticipantConfig::default());

        let id = TxnId::generate();
        node.commit(&id).await.unwrap();
        assert!(node.put_value("key1", "value with spaces", &id, CLIENT).await.unwrap());

        let id = TxnId::generate();
        node.commit(&id).await.unwrap();
        assert_eq!(
            node.get_value("key1", &id, CLIENT).await.unwrap(),
            GetOutcome::Found("value with spaces".to_string())
        );
    }

    #[tokio::test]
    async fn test_gate_is_consumed_by_operation() {
        let node = Participant::new("p1", ParticipantConfig::default());
        let id = TxnId::generate();
        node.commit(&id).await.unwrap();

        assert!(node.put_value("key1", "value1", &id, CLIENT).await.unwrap());
        assert!(!node.put_value("key1", "value2", &id, CLIENT).await.unwrap());
        assert_eq!(node.open_transactions().await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_puts_on_one_gate_execute_once() {
        let node = Arc::new(Participant::new("p1", ParticipantConfig::default()));

        for _ in 0..100 {
            let id = TxnId::generate();
            node.commit(&id).await.unwrap();

            let puts: Vec<_> = (0..2)
                .map(|i| {
                    let node = node.clone();
                    let id = id.clone();
                    tokio::spawn(async move { node.put_value("key1", &i.to_string(), &id, CLIENT).await })
                })
                .collect();

            let mut executed = 0;
            for put in puts {
                if put.await.unwrap().unwrap() {
                    executed += 1;
                }
            }
            assert_eq!(executed, 1);
        }
        assert_eq!(node.open_transactions().await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_txns_do_not_share_gates() {
        let node = Participant::new("p1", ParticipantConfig::default());
        let committed = TxnId::generate();
        let aborted = TxnId::generate();

        node.commit(&committed).await.unwrap();
        node.abort(&aborted).await.unwrap();

        assert!(!node.put_value("key1", "from-aborted", &aborted, CLIENT).await.unwrap());
        assert!(node.put_value("key1", "from-committed", &committed, CLIENT).await.unwrap());
        assert_eq!(node.store().get("key1").await.as_deref(), Some("from-committed"));
    }

    #[tokio::test]
    async fn test_replicated_put_reaches_every_participant() {
        let (coordinator, nodes) = cluster(5).await;
        let primary = &nodes[0];

        let (id, decision) = begin(primary, &coordinator, "key1", OpKind::Write).await;
        assert_eq!(decision, Decision::Commit);
        assert!(primary.put_value("key1", "value1", &id, CLIENT).await.unwrap());

        for node in &nodes {
            assert_eq!(node.store().get("key1").await.as_deref(), Some("value1"));
        }

        let reader = &nodes[3];
        let (id, _) = begin(reader, &coordinator, "key1", OpKind::Read).await;
        assert_eq!(
            reader.get_value("key1", &id, CLIENT).await.unwrap(),
            GetOutcome::Found("value1".to_string())
        );
    }

    #[tokio::test]
    async fn test_replicated_put_runs_second_voting_round() {
        let (coordinator, nodes) = cluster(3).await;
        let primary = &nodes[1];

        let (id, _) = begin(primary, &coordinator, "key1", OpKind::Write).await;
        assert!(primary.put_value("key1", "value1", &id, CLIENT).await.unwrap());

        let metrics = coordinator.metrics().await.unwrap();
        assert_eq!(metrics.rounds, 2);
        assert_eq!(metrics.commits, 2);
    }

    #[tokio::test]
    async fn test_delete_missing_key_aborts_everywhere() {
        let (coordinator, nodes) = cluster(5).await;
        let primary = &nodes[0];

        let (id, decision) = begin(primary, &coordinator, "keyX", OpKind::Delete).await;
        assert_eq!(decision, Decision::Abort);
        assert!(!primary.delete_value("keyX", &id, CLIENT).await.unwrap());

        for node in &nodes {
            assert!(node.store().is_empty().await);
        }
    }

    #[tokio::test]
    async fn test_delete_twice_true_then_false() {
        let (coordinator, nodes) = cluster(3).await;
        let primary = &nodes[2];

        let (id, _) = begin(primary, &coordinator, "key1", OpKind::Write).await;
        assert!(primary.put_value("key1", "value1", &id, CLIENT).await.unwrap());

        let (id, decision) = begin(primary, &coordinator, "key1", OpKind::Delete).await;
        assert_eq!(decision, Decision::Commit);
        assert!(primary.delete_value("key1", &id, CLIENT).await.unwrap());

        let (id, decision) = begin(primary, &coordinator, "key1", OpKind::Delete).await;
        assert_eq!(decision, Decision::Abort);
        assert!(!primary.delete_value("key1", &id, CLIENT).await.unwrap());

        for node in &nodes {
            assert!(!node.store().contains("key1").await);
        }
    }

    #[tokio::test]
    async fn test_replication_requires_coordinator() {
        let node = Participant::new("p1", ParticipantConfig::default());
        node.enable_replication().await.unwrap();

        let result = node.put_value("key1", "value1", &TxnId::generate(), CLIENT).await;
        assert!(matches!(result, Err(KvError::CoordinatorUnset { .. })));
    }

    #[tokio::test]
    async fn test_apply_ops_bypass_voting() {
        let node = Participant::new("p1", ParticipantConfig::default());
        assert_eq!(node.apply_put("key1", "value1").await.unwrap(), Vote::Ack);
        assert_eq!(node.store().get("key1").await.as_deref(), Some("value1"));

        assert_eq!(node.apply_delete("key1").await.unwrap(), Vote::Ack);
        assert_eq!(node.apply_delete("key1").await.unwrap(), Vote::Ack);
        assert!(node.store().is_empty().await);
    }

    #[tokio::test]
    async fn test_enable_replication_is_idempotent() {
        let node = Participant::new("p1", ParticipantConfig::default());
        assert!(!node.replication_enabled());
        node.enable_replication().await.unwrap();
        node.enable_replication().await.unwrap();
        assert!(node.replication_enabled());
    }
}
