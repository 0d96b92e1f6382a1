//! Voting round implementation

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::future::join_all;
use futures::stream::FuturesUnordered;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::config::{CoordinatorConfig, VotingStrategy};
use super::metrics::{CoordinatorMetrics, Counters};
use crate::error::{KvError, KvResult, with_timeout};
use crate::service::{CoordinatorService, ParticipantService};
use crate::txn::{Decision, Txn, TxnId, Vote};

/// What the vote collection phase observed
enum Tally {
    AllAck,
    Nack { node_id: String },
    TimedOut { node_id: String },
    Failed { node_id: String, error: KvError },
}

impl Tally {
    fn from_vote(node_id: String, result: KvResult<Vote>) -> Option<Self> {
        match result {
            Ok(Vote::Ack) => None,
            Ok(Vote::Nack) => Some(Tally::Nack { node_id }),
            Err(e) if e.is_timeout() => Some(Tally::TimedOut { node_id }),
            Err(error) => Some(Tally::Failed { node_id, error }),
        }
    }
}

/// Drives two-phase voting for key-scoped transactions
pub struct Coordinator {
    endpoint: String,
    config: CoordinatorConfig,
    participants: RwLock<Vec<Arc<dyn ParticipantService>>>,
    counters: Counters,
}

impl Coordinator {
    /// Create a coordinator with no participants
    pub fn new(endpoint: impl Into<String>, config: CoordinatorConfig) -> Self {
        let endpoint = endpoint.into();
        debug!(%endpoint, ?config, "Coordinator::new: called");
        Self {
            endpoint,
            config,
            participants: RwLock::new(Vec::new()),
            counters: Counters::default(),
        }
    }

    fn call_timeout(&self) -> Duration {
        self.config.call_timeout()
    }

    async fn collect_concurrent(&self, participants: &[Arc<dyn ParticipantService>], txn: &Txn) -> Tally {
        let timeout = self.call_timeout();
        let mut pending: FuturesUnordered<_> = participants
            .iter()
            .map(|participant| async move {
                let result = with_timeout(participant.node_id(), timeout, participant.prepare(txn)).await;
                (participant.node_id().to_string(), result)
            })
            .collect();

        // Dropping `pending` on an early return abandons the outstanding votes
        while let Some((node_id, result)) = pending.next().await {
            debug!(txn_id = %txn.id, %node_id, ?result, "collect_concurrent: vote received");
            if let Some(tally) = Tally::from_vote(node_id, result) {
                return tally;
            }
        }
        Tally::AllAck
    }

    async fn collect_sequential(&self, participants: &[Arc<dyn ParticipantService>], txn: &Txn) -> Tally {
        let timeout = self.call_timeout();
        for participant in participants {
            let result = with_timeout(participant.node_id(), timeout, participant.prepare(txn)).await;
            debug!(txn_id = %txn.id, node_id = %participant.node_id(), ?result, "collect_sequential: vote received");
            if let Some(tally) = Tally::from_vote(participant.node_id().to_string(), result) {
                return tally;
            }
        }
        Tally::AllAck
    }

    /// Send the decision to every participant; returns the number of failed deliveries
    async fn broadcast(&self, participants: &[Arc<dyn ParticipantService>], txn_id: &TxnId, decision: Decision) -> u64 {
        let timeout = self.call_timeout();
        let deliveries = participants.iter().map(|participant| async move {
            let call = async {
                match decision {
                    Decision::Commit => participant.commit(txn_id).await,
                    Decision::Abort => participant.abort(txn_id).await,
                }
            };
            let result = with_timeout(participant.node_id(), timeout, call).await;
            if let Err(e) = &result {
                warn!(%txn_id, node_id = %participant.node_id(), ?decision, error = %e, "Failed to deliver decision");
            }
            result.is_err()
        });

        join_all(deliveries).await.into_iter().filter(|failed| *failed).count() as u64
    }
}

#[async_trait]
impl CoordinatorService for Coordinator {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn add_participant(&self, participant: Arc<dyn ParticipantService>) -> KvResult<()> {
        info!(node_id = %participant.node_id(), "Adding participant");
        self.participants.write().await.push(participant);
        Ok(())
    }

    async fn participants(&self) -> KvResult<Vec<Arc<dyn ParticipantService>>> {
        Ok(self.participants.read().await.clone())
    }

    async fn prepare_transaction(&self, txn: &Txn) -> KvResult<Decision> {
        debug!(txn_id = %txn.id, key = %txn.key, kind = ?txn.kind, "prepare_transaction: called");
        let participants = self.participants.read().await.clone();
        Counters::bump(&self.counters.rounds);

        let tally = match self.config.voting {
            VotingStrategy::Concurrent => self.collect_concurrent(&participants, txn).await,
            VotingStrategy::Sequential => self.collect_sequential(&participants, txn).await,
        };

        let decision = match tally {
            Tally::AllAck => Decision::Commit,
            _ => Decision::Abort,
        };

        let failed = self.broadcast(&participants, &txn.id, decision).await;
        Counters::add(&self.counters.broadcast_failures, failed);

        match decision {
            Decision::Commit => Counters::bump(&self.counters.commits),
            Decision::Abort => Counters::bump(&self.counters.aborts),
        }

        match tally {
            Tally::AllAck => {
                info!(txn_id = %txn.id, key = %txn.key, "Transaction committed");
                Ok(Decision::Commit)
            }
            Tally::Nack { node_id } => {
                info!(txn_id = %txn.id, key = %txn.key, %node_id, "Transaction aborted by NACK");
                Ok(Decision::Abort)
            }
            Tally::TimedOut { node_id } => {
                warn!(txn_id = %txn.id, key = %txn.key, %node_id, "Vote timed out, transaction aborted");
                Counters::bump(&self.counters.vote_timeouts);
                Ok(Decision::Abort)
            }
            Tally::Failed { node_id, error } => {
                warn!(txn_id = %txn.id, key = %txn.key, %node_id, %error, "Vote failed, transaction aborted");
                Counters::bump(&self.counters.transport_failures);
                Err(error)
            }
        }
    }

    async fn metrics(&self) -> KvResult<CoordinatorMetrics> {
        let participants = self.participants.read().await.len();
        Ok(self.counters.snapshot(participants))
    }
}
