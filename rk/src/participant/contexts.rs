//! Per-transaction gate state
//!
//! Every in-flight transaction has its own context keyed by [`TxnId`], so
//! concurrent client operations on one participant never share a gate.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

use crate::txn::{Resolution, TxnId};

#[derive(Debug, Clone)]
struct TxnContext {
    delete_requested: bool,
    resolution: Resolution,
    touched_at: Instant,
}

impl TxnContext {
    fn new(now: Instant) -> Self {
        Self {
            delete_requested: false,
            resolution: Resolution::Pending,
            touched_at: now,
        }
    }
}

/// Table of transaction contexts with expiry
#[derive(Debug)]
pub(crate) struct TxnTable {
    inner: Mutex<Inner>,
    ttl: Duration,
}

#[derive(Debug)]
struct Inner {
    entries: HashMap<TxnId, TxnContext>,
    last_sweep: Instant,
}

impl Inner {
    /// Drop expired contexts, at most once per `ttl`
    fn sweep(&mut self, now: Instant, ttl: Duration) {
        if now.duration_since(self.last_sweep) < ttl {
            return;
        }
        self.last_sweep = now;

        let before = self.entries.len();
        self.entries.retain(|_, ctx| now.duration_since(ctx.touched_at) <= ttl);
        if self.entries.len() < before {
            debug!(pruned = before - self.entries.len(), "TxnTable::sweep: pruned expired contexts");
        }
    }
}

impl TxnTable {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                last_sweep: Instant::now(),
            }),
            ttl,
        }
    }

    /// Apply `update` to the context of `txn_id`, creating it if needed
    ///
    /// A context lives between one and two `ttl`s after its last touch.
    async fn upsert<R>(&self, txn_id: &TxnId, update: impl FnOnce(&mut TxnContext) -> R) -> R {
        let now = Instant::now();
        let mut inner = self.inner.lock().await;
        inner.sweep(now, self.ttl);

        let ctx = inner.entries.entry(txn_id.clone()).or_insert_with(|| TxnContext::new(now));
        ctx.touched_at = now;
        update(ctx)
    }

    /// Record whether the upcoming operation is a delete
    pub async fn request(&self, txn_id: &TxnId, is_delete: bool) {
        self.upsert(txn_id, |ctx| ctx.delete_requested = is_delete).await
    }

    /// Register the transaction for voting, returning whether a delete was requested
    pub async fn enlist(&self, txn_id: &TxnId) -> bool {
        self.upsert(txn_id, |ctx| ctx.delete_requested).await
    }

    /// Record the coordinator's resolution
    pub async fn resolve(&self, txn_id: &TxnId, resolution: Resolution) {
        self.upsert(txn_id, |ctx| ctx.resolution = resolution).await
    }

    /// Remove the context of `txn_id`, returning true only if it was committed
    ///
    /// At most one caller observes a given commit.
    pub async fn take_committed(&self, txn_id: &TxnId) -> bool {
        self.inner
            .lock()
            .await
            .entries
            .remove(txn_id)
            .is_some_and(|ctx| ctx.resolution == Resolution::Committed)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }
}
