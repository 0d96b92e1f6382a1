//! Node bootstrap
//!
//! Binds listeners from static configuration and performs the one-time
//! wiring: every participant is registered with the coordinator in
//! configuration order, learns the coordinator handle, and has replication
//! switched on when the cluster enables it.

use std::sync::Arc;
use std::time::Duration;

use eyre::{Context, Result};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::coordinator::{Coordinator, CoordinatorMetrics};
use crate::error::KvResult;
use crate::participant::Participant;
use crate::rpc::{self, CoordinatorHandler, ParticipantHandler, RemoteCoordinator, RemoteParticipant};
use crate::service::{CoordinatorService, ParticipantService};

/// Attempts made to reach the coordinator when a participant starts
const REGISTER_ATTEMPTS: u32 = 20;

/// Pause between registration attempts
const REGISTER_BACKOFF: Duration = Duration::from_millis(250);

/// One-time wiring of a cluster
pub async fn wire(
    coordinator: Arc<dyn CoordinatorService>,
    participants: &[Arc<dyn ParticipantService>],
    replication: bool,
) -> KvResult<()> {
    debug!(coordinator = %coordinator.endpoint(), count = participants.len(), replication, "wire: called");
    for participant in participants {
        coordinator.add_participant(participant.clone()).await?;
        participant.set_coordinator(coordinator.clone()).await?;
        if replication {
            participant.enable_replication().await?;
        }
    }
    Ok(())
}

/// Coordinator and participants running in this process, reachable over TCP
pub struct Cluster {
    pub coordinator: Arc<Coordinator>,
    pub participants: Vec<Arc<Participant>>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<Result<()>>>,
}

impl Cluster {
    /// Bind every configured endpoint and wire the nodes in-process
    ///
    /// Node identities are the bound addresses, so port 0 endpoints work.
    pub async fn start(config: &Config) -> Result<Self> {
        debug!(coordinator = %config.cluster.coordinator, participants = ?config.cluster.participants, "Cluster::start: called");
        let (shutdown, rx) = watch::channel(false);

        let coordinator_listener = rpc::bind(&config.cluster.coordinator).await?;
        let coordinator_addr = coordinator_listener.local_addr()?.to_string();
        let coordinator = Arc::new(Coordinator::new(&coordinator_addr, config.coordinator.clone()));

        let mut listeners = Vec::new();
        let mut participants = Vec::new();
        for endpoint in &config.cluster.participants {
            let listener = rpc::bind(endpoint).await?;
            let addr = listener.local_addr()?.to_string();
            participants.push(Arc::new(Participant::new(addr, config.participant.clone())));
            listeners.push(listener);
        }

        let handles: Vec<Arc<dyn ParticipantService>> = participants
            .iter()
            .map(|p| p.clone() as Arc<dyn ParticipantService>)
            .collect();
        wire(coordinator.clone(), &handles, config.cluster.replication)
            .await
            .context("Failed to wire cluster")?;

        let mut tasks = Vec::new();
        tasks.push(tokio::spawn(rpc::serve(
            coordinator_listener,
            Arc::new(CoordinatorHandler::new(coordinator.clone(), config.rpc.clone())),
            config.rpc.clone(),
            rx.clone(),
        )));
        for (listener, participant) in listeners.into_iter().zip(&participants) {
            tasks.push(tokio::spawn(rpc::serve(
                listener,
                Arc::new(ParticipantHandler::new(participant.clone(), config.rpc.clone())),
                config.rpc.clone(),
                rx.clone(),
            )));
        }

        info!(coordinator = %coordinator_addr, participants = participants.len(), "Cluster started");
        Ok(Self {
            coordinator,
            participants,
            shutdown,
            tasks,
        })
    }

    /// Address the coordinator listens on
    pub fn coordinator_endpoint(&self) -> &str {
        self.coordinator.endpoint()
    }

    /// Addresses the participants listen on, in registration order
    pub fn participant_endpoints(&self) -> Vec<String> {
        self.participants.iter().map(|p| p.node_id().to_string()).collect()
    }

    /// Stop every listener and wait for them to exit
    pub async fn shutdown(self) -> Result<()> {
        debug!("Cluster::shutdown: called");
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            task.await.context("Listener task panicked")??;
        }
        info!("Cluster stopped");
        Ok(())
    }
}

/// Run the whole cluster in this process until ctrl-c
pub async fn run_cluster(config: &Config) -> Result<()> {
    let cluster = Cluster::start(config).await?;
    println!(
        "Coordinator on {}, participants on {}",
        cluster.coordinator_endpoint(),
        cluster.participant_endpoints().join(", ")
    );
    wait_for_ctrl_c().await?;
    cluster.shutdown().await
}

/// Run only the coordinator until ctrl-c
pub async fn run_coordinator(config: &Config) -> Result<()> {
    let listener = rpc::bind(&config.cluster.coordinator).await?;
    let coordinator = Arc::new(Coordinator::new(&config.cluster.coordinator, config.coordinator.clone()));
    let (shutdown, rx) = watch::channel(false);

    let task = tokio::spawn(rpc::serve(
        listener,
        Arc::new(CoordinatorHandler::new(coordinator, config.rpc.clone())),
        config.rpc.clone(),
        rx,
    ));
    println!("Coordinator on {}", config.cluster.coordinator);

    wait_for_ctrl_c().await?;
    let _ = shutdown.send(true);
    task.await.context("Listener task panicked")?
}

/// Run participant `index` until ctrl-c, registering it with a remote coordinator
pub async fn run_participant(config: &Config, index: usize) -> Result<()> {
    let endpoint = config.cluster.participants.get(index).ok_or_else(|| {
        eyre::eyre!(
            "Participant index {} out of range (0..{})",
            index,
            config.cluster.participants.len()
        )
    })?;

    let listener = rpc::bind(endpoint).await?;
    let participant = Arc::new(Participant::new(endpoint, config.participant.clone()));
    let (shutdown, rx) = watch::channel(false);

    let task = tokio::spawn(rpc::serve(
        listener,
        Arc::new(ParticipantHandler::new(participant.clone(), config.rpc.clone())),
        config.rpc.clone(),
        rx,
    ));

    let coordinator = Arc::new(RemoteCoordinator::new(&config.cluster.coordinator, &config.rpc));
    register(coordinator.clone(), RemoteParticipant::new(endpoint, &config.rpc)).await?;
    participant.set_coordinator(coordinator).await?;
    if config.cluster.replication {
        participant.enable_replication().await?;
    }
    println!("Participant {} on {}", index, endpoint);

    wait_for_ctrl_c().await?;
    let _ = shutdown.send(true);
    task.await.context("Listener task panicked")?
}

/// Add `participant` to the coordinator, retrying while it is unreachable
async fn register(coordinator: Arc<RemoteCoordinator>, participant: RemoteParticipant) -> Result<()> {
    let participant: Arc<dyn ParticipantService> = Arc::new(participant);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match coordinator.add_participant(participant.clone()).await {
            Ok(()) => {
                info!(node_id = %participant.node_id(), coordinator = %coordinator.endpoint(), "Registered with coordinator");
                return Ok(());
            }
            Err(e) if attempt < REGISTER_ATTEMPTS => {
                warn!(attempt, error = %e, "Coordinator not reachable yet, retrying");
                tokio::time::sleep(REGISTER_BACKOFF).await;
            }
            Err(e) => {
                return Err(e).context(format!(
                    "Failed to register with coordinator {} after {} attempts",
                    coordinator.endpoint(),
                    attempt
                ));
            }
        }
    }
}

async fn wait_for_ctrl_c() -> Result<()> {
    tokio::signal::ctrl_c().await.context("Failed to listen for ctrl-c")?;
    info!("Received ctrl-c, shutting down");
    Ok(())
}

/// Liveness of one participant
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantStatus {
    pub endpoint: String,
    pub version: Option<String>,
    pub error: Option<String>,
}

/// Snapshot reported by `rk status`
#[derive(Debug, Clone, Serialize)]
pub struct ClusterStatus {
    pub coordinator: String,
    pub metrics: Option<CoordinatorMetrics>,
    #[serde(rename = "coordinator-error", skip_serializing_if = "Option::is_none")]
    pub coordinator_error: Option<String>,
    /// Membership as the coordinator sees it, or the configured list when unreachable
    pub participants: Vec<ParticipantStatus>,
}

/// Query the coordinator and ping every participant
pub async fn probe(config: &Config) -> ClusterStatus {
    debug!(coordinator = %config.cluster.coordinator, "probe: called");
    let coordinator = RemoteCoordinator::new(&config.cluster.coordinator, &config.rpc);

    let (metrics, coordinator_error) = match coordinator.metrics().await {
        Ok(metrics) => (Some(metrics), None),
        Err(e) => (None, Some(e.to_string())),
    };

    let endpoints: Vec<String> = match coordinator.participants().await {
        Ok(members) if !members.is_empty() => members.iter().map(|p| p.node_id().to_string()).collect(),
        _ => config.cluster.participants.clone(),
    };

    let pings = endpoints.into_iter().map(|endpoint| {
        let rpc = config.rpc.clone();
        async move {
            match RemoteParticipant::new(&endpoint, &rpc).ping().await {
                Ok(version) => ParticipantStatus {
                    endpoint,
                    version: Some(version),
                    error: None,
                },
                Err(e) => ParticipantStatus {
                    endpoint,
                    version: None,
                    error: Some(e.to_string()),
                },
            }
        }
    });

    ClusterStatus {
        coordinator: config.cluster.coordinator.clone(),
        metrics,
        coordinator_error,
        participants: futures::future::join_all(pings).await,
    }
}
