//! replikv - Replicated in-memory key/value store
//!
//! A coordinator drives a two-phase voting protocol across a fixed set of
//! participants, each holding its own copy of the store. A write accepted by
//! one participant (the client's primary) is pushed to every other one.
//!
//! # Core Concepts
//!
//! - **Key-scoped transactions**: every client operation is one transaction
//!   identified by a [`TxnId`]
//! - **Gates**: a participant executes an operation only if the last decision
//!   it received for that transaction was commit
//! - **Fire-and-forget replication**: peers apply accepted writes without
//!   voting; failures are logged, not retried
//!
//! # Modules
//!
//! - [`store`] - Per-participant map behind a single lock
//! - [`txn`] - Transaction ids, votes, decisions and outcomes
//! - [`participant`] - Voting, gated operations and replication
//! - [`coordinator`] - Voting rounds and decision broadcast
//! - [`service`] - Service traits shared by local nodes and remote stubs
//! - [`rpc`] - JSON-over-TCP transport
//! - [`server`] - Bootstrap and wiring
//! - [`client`] - Command grammar and interactive client
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod participant;
pub mod rpc;
pub mod server;
pub mod service;
pub mod store;
pub mod txn;

// Re-export commonly used types
pub use client::{ClientCommand, CommandError, KvClient, Reply};
pub use config::Config;
pub use coordinator::{Coordinator, CoordinatorConfig, CoordinatorMetrics, VotingStrategy};
pub use error::{KvError, KvResult};
pub use participant::{Participant, ParticipantConfig};
pub use server::Cluster;
pub use service::{CoordinatorService, ParticipantService};
pub use store::LocalStore;
pub use txn::{Decision, GetOutcome, OpKind, Txn, TxnId, Vote};
