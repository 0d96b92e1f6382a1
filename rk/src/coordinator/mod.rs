//! Coordinator for key-scoped two-phase voting
//!
//! One voting round per `prepare_transaction` call:
//! - **Prepare:** every participant votes ACK or NACK
//! - **Decide:** the first NACK (or a timed-out vote) decides ABORT
//! - **Resolve:** the decision is broadcast to every participant

mod config;
mod core;
mod metrics;

pub use config::{CoordinatorConfig, VotingStrategy};
pub use core::Coordinator;
pub use metrics::CoordinatorMetrics;
