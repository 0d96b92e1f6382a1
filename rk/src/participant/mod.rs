//! Participant nodes
//!
//! A participant holds one replica of the store, votes on transactions,
//! executes gated operations, and replicates accepted writes to its peers.

mod config;
mod contexts;
mod core;

pub use config::ParticipantConfig;
pub use core::Participant;
