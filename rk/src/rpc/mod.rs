//! TCP transport between nodes
//!
//! Every call opens a connection, sends one JSON line, reads one JSON line
//! back and closes. [`RemoteParticipant`] and [`RemoteCoordinator`] are the
//! caller side; [`serve`] with a [`ParticipantHandler`] or
//! [`CoordinatorHandler`] is the node side.

pub mod client;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod listener;
pub mod messages;

pub use client::{RemoteCoordinator, RemoteParticipant, RpcClient};
pub use config::RpcConfig;
pub use dispatch::{CoordinatorHandler, ParticipantHandler};
pub use listener::{Handler, bind, serve};
pub use messages::{CoordinatorMessage, ParticipantMessage, Response};
