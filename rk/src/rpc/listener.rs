//! TCP listener for the node side
//!
//! Accepts connections, reads one request per connection, hands it to a
//! [`Handler`] and writes back the response.

use std::fmt::Debug;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use eyre::{Context, Result};
use serde::de::DeserializeOwned;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::codec::{read_frame, write_frame};
use super::config::RpcConfig;
use super::messages::Response;
use crate::error::with_timeout;

/// Turns one decoded request into a response
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    type Message: DeserializeOwned + Debug + Send;

    async fn handle(&self, message: Self::Message) -> Response;
}

/// Bind a TCP listener on `addr`
pub async fn bind(addr: &str) -> Result<TcpListener> {
    debug!(%addr, "bind: binding listener");
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    debug!(local_addr = ?listener.local_addr().ok(), "bind: listener bound");
    Ok(listener)
}

/// Accept connections until `shutdown` flips to true
///
/// A peer that does not finish sending its request within the RPC timeout
/// gets an error response and is disconnected.
pub async fn serve<H: Handler>(
    listener: TcpListener,
    handler: Arc<H>,
    rpc: RpcConfig,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let local_addr = listener.local_addr().context("Listener has no local address")?;
    info!(%local_addr, "Listening");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        let handler = handler.clone();
                        let rpc = rpc.clone();
                        tokio::spawn(async move {
                            handle_connection(stream, peer, handler, &rpc).await;
                        });
                    }
                    Err(e) => warn!(%local_addr, error = %e, "Failed to accept connection"),
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!(%local_addr, "Listener shutting down");
                    return Ok(());
                }
            }
        }
    }
}

async fn handle_connection<H: Handler>(mut stream: TcpStream, peer: SocketAddr, handler: Arc<H>, rpc: &RpcConfig) {
    let peer = peer.to_string();
    let max_message_bytes = rpc.max_message_bytes;

    let request = read_frame::<_, H::Message>(&mut stream, max_message_bytes, &peer);
    let response = match with_timeout(&peer, rpc.timeout(), request).await {
        Ok(message) => {
            debug!(%peer, ?message, "handle_connection: request");
            handler.handle(message).await
        }
        Err(e) => {
            warn!(%peer, error = %e, "Failed to read request");
            Response::Error { message: e.to_string() }
        }
    };

    if let Err(e) = write_frame(&mut stream, &response, max_message_bytes, &peer).await {
        warn!(%peer, error = %e, "Failed to send response");
    }
}
