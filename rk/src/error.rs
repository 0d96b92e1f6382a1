//! Error types for node-to-node and client-to-node calls

use std::time::Duration;
use thiserror::Error;

/// Transport-level failures
///
/// Protocol outcomes (NACK votes, aborted transactions, closed gates) are
/// never represented here; they travel as typed results.
#[derive(Debug, Error)]
pub enum KvError {
    #[error("IO error talking to {endpoint}: {source}")]
    Io {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Call to {endpoint} timed out after {timeout:?}")]
    Timeout { endpoint: String, timeout: Duration },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Message too large: {size} bytes (limit {limit})")]
    MessageTooLarge { size: usize, limit: usize },

    #[error("Remote error from {endpoint}: {message}")]
    Remote { endpoint: String, message: String },

    #[error("Unexpected response from {endpoint}: {response}")]
    UnexpectedResponse { endpoint: String, response: String },

    #[error("Participant {node_id} has no coordinator assigned")]
    CoordinatorUnset { node_id: String },

    #[error("Empty message received")]
    EmptyMessage,
}

/// Result alias for service calls
pub type KvResult<T> = Result<T, KvError>;

impl KvError {
    /// Wrap an IO error with the endpoint it occurred on
    pub fn io(endpoint: &str, source: std::io::Error) -> Self {
        KvError::Io {
            endpoint: endpoint.to_string(),
            source,
        }
    }

    /// Check if this error is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, KvError::Timeout { .. })
    }

    /// Endpoint the failing call was addressed to, if known
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            KvError::Io { endpoint, .. }
            | KvError::Timeout { endpoint, .. }
            | KvError::Remote { endpoint, .. }
            | KvError::UnexpectedResponse { endpoint, .. } => Some(endpoint),
            KvError::CoordinatorUnset { node_id } => Some(node_id),
            _ => None,
        }
    }
}

/// Run a service call with a deadline, mapping expiry to [`KvError::Timeout`]
pub async fn with_timeout<T, F>(endpoint: &str, timeout: Duration, call: F) -> KvResult<T>
where
    F: std::future::Future<Output = KvResult<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(KvError::Timeout {
            endpoint: endpoint.to_string(),
            timeout,
        }),
    }
}
