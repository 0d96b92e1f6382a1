//! RPC message types
//!
//! Simple JSON-over-newline protocol. Each message is a single line of JSON
//! followed by `\n`; one request and one response per connection.

use serde::{Deserialize, Serialize};

use crate::coordinator::CoordinatorMetrics;
use crate::txn::{Decision, GetOutcome, Txn, TxnId, Vote};

/// Requests addressed to a participant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ParticipantMessage {
    RequestTxn {
        #[serde(rename = "txn-id")]
        txn_id: TxnId,
        #[serde(rename = "is-delete")]
        is_delete: bool,
    },

    Prepare {
        txn: Txn,
    },

    Commit {
        #[serde(rename = "txn-id")]
        txn_id: TxnId,
    },

    Abort {
        #[serde(rename = "txn-id")]
        txn_id: TxnId,
    },

    GetValue {
        key: String,
        #[serde(rename = "request-id")]
        request_id: TxnId,
        #[serde(rename = "client-id")]
        client_id: String,
    },

    PutValue {
        key: String,
        value: String,
        #[serde(rename = "request-id")]
        request_id: TxnId,
        #[serde(rename = "client-id")]
        client_id: String,
    },

    DeleteValue {
        key: String,
        #[serde(rename = "request-id")]
        request_id: TxnId,
        #[serde(rename = "client-id")]
        client_id: String,
    },

    /// Peer-only replication of an accepted write
    ApplyPut {
        key: String,
        value: String,
    },

    /// Peer-only replication of an accepted delete
    ApplyDelete {
        key: String,
    },

    SetCoordinator {
        endpoint: String,
    },

    EnableReplication,

    Ping,
}

/// Requests addressed to the coordinator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum CoordinatorMessage {
    AddParticipant { endpoint: String },

    GetParticipants,

    PrepareTransaction { txn: Txn },

    Metrics,

    Ping,
}

/// Responses from either node kind
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Response {
    /// Acknowledgment
    Ok,

    Vote { vote: Vote },

    Value { outcome: GetOutcome },

    Applied { applied: bool },

    Decision { decision: Decision },

    Participants { endpoints: Vec<String> },

    Metrics { metrics: CoordinatorMetrics },

    Pong { version: String },

    /// Error response
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::txn::OpKind;

    #[test]
    fn test_request_txn_serialize() {
        let msg = ParticipantMessage::RequestTxn {
            txn_id: TxnId::from("txn-1"),
            is_delete: true,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"RequestTxn","txn-id":"txn-1","is-delete":true}"#);
    }

    #[test]
    fn test_prepare_deserialize() {
        let json = r#"{"type":"Prepare","txn":{"id":"txn-2","key":"key1","kind":"write"}}"#;
        let msg: ParticipantMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            ParticipantMessage::Prepare {
                txn: Txn::new(TxnId::from("txn-2"), "key1", OpKind::Write)
            }
        );
    }

    #[test]
    fn test_ping_serialize() {
        let json = serde_json::to_string(&CoordinatorMessage::Ping).unwrap();
        assert_eq!(json, r#"{"type":"Ping"}"#);
    }

    #[test]
    fn test_vote_response_serialize() {
        let resp = Response::Vote { vote: Vote::Nack };
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"type":"Vote","vote":"NACK"}"#);
    }

    #[test]
    fn test_value_response_serialize() {
        let resp = Response::Value {
            outcome: GetOutcome::Aborted,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"type":"Value","outcome":{"outcome":"aborted"}}"#);
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = Response::Error {
            message: "Something went wrong".to_string(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"type":"Error","message":"Something went wrong"}"#);
    }
}
