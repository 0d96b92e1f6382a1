//! Transaction vocabulary shared by coordinator, participants and clients

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one logical client operation
///
/// The client generates it, passes it to `request_txn`, threads it through the
/// coordinator's voting round, and reuses it as the operation's request id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxnId(String);

impl TxnId {
    /// Generate a fresh time-ordered id
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TxnId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TxnId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of operation a transaction guards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OpKind {
    Read,
    Write,
    Delete,
}

/// A key-scoped transaction as threaded through the voting round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Txn {
    pub id: TxnId,
    pub key: String,
    pub kind: OpKind,
}

impl Txn {
    pub fn new(id: TxnId, key: impl Into<String>, kind: OpKind) -> Self {
        Self {
            id,
            key: key.into(),
            kind,
        }
    }
}

/// A participant's answer to `prepare`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Vote {
    Ack,
    Nack,
}

/// Outcome of a coordinator voting round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Decision {
    Commit,
    Abort,
}

impl Decision {
    pub fn is_commit(&self) -> bool {
        matches!(self, Decision::Commit)
    }
}

/// Resolution a participant holds for one transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    #[default]
    Pending,
    Committed,
    Aborted,
}

/// Result of a gated read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "value", rename_all = "kebab-case")]
pub enum GetOutcome {
    Found(String),
    NotFound,
    Aborted,
}

impl GetOutcome {
    /// Sentinel rendering: the value, `"null"` or `"abort"`
    pub fn as_sentinel(&self) -> &str {
        match self {
            GetOutcome::Found(value) => value,
            GetOutcome::NotFound => "null",
            GetOutcome::Aborted => "abort",
        }
    }
}
