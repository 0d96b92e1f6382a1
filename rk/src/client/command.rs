//! Text command grammar for the interactive client
//!
//! ```text
//! PUT <key> <value>
//! GET <key>
//! DELETE <key>
//! quit
//! ```
//!
//! Operation tokens are case-insensitive; keys and values are taken verbatim.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::txn::OpKind;

/// Malformed client input, rejected before any network call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Invalid operation '{0}'. Must be one of (PUT, GET, DELETE)")]
    UnknownOperation(String),

    #[error("{operation} expects {expected} argument(s), got {got}")]
    WrongArity {
        operation: &'static str,
        expected: usize,
        got: usize,
    },
}

/// One parsed line of client input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Put { key: String, value: String },
    Get { key: String },
    Delete { key: String },
    Quit,
}

impl ClientCommand {
    /// Parse one line of input
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut tokens = line.split_whitespace();
        let operation = tokens.next().ok_or(CommandError::Empty)?;
        let args: Vec<&str> = tokens.collect();

        let arity = |name: &'static str, expected: usize| {
            if args.len() == expected {
                Ok(())
            } else {
                Err(CommandError::WrongArity {
                    operation: name,
                    expected,
                    got: args.len(),
                })
            }
        };

        match operation.to_uppercase().as_str() {
            "PUT" => {
                arity("PUT", 2)?;
                Ok(ClientCommand::Put {
                    key: args[0].to_string(),
                    value: args[1].to_string(),
                })
            }
            "GET" => {
                arity("GET", 1)?;
                Ok(ClientCommand::Get { key: args[0].to_string() })
            }
            "DELETE" => {
                arity("DELETE", 1)?;
                Ok(ClientCommand::Delete { key: args[0].to_string() })
            }
            "QUIT" => {
                arity("quit", 0)?;
                Ok(ClientCommand::Quit)
            }
            _ => Err(CommandError::UnknownOperation(operation.to_string())),
        }
    }

    /// Key the command operates on, if any
    pub fn key(&self) -> Option<&str> {
        match self {
            ClientCommand::Put { key, .. } | ClientCommand::Get { key } | ClientCommand::Delete { key } => Some(key),
            ClientCommand::Quit => None,
        }
    }

    /// Transaction kind voted on for this command
    pub fn kind(&self) -> Option<OpKind> {
        match self {
            ClientCommand::Put { .. } => Some(OpKind::Write),
            ClientCommand::Get { .. } => Some(OpKind::Read),
            ClientCommand::Delete { .. } => Some(OpKind::Delete),
            ClientCommand::Quit => None,
        }
    }
}

impl FromStr for ClientCommand {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ClientCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientCommand::Put { key, value } => write!(f, "PUT {} {}", key, value),
            ClientCommand::Get { key } => write!(f, "GET {}", key),
            ClientCommand::Delete { key } => write!(f, "DELETE {}", key),
            ClientCommand::Quit => write!(f, "quit"),
        }
    }
}
