//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// replikv - replicated key/value store with two-phase voting
#[derive(Parser)]
#[command(
    name = "rk",
    about = "Replicated in-memory key/value store coordinated by two-phase voting",
    version,
    after_help = "Logs are written to: ~/.local/share/replikv/logs/"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the coordinator and every participant in this process
    Serve,

    /// Run only the coordinator
    Coordinator,

    /// Run one participant and register it with the coordinator
    Participant {
        /// Index into cluster.participants
        #[arg(value_name = "INDEX")]
        index: usize,
    },

    /// Interactive client (PUT key value, GET key, DELETE key, quit)
    Client {
        /// Client identifier (overrides client.client-id)
        #[arg(value_name = "CLIENT_ID")]
        client_id: Option<String>,

        /// Index of the primary participant (random when omitted)
        #[arg(short, long)]
        primary: Option<usize>,

        /// Insert key1..key10, exercise key11..key15, then go interactive
        #[arg(long)]
        populate: bool,
    },

    /// Show coordinator metrics and participant liveness
    Status {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the effective configuration as YAML
    Config,
}

/// Log file for a process role
pub fn get_log_path(file_name: &str) -> PathBuf {
    debug!(%file_name, "get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("replikv")
        .join("logs")
        .join(file_name);
    debug!(?path, "get_log_path: returning path");
    path
}

/// Output format for the status command
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => {
                debug!("OutputFormat::from_str: matched Text");
                Ok(Self::Text)
            }
            "json" => {
                debug!("OutputFormat::from_str: matched Json");
                Ok(Self::Json)
            }
            _ => {
                debug!(%s, "OutputFormat::from_str: unknown format");
                Err(format!("Unknown format: {}. Use: text or json", s))
            }
        }
    }
}
