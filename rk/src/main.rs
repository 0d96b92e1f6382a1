//! replikv - replicated key/value store
//!
//! CLI entry point for running nodes and the interactive client.

use std::fs;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use replikv::cli::{Cli, Command, OutputFormat, get_log_path};
use replikv::client::{KvClient, ReplSession};
use replikv::config::Config;
use replikv::server;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>, file_name: &str) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path(file_name);
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

/// Log file name for the role being started
fn log_file_name(command: &Command, config_client_id: &str) -> String {
    match command {
        Command::Serve => "replikv.log".to_string(),
        Command::Coordinator => "coordinator.log".to_string(),
        Command::Participant { index } => format!("participant{}.log", index),
        Command::Client { client_id, .. } => {
            format!("client{}.log", client_id.as_deref().unwrap_or(config_client_id))
        }
        Command::Status { .. } | Command::Config => "rk.log".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration before logging so the log file can carry the client id
    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    setup_logging(
        cli.log_level.as_deref(),
        config_log_level.as_deref(),
        &log_file_name(&cli.command, &config.client.client_id),
    )
    .context("Failed to setup logging")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Serve => {
            debug!("main: matched Serve command");
            config.validate()?;
            server::run_cluster(&config).await
        }
        Command::Coordinator => {
            debug!("main: matched Coordinator command");
            server::run_coordinator(&config).await
        }
        Command::Participant { index } => {
            debug!(index, "main: matched Participant command");
            config.validate()?;
            server::run_participant(&config, index).await
        }
        Command::Client {
            client_id,
            primary,
            populate,
        } => {
            debug!(?client_id, ?primary, populate, "main: matched Client command");
            if let Some(client_id) = client_id {
                config.client.client_id = client_id;
            }
            if primary.is_some() {
                config.client.primary = primary;
            }
            config.validate()?;
            cmd_client(&config, populate).await
        }
        Command::Status { format } => {
            debug!(?format, "main: matched Status command");
            cmd_status(&config, format).await
        }
        Command::Config => {
            debug!("main: matched Config command");
            cmd_config(&config)
        }
    }
}

async fn cmd_client(config: &Config, populate: bool) -> Result<()> {
    debug!(client_id = %config.client.client_id, populate, "cmd_client: called");
    info!("Client started with ID: {}", config.client.client_id);
    let client = KvClient::connect(config)?;
    ReplSession::new(client).run(populate).await
}

async fn cmd_status(config: &Config, format: OutputFormat) -> Result<()> {
    debug!(?format, "cmd_status: called");
    let status = server::probe(config).await;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    match (&status.metrics, &status.coordinator_error) {
        (Some(metrics), _) => {
            println!("{} {} {}", "Coordinator".bold(), status.coordinator, "up".green());
            println!("  participants:        {}", metrics.participants);
            println!("  rounds:              {}", metrics.rounds);
            println!("  commits:             {}", metrics.commits);
            println!("  aborts:              {}", metrics.aborts);
            println!("  vote timeouts:       {}", metrics.vote_timeouts);
            println!("  transport failures:  {}", metrics.transport_failures);
            println!("  broadcast failures:  {}", metrics.broadcast_failures);
        }
        (None, error) => {
            println!("{} {} {}", "Coordinator".bold(), status.coordinator, "down".red());
            if let Some(error) = error {
                println!("  {}", error.dimmed());
            }
        }
    }

    println!("{}", "Participants".bold());
    for participant in &status.participants {
        match &participant.version {
            Some(version) => println!("  {} {} (v{})", participant.endpoint, "up".green(), version),
            None => println!(
                "  {} {} {}",
                participant.endpoint,
                "down".red(),
                participant.error.as_deref().unwrap_or("").dimmed()
            ),
        }
    }
    Ok(())
}

fn cmd_config(config: &Config) -> Result<()> {
    debug!("cmd_config: called");
    print!("{}", serde_yaml::to_string(config).context("Failed to serialize config")?);
    Ok(())
}
