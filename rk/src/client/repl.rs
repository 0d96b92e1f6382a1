//! Interactive client session

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{info, warn};

use super::command::ClientCommand;
use super::session::{KvClient, Reply};
use crate::error::KvResult;

/// What the loop should do after one line
#[derive(Debug, PartialEq, Eq)]
enum LineResult {
    Continue,
    Quit,
}

/// Readline loop around a [`KvClient`]
pub struct ReplSession {
    client: KvClient,
}

impl ReplSession {
    pub fn new(client: KvClient) -> Self {
        Self { client }
    }

    /// Run the REPL main loop, optionally seeding the store first
    pub async fn run(&mut self, populate: bool) -> Result<()> {
        self.print_welcome();

        if populate {
            for reply in self.client.populate().await {
                print_reply(&reply);
            }
            for reply in self.client.perform_operations().await {
                print_reply(&reply);
            }
        }

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            let readline = rl.readline(&format!("{} ", ">".bright_green()));

            match readline {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }

                    let _ = rl.add_history_entry(input);

                    if self.handle_line(input).await == LineResult::Quit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        println!("Exiting the client application.");
        info!(client_id = %self.client.client_id(), "Client exiting");
        Ok(())
    }

    async fn handle_line(&self, input: &str) -> LineResult {
        let command = match ClientCommand::parse(input) {
            Ok(command) => command,
            Err(e) => {
                println!("{} {}", "Invalid input:".yellow(), e);
                println!("Please follow \"PUT key value\", \"GET key\", \"DELETE key\" or \"quit\".");
                warn!(%input, error = %e, "Invalid input format received from user");
                return LineResult::Continue;
            }
        };

        match self.client.execute(&command).await {
            Some(reply) => {
                print_reply(&reply);
                LineResult::Continue
            }
            None => LineResult::Quit,
        }
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "replikv client".bright_cyan().bold());
        println!(
            "Client {} using primary {}",
            self.client.client_id().bright_white(),
            self.client.primary().bright_white()
        );
        println!(
            "Enter {}, {}, {} or {}",
            "PUT key value".yellow(),
            "GET key".yellow(),
            "DELETE key".yellow(),
            "quit".yellow()
        );
        println!();
    }
}

fn print_reply(reply: &KvResult<Reply>) {
    match reply {
        Ok(reply) if reply.succeeded() => println!("{}", reply.to_string().green()),
        Ok(reply) => println!("{}", reply.to_string().yellow()),
        Err(e) => println!("{} {}", "Request failed:".red(), e),
    }
}
