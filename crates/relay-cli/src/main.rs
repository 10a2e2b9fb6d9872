//! relay CLI
//!
//! Operator commands for the relay agent router: inspect the agent
//! catalog, dry-run routing, talk to a single tool process and manage
//! stored sessions.
//!
//! # Environment Variables
//!
//! - `RELAY_CONFIG`: configuration file (default: `relay.toml`)
//! - `RUST_LOG`: log filter; logs go to stderr
//! - any variable an agent declares in `required_env` is read once at
//!   startup and passed to that agent's tool process

mod cli;
mod commands;
mod context;
mod error;
mod logging;

use clap::Parser;
use colored::Colorize;

use cli::{AgentsAction, Cli, Commands, SessionAction};
use error::Result;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("{}: logging disabled: {}", "warning".yellow().bold(), e);
    }

    let Some(command) = cli.command else {
        println!("{} agent router", "relay".green().bold());
        println!();
        println!("Run {} for available commands.", "relay --help".cyan());
        return Ok(());
    };

    let config = context::load_config(&cli.config)?;
    tracing::debug!(config = %config.path.display(), agents = config.registry.len(), "Configuration loaded");

    match command {
        Commands::Agents { action } => match action {
            AgentsAction::List => commands::run_agents_list(&config.registry),
            AgentsAction::Show { name, json } => {
                commands::run_agents_show(&config.registry, &name, json)
            }
        },
        Commands::Check => {
            let credentials = context::credentials(&config.registry, &cli.env);
            commands::run_check(&config, &credentials)
        }
        Commands::Route { message } => commands::run_route(&config, &message).await,
        Commands::Tools { agent, json } => {
            let credentials = context::credentials(&config.registry, &cli.env);
            commands::run_tools(&config, &credentials, &agent, json).await
        }
        Commands::Call { agent, tool, args } => {
            let credentials = context::credentials(&config.registry, &cli.env);
            commands::run_call(&config, &credentials, &agent, &tool, &args).await
        }
        Commands::Session { action } => match action {
            SessionAction::List => commands::run_session_list(&config),
            SessionAction::Show { id, json } => {
                commands::run_session_show(&config, &id, json).await
            }
            SessionAction::Clear { id } => commands::run_session_clear(&config, &id).await,
        },
    }
}
