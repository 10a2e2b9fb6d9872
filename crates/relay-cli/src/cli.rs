//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// relay - route conversations to tool-backed agents
#[derive(Parser, Debug)]
#[command(name = "relay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the relay configuration file
    #[arg(short, long, global = true, env = "RELAY_CONFIG", default_value = relay_registry::CONFIG_FILENAME)]
    pub config: PathBuf,

    /// Credential passed to tool processes (repeatable)
    ///
    /// Overrides a value of the same name taken from the environment.
    #[arg(short, long = "env", global = true, value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Inspect the agent catalog
    Agents {
        #[command(subcommand)]
        action: AgentsAction,
    },

    /// Validate the configuration and each agent's launch prerequisites
    Check,

    /// Show which agent a message would be routed to, without running it
    ///
    /// Uses keyword matching on agent names.
    ///
    /// Examples:
    ///   relay route "create an argent account"
    Route {
        /// The user message to route
        message: String,
    },

    /// Start an agent's tool process and list the tools it advertises
    Tools {
        /// Agent name
        agent: String,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Call one tool on an agent's tool process
    ///
    /// Examples:
    ///   relay call avnu get_quote --args '{"sell": "ETH", "buy": "STRK"}'
    Call {
        /// Agent name
        agent: String,

        /// Tool name
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
    },

    /// Inspect or clear stored session checkpoints
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
}

/// Agent catalog actions
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum AgentsAction {
    /// List registered agents
    List,

    /// Show one agent's descriptor
    Show {
        /// Agent name
        name: String,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}

/// Session checkpoint actions
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// List sessions with a stored checkpoint
    List,

    /// Show a session's last checkpoint
    Show {
        /// Session id
        id: String,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Delete a session's checkpoint
    Clear {
        /// Session id
        id: String,
    },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}
