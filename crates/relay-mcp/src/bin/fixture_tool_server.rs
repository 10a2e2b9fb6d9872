//! Fixture tool server
//!
//! A small stdio tool server used to exercise the transport end to end and
//! to smoke-test a relay deployment without real domain agents.
//!
//! # Usage
//!
//! ```bash
//! fixture-tool-server [--name <name>] [--exit-immediately]
//! ```
//!
//! # Tools
//!
//! - `echo {text}` - returns `text`
//! - `fail {message}` - returns an `isError` result
//! - `env` - names of the environment variables the process can see
//! - `cwd` - the working directory
//! - `sleep {ms}` - waits, then answers
//! - `crash` - exits without answering
//!
//! Logs go to stderr; stdout carries only protocol messages.

use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use relay_mcp::{ToolDefinition, ToolHandler, ToolResult, ToolServer};
use serde_json::{Value, json};

/// Stdio tool server for transport tests
#[derive(Parser)]
#[command(name = "fixture-tool-server")]
#[command(version)]
struct Args {
    /// Name reported in serverInfo
    #[arg(long, default_value = "fixture")]
    name: String,

    /// Exit before reading any input, so the handshake fails
    #[arg(long)]
    exit_immediately: bool,
}

struct FixtureTools {
    name: String,
}

fn tool(name: &str, description: &str, schema: Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: schema,
    }
}

#[async_trait]
impl ToolHandler for FixtureTools {
    fn name(&self) -> &str {
        &self.name
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        vec![
            tool(
                "echo",
                "Return the given text",
                json!({"type": "object", "properties": {"text": {"type": "string"}}}),
            ),
            tool(
                "fail",
                "Report a tool failure",
                json!({"type": "object", "properties": {"message": {"type": "string"}}}),
            ),
            tool("env", "List visible environment variable names", json!({"type": "object"})),
            tool("cwd", "Report the working directory", json!({"type": "object"})),
            tool(
                "sleep",
                "Wait before answering",
                json!({"type": "object", "properties": {"ms": {"type": "integer"}}}),
            ),
            tool("crash", "Exit without answering", json!({"type": "object"})),
        ]
    }

    async fn call(&self, name: &str, arguments: Value) -> ToolResult {
        match name {
            "echo" => ToolResult::text(arguments["text"].as_str().unwrap_or_default()),
            "fail" => ToolResult::error(
                arguments["message"]
                    .as_str()
                    .unwrap_or("requested failure"),
            ),
            "env" => {
                let mut names: Vec<String> = std::env::vars_os()
                    .map(|(key, _)| key.to_string_lossy().into_owned())
                    .collect();
                names.sort();
                ToolResult::text(names.join(","))
            }
            "cwd" => match std::env::current_dir() {
                Ok(dir) => ToolResult::text(dir.to_string_lossy()),
                Err(e) => ToolResult::error(e.to_string()),
            },
            "sleep" => {
                let ms = arguments["ms"].as_u64().unwrap_or(0);
                tokio::time::sleep(Duration::from_millis(ms)).await;
                ToolResult::text(format!("slept {ms}ms"))
            }
            "crash" => {
                tracing::warn!("Crashing on request");
                std::process::exit(3);
            }
            other => ToolResult::error(format!("unknown tool: {other}")),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fixture_tool_server=info".parse()?)
                .add_directive("relay_mcp=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if args.exit_immediately {
        tracing::warn!("Exiting before handshake");
        std::process::exit(1);
    }

    tracing::info!(name = %args.name, "Starting fixture tool server");
    let mut server = ToolServer::new(FixtureTools { name: args.name });
    server.run_stdio().await?;
    Ok(())
}
